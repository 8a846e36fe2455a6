use anyhow::Result;
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time;

use crate::app::{App, Mode};
use crate::input::handle_input;
use crate::models::{Notice, SyncEvent};

const TICK: Duration = Duration::from_millis(250);

pub async fn run<W: Write>(
    out: &mut W,
    mut app: App,
    mut event_rx: UnboundedReceiver<SyncEvent>,
    mut notice_rx: UnboundedReceiver<Notice>,
) -> Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut ticker = time::interval(TICK);

    loop {
        if app.should_quit {
            tracing::info!("shutting down");
            app.shutdown();
            return Ok(());
        }

        tokio::select! {
            _ = ticker.tick() => {
                app.clear_stale_notice();
                if app.dirty {
                    app.render(out)?;
                }
            }
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => handle_input(&mut app, &line),
                Ok(None) => {
                    tracing::debug!("stdin closed, input disabled");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "reading stdin failed, input disabled");
                    stdin_open = false;
                }
            },
            Some(event) = event_rx.recv() => {
                app.apply(event);
                while let Ok(event) = event_rx.try_recv() {
                    app.apply(event);
                }
                // log lines go out as they arrive, lists wait for the tick
                if app.mode == Mode::Logs && app.dirty {
                    app.render(out)?;
                }
            }
            Some(notice) = notice_rx.recv() => {
                app.push_notice(notice);
            }
            _ = tokio::signal::ctrl_c() => {
                app.should_quit = true;
            }
        }
    }
}
