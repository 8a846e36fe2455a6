use std::io::{self, Write};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::models::{ConnectionState, ListKey, Notice, ResourceKind, StreamId, SyncEvent};
use crate::sync::{LogStreamSync, NamespaceErrorState, ResourceListSync, SyncContext};
use crate::view::{self, ListView};

pub const NOTICE_TTL: Duration = Duration::from_secs(3);

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    List,
    Logs,
}

/// Tracks how much of the log buffer has already been written out.
#[derive(Debug, Default)]
struct LogCursor {
    epoch: u64,
    printed: u64,
    state: Option<ConnectionState>,
}

pub struct App {
    pub mode: Mode,
    pub namespace: String,
    pub pod: String,
    pub container: String,
    pub filter_query: String,
    pub list: ResourceListSync,
    pub logs: LogStreamSync,
    pub namespace_error: watch::Receiver<Option<String>>,
    pub notice: Option<String>,
    pub notice_time: Option<Instant>,
    pub clear_screen: bool,
    pub dirty: bool,
    pub should_quit: bool,
    log_cursor: LogCursor,
}

impl App {
    pub fn new(ctx: SyncContext, namespace: String, log_buffer_limit: Option<usize>) -> Self {
        let list = ResourceListSync::new(ctx.clone(), NamespaceErrorState::new());
        let reader = list.namespace_error().subscribe();

        Self {
            mode: Mode::List,
            namespace,
            pod: String::new(),
            container: String::new(),
            filter_query: String::new(),
            list,
            logs: LogStreamSync::new(ctx, log_buffer_limit),
            namespace_error: reader,
            notice: None,
            notice_time: None,
            clear_screen: false,
            dirty: true,
            should_quit: false,
            log_cursor: LogCursor::default(),
        }
    }

    pub fn start_list(&mut self, kind: ResourceKind) {
        self.mode = Mode::List;
        self.logs.close();
        self.list.subscribe(ListKey {
            kind,
            namespace: self.namespace.clone(),
        });
        self.dirty = true;
    }

    pub fn start_logs(&mut self, pod: &str, container: &str) {
        self.mode = Mode::Logs;
        self.list.close();
        self.pod = pod.to_string();
        self.container = container.to_string();
        self.logs.set_target(&self.namespace, pod, container);
        self.log_cursor = LogCursor::default();
        self.dirty = true;
    }

    pub fn set_namespace(&mut self, namespace: &str) {
        tracing::info!(namespace, "switching namespace");
        self.namespace = namespace.to_string();
        match self.mode {
            Mode::List => self.list.set_namespace(namespace),
            Mode::Logs => self
                .logs
                .set_target(&self.namespace, &self.pod, &self.container),
        }
        self.dirty = true;
    }

    pub fn set_kind(&mut self, kind: ResourceKind) {
        if self.mode == Mode::Logs {
            self.set_notice("Kind can only be changed while listing resources".to_string());
            return;
        }
        self.start_list(kind);
    }

    pub fn set_filter(&mut self, query: &str) {
        self.filter_query = query.to_string();
        self.dirty = true;
    }

    pub fn retry(&mut self) {
        match self.mode {
            Mode::List => self.list.retry(),
            Mode::Logs if self.logs.key().is_none() => {
                self.set_notice("No log target to retry".to_string());
            }
            Mode::Logs => self.logs.retry(),
        }
    }

    pub fn apply(&mut self, event: SyncEvent) {
        let changed = match event.tag.stream {
            StreamId::ResourceList => self.list.apply(event),
            StreamId::PodLogs => self.logs.apply(event),
        };
        if changed {
            self.dirty = true;
        }
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.set_notice(notice.message);
    }

    pub fn set_notice(&mut self, message: String) {
        self.notice = Some(message);
        self.notice_time = Some(Instant::now());
        self.dirty = true;
    }

    pub fn clear_stale_notice(&mut self) {
        if let Some(t) = self.notice_time
            && t.elapsed() >= NOTICE_TTL
        {
            self.notice = None;
            self.notice_time = None;
            self.dirty = true;
        }
    }

    pub fn render(&mut self, out: &mut impl Write) -> io::Result<()> {
        match self.mode {
            Mode::List => self.render_list(out)?,
            Mode::Logs => self.render_logs(out)?,
        }
        self.dirty = false;
        out.flush()
    }

    fn render_list(&mut self, out: &mut impl Write) -> io::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let Some(key) = self.list.key() else {
            return Ok(());
        };

        let rows = self.list.list().matching(&self.filter_query);
        let namespace_error = self.namespace_error.borrow().clone();
        let text = view::render_list(&ListView {
            key,
            state: self.list.state(),
            rows: &rows,
            total: self.list.list().len(),
            filter: &self.filter_query,
            namespace_error: namespace_error.as_deref(),
            notice: self.notice.as_deref(),
        });

        if self.clear_screen {
            out.write_all(CLEAR_SCREEN.as_bytes())?;
        }
        out.write_all(text.as_bytes())
    }

    fn render_logs(&mut self, out: &mut impl Write) -> io::Result<()> {
        if let Some(notice) = self.notice.take() {
            self.notice_time = None;
            writeln!(out, "! {notice}")?;
        }

        let state = self.logs.state();
        if self.log_cursor.state != Some(state) {
            self.log_cursor.state = Some(state);
            writeln!(out, "-- {}", view::status_line(state))?;
        }

        let buffer = self.logs.buffer();
        if self.log_cursor.epoch != self.logs.epoch() {
            self.log_cursor.epoch = self.logs.epoch();
            self.log_cursor.printed = 0;
        }

        if !buffer.is_empty() {
            let fresh = buffer.pushed().saturating_sub(self.log_cursor.printed);
            let fresh = usize::try_from(fresh).unwrap_or(usize::MAX).min(buffer.len());
            for line in buffer.iter().skip(buffer.len() - fresh) {
                writeln!(out, "{}", view::render_log_line(line))?;
            }
        }
        self.log_cursor.printed = buffer.pushed();
        Ok(())
    }

    pub fn shutdown(&mut self) {
        self.list.close();
        self.logs.close();
    }
}
