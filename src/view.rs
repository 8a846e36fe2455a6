use crate::models::{ConnectionState, ListKey, LogEvent, ResourceSummary};
use crate::stream::RECONNECT_DELAY;
use crate::utils::format_age;

const COLUMN_GAP: usize = 3;

pub fn status_line(state: ConnectionState) -> String {
    match state {
        ConnectionState::Disconnected => format!(
            "Connection Lost! Retrying in {} Seconds...",
            RECONNECT_DELAY.as_secs()
        ),
        other => format!("Status: {other}"),
    }
}

/// Everything one redraw of the list screen needs.
pub struct ListView<'a> {
    pub key: &'a ListKey,
    pub state: ConnectionState,
    pub rows: &'a [&'a ResourceSummary],
    pub total: usize,
    pub filter: &'a str,
    pub namespace_error: Option<&'a str>,
    pub notice: Option<&'a str>,
}

pub fn render_list(view: &ListView<'_>) -> String {
    let namespace = if view.key.namespace.is_empty() {
        "(none)"
    } else {
        view.key.namespace.as_str()
    };

    let mut out = format!(
        "{} | namespace: {} | {}",
        view.key.kind,
        namespace,
        status_line(view.state)
    );
    if !view.filter.is_empty() {
        out.push_str(&format!(
            " | filter: {} ({}/{})",
            view.filter,
            view.rows.len(),
            view.total
        ));
    }
    out.push('\n');

    if let Some(err) = view.namespace_error {
        out.push_str(&format!("! {err}\n"));
    }
    if let Some(notice) = view.notice {
        out.push_str(&format!("! {notice}\n"));
    }

    if view.rows.is_empty() {
        out.push_str("No resources.\n");
        return out;
    }

    let cells: Vec<[String; 3]> = view
        .rows
        .iter()
        .map(|s| {
            [
                s.name.clone(),
                s.field("status").unwrap_or("-").to_string(),
                s.field("age").map(format_age).unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();

    let name_w = cells.iter().map(|c| c[0].len()).max().unwrap_or(0).max(4) + COLUMN_GAP;
    let status_w = cells.iter().map(|c| c[1].len()).max().unwrap_or(0).max(6) + COLUMN_GAP;

    out.push_str(&format!("{:<name_w$}{:<status_w$}AGE\n", "NAME", "STATUS"));
    for [name, status, age] in &cells {
        out.push_str(&format!("{name:<name_w$}{status:<status_w$}{age}\n"));
    }
    out
}

pub fn render_log_line(event: &LogEvent) -> String {
    format!(
        "{}    {}",
        event.timestamp,
        event.log.trim_end_matches(['\r', '\n'])
    )
}
