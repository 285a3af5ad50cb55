// Plain-text presentation of connection rows

use crate::snapshot::ConnectionRow;
use unicode_width::UnicodeWidthStr;

const HEADERS: [&str; 5] = ["Local", "Remote", "State", "PID", "Process"];

/// Remembers the last rendered rows so unchanged polls print nothing
#[derive(Debug, Default)]
pub struct RowView {
    rows: Vec<ConnectionRow>,
    rendered: bool,
}

impl RowView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held rows; returns true if anything changed
    pub fn replace(&mut self, rows: Vec<ConnectionRow>) -> bool {
        if self.rendered && self.rows == rows {
            return false;
        }
        self.rows = rows;
        self.rendered = true;
        true
    }

    pub fn rows(&self) -> &[ConnectionRow] {
        &self.rows
    }
}

/// Render rows as an aligned table, one line per connection
pub fn render_table(rows: &[ConnectionRow]) -> String {
    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|row| {
            [
                row.record.local.to_string(),
                row.record.remote.to_string(),
                row.record.state.to_string(),
                row.record.owner_pid.to_string(),
                row.process_name.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|header| header.width());
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.width());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &HEADERS, &widths);
    for line in &cells {
        push_line(&mut out, line, &widths);
    }
    out
}

fn push_line<S: AsRef<str>>(out: &mut String, cells: &[S], widths: &[usize]) {
    let last = cells.len().saturating_sub(1);
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        let cell = cell.as_ref();
        out.push_str(cell);
        if i < last {
            // Pad by display width so wide process names stay aligned
            let pad = width.saturating_sub(cell.width()) + 2;
            out.extend(std::iter::repeat_n(' ', pad));
        }
    }
    out.push('\n');
}
