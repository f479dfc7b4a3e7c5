// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Renders the conversation window as plain text for the model.
//!
//! ```text
//! --- 2026-10-15 ---
//! [21:14] Client: do you ship to Recife?
//! [21:15] Assistant: Yes, in 3 to 5 business days.
//! --- 2026-10-16 ---
//! [09:02] Client: great, I'll take the blue one
//! ```

use std::fmt::Write;

use chrono::NaiveDate;
use wagent_core::types::Message;

/// Render `messages` (oldest first) one per line, with a separator whenever the day changes.
pub fn render_history(messages: &[Message]) -> String {
    let mut out = String::new();
    let mut current_day: Option<NaiveDate> = None;

    for message in messages {
        let day = message.created_at.date_naive();
        if current_day != Some(day) {
            let _ = writeln!(out, "--- {} ---", day.format("%Y-%m-%d"));
            current_day = Some(day);
        }
        let _ = writeln!(
            out,
            "[{}] {}: {}",
            message.created_at.format("%H:%M"),
            message.role(),
            message.content.trim()
        );
    }

    out.truncate(out.trim_end().len());
    out
}
