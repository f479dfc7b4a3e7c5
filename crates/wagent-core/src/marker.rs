// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent marker codec.
//!
//! The model is told to end its reply with a marker such as
//! `[ACTION]{"intent":"SHOW_PRODUCTS","product_ids":[12,15]}[/ACTION]`.
//! [`ActionMarker::render`] produces the exact form quoted in the system prompt
//! and [`ActionMarker::extract`] recovers it from completion text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub const MARKER_OPEN: &str = "[ACTION]";
pub const MARKER_CLOSE: &str = "[/ACTION]";

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[ACTION\](.*?)\[/ACTION\]").expect("marker pattern is valid")
});

/// What the reply should carry besides its text.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    #[default]
    #[serde(alias = "text")]
    Text,
    #[serde(alias = "show_products")]
    ShowProducts,
    #[serde(alias = "show_catalog")]
    ShowCatalog,
}

impl Intent {
    /// Whether this intent attaches catalog entries to the reply.
    pub fn attaches_products(self) -> bool {
        !matches!(self, Intent::Text)
    }
}

/// Structured payload between the marker tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMarker {
    pub intent: Intent,
    #[serde(default)]
    pub product_ids: Vec<i64>,
}

impl ActionMarker {
    pub fn new(intent: Intent, product_ids: Vec<i64>) -> Self {
        Self {
            intent,
            product_ids,
        }
    }

    /// Canonical marker text.
    pub fn render(&self) -> String {
        let ids = self
            .product_ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!(
            r#"{MARKER_OPEN}{{"intent":"{}","product_ids":[{ids}]}}{MARKER_CLOSE}"#,
            self.intent
        )
    }

    /// Split completion text into the first well-formed marker and the display text.
    ///
    /// Every marker span (well-formed or not) is removed from the returned text,
    /// as is a dangling unclosed `[ACTION]` tail.
    pub fn extract(raw: &str) -> (Option<ActionMarker>, String) {
        let marker = MARKER_RE
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .and_then(|body| serde_json::from_str::<ActionMarker>(body.as_str().trim()).ok());

        let mut text = MARKER_RE.replace_all(raw, "").into_owned();
        if let Some(pos) = text.find(MARKER_OPEN) {
            text.truncate(pos);
        }

        (marker, tidy(&text))
    }
}

/// Trim surrounding whitespace and collapse blank-line runs left by marker removal.
fn tidy(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.trim().lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim_end().to_string()
}
