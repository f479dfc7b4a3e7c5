// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response parser: turns raw completion text into display text plus intent.

use tracing::debug;
use wagent_core::marker::{ActionMarker, Intent, MARKER_OPEN};
use wagent_core::types::ParsedResponse;

/// Parse a completion. Never fails: a missing or malformed marker yields
/// [`Intent::Text`] with no product ids.
pub fn parse_response(raw: &str) -> ParsedResponse {
    let (marker, message) = ActionMarker::extract(raw);

    let Some(marker) = marker else {
        if raw.contains(MARKER_OPEN) {
            debug!("malformed action marker ignored");
        }
        return ParsedResponse::text(message);
    };

    let product_ids = match marker.intent {
        Intent::ShowProducts => dedup(marker.product_ids),
        Intent::Text | Intent::ShowCatalog => Vec::new(),
    };

    ParsedResponse {
        message,
        intent: marker.intent,
        product_ids,
    }
}

/// Drop repeated and non-positive ids, keeping first-seen order.
fn dedup(ids: Vec<i64>) -> Vec<i64> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if id > 0 && !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn plain_text_defaults_to_text_intent() {
        let parsed = parse_response("  Olá! Como posso ajudar?  ");
        assert_eq!(parsed, ParsedResponse::text("Olá! Como posso ajudar?"));
    }

    #[test]
    fn show_products_keeps_order_and_drops_repeats() {
        let raw = r#"Temos estes:
[ACTION]{"intent":"SHOW_PRODUCTS","product_ids":[15,12,15,0]}[/ACTION]"#;
        let parsed = parse_response(raw);
        assert_eq!(parsed.intent, Intent::ShowProducts);
        assert_eq!(parsed.product_ids, vec![15, 12]);
        assert_eq!(parsed.message, "Temos estes:");
    }

    #[test]
    fn catalog_intent_carries_no_ids() {
        let raw = r#"Veja o catálogo [ACTION]{"intent":"SHOW_CATALOG","product_ids":[1]}[/ACTION]"#;
        let parsed = parse_response(raw);
        assert_eq!(parsed.intent, Intent::ShowCatalog);
        assert!(parsed.product_ids.is_empty());
    }

    #[test]
    fn malformed_marker_falls_back_to_text() {
        let raw = r#"Oi [ACTION]{"intent":"SHOW_EVERYTHING"}[/ACTION]"#;
        let parsed = parse_response(raw);
        assert_eq!(parsed, ParsedResponse::text("Oi"));
    }

    #[test]
    fn empty_input_is_empty_text() {
        assert_eq!(parse_response(""), ParsedResponse::text(""));
    }

    proptest! {
        #[test]
        fn prompt_marker_round_trips(
            ids in proptest::collection::hash_set(1i64..100_000, 0..6),
            body in "[A-Za-z0-9 ,.!?]{1,60}",
        ) {
            let ids: Vec<i64> = ids.into_iter().collect();
            let marker = ActionMarker::new(Intent::ShowProducts, ids.clone());
            let parsed = parse_response(&format!("{body}\n\n{}", marker.render()));
            prop_assert_eq!(parsed.intent, Intent::ShowProducts);
            prop_assert_eq!(parsed.product_ids, ids);
            prop_assert_eq!(parsed.message, body.trim().to_string());
        }

        #[test]
        fn arbitrary_text_never_panics(raw in ".{0,200}") {
            let _ = parse_response(&raw);
        }
    }
}
