// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model pricing tables and completion cost.
//!
//! Prices are USD per million tokens, matched on model-name substrings:
//!
//! | family          | input | output |
//! |-----------------|-------|--------|
//! | claude opus     | 15.00 | 75.00  |
//! | claude sonnet   |  3.00 | 15.00  |
//! | claude haiku    |  0.80 |  4.00  |
//! | gpt-4o-mini     |  0.15 |  0.60  |
//! | gpt-4o          |  2.50 | 10.00  |
//! | gpt-4.1-mini    |  0.40 |  1.60  |
//! | gpt-4.1         |  2.00 |  8.00  |

use wagent_core::TokenUsage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

const fn pricing(input_per_mtok: f64, output_per_mtok: f64) -> ModelPricing {
    ModelPricing {
        input_per_mtok,
        output_per_mtok,
    }
}

/// Most specific patterns first.
const TABLE: &[(&str, ModelPricing)] = &[
    ("opus", pricing(15.0, 75.0)),
    ("haiku", pricing(0.80, 4.0)),
    ("sonnet", pricing(3.0, 15.0)),
    ("gpt-4o-mini", pricing(0.15, 0.60)),
    ("gpt-4o", pricing(2.50, 10.0)),
    ("gpt-4.1-mini", pricing(0.40, 1.60)),
    ("gpt-4.1", pricing(2.0, 8.0)),
];

/// Used for models missing from the table, so cost is never silently zero.
const UNKNOWN: ModelPricing = pricing(3.0, 15.0);

pub fn get_pricing(model: &str) -> ModelPricing {
    let lower = model.to_lowercase();
    TABLE
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map(|(_, p)| *p)
        .unwrap_or(UNKNOWN)
}

/// Cost in USD of `usage` at `pricing`.
pub fn calculate_cost(usage: &TokenUsage, pricing: &ModelPricing) -> f64 {
    let input = (usage.input_tokens as f64 / 1_000_000.0) * pricing.input_per_mtok;
    let output = (usage.output_tokens as f64 / 1_000_000.0) * pricing.output_per_mtok;
    input + output
}
