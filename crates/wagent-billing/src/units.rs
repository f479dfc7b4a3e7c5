// SPDX-FileCopyrightText: 2026 Wagent Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unit cost model.
//!
//! Overage is priced either per unit kind (AI reply, product card, media item)
//! or at one flat price per unit, selected by `billing.cost_scheme`.

use wagent_config::model::{BillingConfig, CostScheme};
use wagent_core::billing::{BillableUnits, UnitKind};

/// Prices in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostModel {
    PerUnitType {
        ai_reply_cents: i64,
        product_cents: i64,
        media_cents: i64,
    },
    Flat {
        unit_cents: i64,
    },
}

impl CostModel {
    pub fn from_config(config: &BillingConfig) -> Self {
        match config.cost_scheme {
            CostScheme::PerUnitType => CostModel::PerUnitType {
                ai_reply_cents: config.unit_costs.ai_reply_cents,
                product_cents: config.unit_costs.product_cents,
                media_cents: config.unit_costs.media_cents,
            },
            CostScheme::Flat => CostModel::Flat {
                unit_cents: config.flat_unit_cost_cents,
            },
        }
    }

    pub fn unit_cost(&self, kind: UnitKind) -> i64 {
        match (*self, kind) {
            (CostModel::Flat { unit_cents }, _) => unit_cents,
            (CostModel::PerUnitType { ai_reply_cents, .. }, UnitKind::AiReply) => ai_reply_cents,
            (CostModel::PerUnitType { product_cents, .. }, UnitKind::Product) => product_cents,
            (CostModel::PerUnitType { media_cents, .. }, UnitKind::Media) => media_cents,
        }
    }

    /// Price of all units of one message.
    pub fn cost_of(&self, units: &BillableUnits) -> i64 {
        [UnitKind::AiReply, UnitKind::Product, UnitKind::Media]
            .into_iter()
            .map(|kind| i64::from(units.count(kind)) * self.unit_cost(kind))
            .sum()
    }

    /// Price of `units` not yet broken down by kind, priced as AI replies.
    pub fn estimate(&self, units: u32) -> i64 {
        i64::from(units) * self.unit_cost(UnitKind::AiReply)
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::from_config(&BillingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PER_TYPE: CostModel = CostModel::PerUnitType {
        ai_reply_cents: 5,
        product_cents: 3,
        media_cents: 2,
    };

    #[test]
    fn default_is_per_unit_type() {
        assert_eq!(CostModel::default(), PER_TYPE);
    }

    #[test]
    fn flat_scheme_from_config() {
        let config = BillingConfig {
            cost_scheme: CostScheme::Flat,
            flat_unit_cost_cents: 7,
            ..BillingConfig::default()
        };
        let model = CostModel::from_config(&config);
        assert_eq!(model, CostModel::Flat { unit_cents: 7 });
        let units = BillableUnits {
            ai_replies: 1,
            products: 3,
            media: 6,
        };
        assert_eq!(model.cost_of(&units), 70);
    }

    #[test]
    fn per_type_cost_of_three_products_with_media() {
        let units = BillableUnits {
            ai_replies: 1,
            products: 3,
            media: 6,
        };
        assert_eq!(PER_TYPE.cost_of(&units), 5 + 9 + 12);
        assert_eq!(PER_TYPE.estimate(2), 10);
    }

    proptest! {
        #[test]
        fn flat_cost_is_total_times_price(ai in 0u32..2, products in 0u32..50, media in 0u32..200, price in 0i64..1000) {
            let units = BillableUnits { ai_replies: ai, products, media };
            let model = CostModel::Flat { unit_cents: price };
            prop_assert_eq!(model.cost_of(&units), i64::from(units.total()) * price);
        }

        #[test]
        fn per_type_cost_is_additive(a in 0u32..20, b in 0u32..20, c in 0u32..20) {
            let only = |ai, products, media| PER_TYPE.cost_of(&BillableUnits { ai_replies: ai, products, media });
            prop_assert_eq!(only(a, b, c), only(a, 0, 0) + only(0, b, 0) + only(0, 0, c));
        }
    }
}
