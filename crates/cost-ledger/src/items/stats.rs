use serde::{Deserialize, Serialize};

use super::domain::{DraftItem, Item};
use super::normalizer::normalize;
use super::validator::is_valid;

/// Summary of a set of valid items. Always recomputed, never patched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub line_item_count: u64,
    pub total_quantity: u64,
    pub total_cost: f64,
    pub avg_unit_price: f64,
    pub avg_line_cost: f64,
}

/// Rounds half up at the second decimal.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Reduces items that already passed validation. `total_quantity` saturates at `u64::MAX`.
pub fn aggregate<'a, I>(items: I) -> Stats
where
    I: IntoIterator<Item = &'a Item>,
{
    let (line_item_count, total_quantity, raw_cost) =
        items
            .into_iter()
            .fold((0_u64, 0_u64, 0.0_f64), |(count, quantity, cost), item| {
                (
                    count + 1,
                    quantity.saturating_add(item.quantity.max(0) as u64),
                    cost + item.line_cost(),
                )
            });

    let total_cost = round2(raw_cost);
    let avg_unit_price = if total_quantity > 0 {
        round2(total_cost / total_quantity as f64)
    } else {
        0.0
    };
    let avg_line_cost = if line_item_count > 0 {
        round2(total_cost / line_item_count as f64)
    } else {
        0.0
    };

    Stats {
        line_item_count,
        total_quantity,
        total_cost,
        avg_unit_price,
        avg_line_cost,
    }
}

/// Live preview: normalize every row, drop the invalid ones, aggregate the rest.
pub fn preview<'a, I>(drafts: I) -> Stats
where
    I: IntoIterator<Item = &'a DraftItem>,
{
    let valid: Vec<Item> = drafts
        .into_iter()
        .map(normalize)
        .filter(is_valid)
        .collect();
    aggregate(&valid)
}
