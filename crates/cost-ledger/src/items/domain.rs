use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cost line: a named product at a unit price, bought `quantity` times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub price: f64,
    pub quantity: i64,
}

impl Item {
    pub fn new(name: impl Into<String>, price: f64, quantity: i64) -> Self {
        Self {
            name: name.into(),
            price,
            quantity,
        }
    }

    pub fn line_cost(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

/// A form field as the user left it: a number, the raw text they typed, or nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DraftValue {
    Number(f64),
    Text(String),
    Null,
}

impl Default for DraftValue {
    fn default() -> Self {
        Self::Null
    }
}

impl From<f64> for DraftValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for DraftValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for DraftValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DraftValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// An editable, unvalidated row of the draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: DraftValue,
    #[serde(default)]
    pub quantity: DraftValue,
}

impl DraftItem {
    pub fn new(
        name: impl Into<String>,
        price: impl Into<DraftValue>,
        quantity: impl Into<DraftValue>,
    ) -> Self {
        Self {
            name: name.into(),
            price: price.into(),
            quantity: quantity.into(),
        }
    }

    /// The blank row a fresh draft starts with.
    pub fn blank() -> Self {
        Self::new("", 0.0, 1_i64)
    }
}

impl Default for DraftItem {
    fn default() -> Self {
        Self::blank()
    }
}

impl From<Item> for DraftItem {
    fn from(item: Item) -> Self {
        Self::new(item.name, item.price, item.quantity)
    }
}

/// A row held by the ledger store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredItem {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

impl StoredItem {
    pub fn as_item(&self) -> Item {
        Item::new(self.name.clone(), self.price, self.quantity)
    }
}

/// Identity used when merging rows: case-insensitive trimmed name plus price in cents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergeKey {
    name: String,
    price_cents: i64,
}

impl MergeKey {
    pub fn of(name: &str, price: f64) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            price_cents: (price * 100.0).round() as i64,
        }
    }
}

/// Request body of `POST /api/items/bulk` and `POST /api/items/preview`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItemsRequest {
    pub items: Vec<Item>,
}
