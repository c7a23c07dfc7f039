use super::domain::Item;

/// Why an item cannot be counted or submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ItemRejection {
    #[error("item name cannot be empty")]
    EmptyName,
    #[error("price must be valid and >= 0")]
    InvalidPrice,
    #[error("quantity must be >= 1")]
    InvalidQuantity,
}

pub fn validate(item: &Item) -> Result<(), ItemRejection> {
    if item.name.is_empty() {
        return Err(ItemRejection::EmptyName);
    }
    if !item.price.is_finite() || item.price < 0.0 {
        return Err(ItemRejection::InvalidPrice);
    }
    if item.quantity < 1 {
        return Err(ItemRejection::InvalidQuantity);
    }
    Ok(())
}

pub fn is_valid(item: &Item) -> bool {
    validate(item).is_ok()
}
