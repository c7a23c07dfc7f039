//! Sanitizes draft rows into [`Item`]s.
//!
//! Normalization never fails. Input that cannot be read as a number turns into a value the
//! validator rejects: a NaN price, or a zero quantity.

use super::domain::{DraftItem, DraftValue, Item};

pub fn normalize(draft: &DraftItem) -> Item {
    Item {
        name: draft.name.trim().to_string(),
        price: coerce_number(&draft.price),
        quantity: coerce_quantity(&draft.quantity),
    }
}

/// Truncates toward zero and clamps to at least 1; NaN or infinite input becomes 0.
pub fn coerce_quantity(value: &DraftValue) -> i64 {
    let number = coerce_number(value);
    if !number.is_finite() {
        return 0;
    }
    (number.trunc() as i64).max(1)
}

/// Reads a form value the way a numeric form field does.
pub fn coerce_number(value: &DraftValue) -> f64 {
    match value {
        DraftValue::Number(number) => *number,
        DraftValue::Null => 0.0,
        DraftValue::Text(text) => parse_numeric_text(text),
    }
}

fn parse_numeric_text(raw: &str) -> f64 {
    let text = raw.trim();
    if text.is_empty() {
        return 0.0;
    }

    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    if let Some(number) = parse_radix_literal(text) {
        return number;
    }

    // `f64::from_str` also takes "inf", "nan" and "infinity" in any case; a form field does not.
    let lowered = text.to_ascii_lowercase();
    if lowered.contains("inf") || lowered.contains("nan") {
        return f64::NAN;
    }

    text.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_radix_literal(text: &str) -> Option<f64> {
    let prefix = text.get(..2)?;
    let radix = match prefix {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    let digits = &text[2..];
    if digits.is_empty() {
        return Some(f64::NAN);
    }

    let mut total = 0.0_f64;
    for ch in digits.chars() {
        match ch.to_digit(radix) {
            Some(digit) => total = total * f64::from(radix) + f64::from(digit),
            None => return Some(f64::NAN),
        }
    }
    Some(total)
}
