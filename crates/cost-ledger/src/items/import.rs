use std::io::Read;
use std::path::Path;

use super::domain::{DraftItem, DraftValue};

const COLUMNS: [&str; 3] = ["name", "price", "quantity"];

#[derive(Debug)]
pub enum ItemImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingColumn(&'static str),
}

impl std::fmt::Display for ItemImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemImportError::Io(err) => write!(f, "failed to read item file: {}", err),
            ItemImportError::Csv(err) => write!(f, "invalid item CSV data: {}", err),
            ItemImportError::MissingColumn(column) => {
                write!(f, "item CSV is missing the '{}' column", column)
            }
        }
    }
}

impl std::error::Error for ItemImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ItemImportError::Io(err) => Some(err),
            ItemImportError::Csv(err) => Some(err),
            ItemImportError::MissingColumn(_) => None,
        }
    }
}

impl From<std::io::Error> for ItemImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ItemImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Loads draft rows from a `name,price,quantity` CSV export.
///
/// Values stay as text so the normalizer applies the same coercion as typed input.
pub struct ItemImport;

impl ItemImport {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<DraftItem>, ItemImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<DraftItem>, ItemImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let mut positions = [0_usize; 3];
        for (slot, column) in positions.iter_mut().zip(COLUMNS) {
            *slot = headers
                .iter()
                .position(|header| header.eq_ignore_ascii_case(column))
                .ok_or(ItemImportError::MissingColumn(column))?;
        }
        let [name_at, price_at, quantity_at] = positions;

        let mut drafts = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let field = |index: usize| record.get(index).unwrap_or_default().to_string();
            drafts.push(DraftItem {
                name: field(name_at),
                price: DraftValue::Text(field(price_at)),
                quantity: DraftValue::Text(field(quantity_at)),
            });
        }

        Ok(drafts)
    }
}
