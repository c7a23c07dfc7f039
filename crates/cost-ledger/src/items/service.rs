use std::sync::Arc;

use tracing::{debug, info};

use super::client::BulkOutcome;
use super::domain::{Item, StoredItem};
use super::repository::{ItemRepository, RepositoryError};
use super::stats::{aggregate, round2, Stats};
use super::validator::{is_valid, validate, ItemRejection};

pub const DEFAULT_LIST_LIMIT: usize = 100;
pub const MAX_LIST_LIMIT: usize = 1000;

/// Server side of the items contract: validates, persists and reports statistics.
pub struct ItemLedgerService<R> {
    repository: Arc<R>,
}

impl<R> ItemLedgerService<R>
where
    R: ItemRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Store a submission; the whole batch is rejected if any item fails validation.
    pub fn bulk_save(&self, items: Vec<Item>) -> Result<BulkOutcome, ItemServiceError> {
        if items.is_empty() {
            return Err(ItemServiceError::EmptyBatch);
        }

        let rows = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let item = sanitize(item);
                validate(&item).map_err(|reason| ItemServiceError::Rejected { index, reason })?;
                Ok(Item {
                    price: round2(item.price),
                    ..item
                })
            })
            .collect::<Result<Vec<_>, ItemServiceError>>()?;

        let batch = aggregate(&rows);
        self.repository.insert_batch(&rows)?;
        let global = self.global_stats()?;
        info!(
            lines = batch.line_item_count,
            batch_cost = batch.total_cost,
            global_cost = global.total_cost,
            "bulk items stored"
        );

        Ok(BulkOutcome {
            message: "saved".to_string(),
            batch,
            global,
        })
    }

    /// Stats for the valid items of a submission without storing anything.
    pub fn preview(&self, items: Vec<Item>) -> Stats {
        let valid: Vec<Item> = items.into_iter().map(sanitize).filter(is_valid).collect();
        debug!(valid = valid.len(), "preview computed");
        aggregate(&valid)
    }

    pub fn list(&self, limit: Option<usize>) -> Result<Vec<StoredItem>, ItemServiceError> {
        let limit = limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        Ok(self.repository.list(limit)?)
    }

    pub fn fetch(&self, id: i64) -> Result<StoredItem, ItemServiceError> {
        self.repository
            .fetch(id)?
            .ok_or(ItemServiceError::Repository(RepositoryError::NotFound))
    }

    pub fn update(&self, id: i64, item: Item) -> Result<(StoredItem, bool), ItemServiceError> {
        let item = sanitize(item);
        validate(&item)?;
        let item = Item {
            price: round2(item.price),
            ..item
        };
        let (stored, merged) = self.repository.update(id, &item)?;
        info!(id, target = stored.id, merged, "item updated");
        Ok((stored, merged))
    }

    pub fn delete(&self, id: i64) -> Result<(), ItemServiceError> {
        self.repository.delete(id)?;
        info!(id, "item deleted");
        Ok(())
    }

    pub fn delete_all(&self) -> Result<(), ItemServiceError> {
        self.repository.delete_all()?;
        info!("all items deleted");
        Ok(())
    }

    pub fn global_stats(&self) -> Result<Stats, ItemServiceError> {
        let rows: Vec<Item> = self
            .repository
            .all()?
            .iter()
            .map(StoredItem::as_item)
            .collect();
        Ok(aggregate(&rows))
    }
}

fn sanitize(item: Item) -> Item {
    Item {
        name: item.name.trim().to_string(),
        ..item
    }
}

/// Error raised by the ledger service.
#[derive(Debug, thiserror::Error)]
pub enum ItemServiceError {
    #[error("items cannot be empty")]
    EmptyBatch,
    #[error("item {index}: {reason}")]
    Rejected { index: usize, reason: ItemRejection },
    #[error(transparent)]
    Invalid(#[from] ItemRejection),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
