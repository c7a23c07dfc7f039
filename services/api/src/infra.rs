use chrono::Utc;
use cost_ledger::items::{
    DraftItem, DraftValue, Item, ItemRepository, MergeKey, RepositoryError, StoredItem,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
struct ItemTable {
    rows: BTreeMap<i64, StoredItem>,
    last_id: i64,
}

impl ItemTable {
    fn find_by_key(&self, key: &MergeKey, except: Option<i64>) -> Option<i64> {
        self.rows
            .values()
            .find(|row| Some(row.id) != except && MergeKey::of(&row.name, row.price) == *key)
            .map(|row| row.id)
    }

    fn upsert(&mut self, item: &Item) -> Result<StoredItem, RepositoryError> {
        let key = MergeKey::of(&item.name, item.price);
        if let Some(row) = self
            .find_by_key(&key, None)
            .and_then(|id| self.rows.get_mut(&id))
        {
            row.quantity = merged_quantity(row.quantity, item.quantity)?;
            return Ok(row.clone());
        }

        self.last_id += 1;
        let row = StoredItem {
            id: self.last_id,
            name: item.name.clone(),
            price: item.price,
            quantity: item.quantity,
            created_at: Utc::now(),
        };
        self.rows.insert(row.id, row.clone());
        Ok(row)
    }
}

fn merged_quantity(current: i64, added: i64) -> Result<i64, RepositoryError> {
    current
        .checked_add(added)
        .ok_or(RepositoryError::QuantityOverflow)
}

/// Process-local item store; rows live as long as the server does.
#[derive(Default, Clone)]
pub(crate) struct InMemoryItemRepository {
    table: Arc<Mutex<ItemTable>>,
}

impl InMemoryItemRepository {
    fn lock(&self) -> Result<MutexGuard<'_, ItemTable>, RepositoryError> {
        self.table
            .lock()
            .map_err(|_| RepositoryError::Unavailable("item table lock poisoned".to_string()))
    }
}

impl ItemRepository for InMemoryItemRepository {
    fn insert_batch(&self, items: &[Item]) -> Result<(), RepositoryError> {
        let mut table = self.lock()?;
        let mut staged = table.clone();
        for item in items {
            staged.upsert(item)?;
        }
        *table = staged;
        Ok(())
    }

    fn list(&self, limit: usize) -> Result<Vec<StoredItem>, RepositoryError> {
        let table = self.lock()?;
        Ok(table.rows.values().rev().take(limit).cloned().collect())
    }

    fn fetch(&self, id: i64) -> Result<Option<StoredItem>, RepositoryError> {
        Ok(self.lock()?.rows.get(&id).cloned())
    }

    fn update(&self, id: i64, item: &Item) -> Result<(StoredItem, bool), RepositoryError> {
        let mut table = self.lock()?;
        if !table.rows.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }

        let key = MergeKey::of(&item.name, item.price);
        if let Some(target) = table.find_by_key(&key, Some(id)) {
            let row = table.rows.get_mut(&target).ok_or(RepositoryError::NotFound)?;
            row.quantity = merged_quantity(row.quantity, item.quantity)?;
            let merged = row.clone();
            table.rows.remove(&id);
            return Ok((merged, true));
        }

        let row = table.rows.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        row.name = item.name.clone();
        row.price = item.price;
        row.quantity = item.quantity;
        Ok((row.clone(), false))
    }

    fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        self.lock()?
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn delete_all(&self) -> Result<(), RepositoryError> {
        self.lock()?.rows.clear();
        Ok(())
    }

    fn all(&self) -> Result<Vec<StoredItem>, RepositoryError> {
        Ok(self.lock()?.rows.values().cloned().collect())
    }
}

/// Parses `NAME,PRICE,QUANTITY`; the name may itself contain commas.
pub(crate) fn parse_item_arg(raw: &str) -> Result<DraftItem, String> {
    let mut parts = raw.rsplitn(3, ',');
    let (Some(quantity), Some(price), Some(name)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!(
            "expected NAME,PRICE,QUANTITY but got '{raw}'"
        ));
    };

    Ok(DraftItem {
        name: name.to_string(),
        price: DraftValue::Text(price.to_string()),
        quantity: DraftValue::Text(quantity.to_string()),
    })
}
