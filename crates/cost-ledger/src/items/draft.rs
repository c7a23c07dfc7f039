//! Form state for the item editor: editable rows, live preview, and the submit flow.
//!
//! Submission is split into [`DraftSession::begin_submit`] and [`DraftSession::finish_submit`]
//! so an event loop can run the request elsewhere while the session refuses a second submit.
//! [`DraftSession::submit`] drives both halves against an [`ItemsGateway`].

use tracing::{info, warn};

use super::client::{BulkOutcome, ClientError, ItemsGateway};
use super::domain::{DraftItem, DraftValue, Item};
use super::normalizer::normalize;
use super::stats::{self, Stats};
use super::validator::is_valid;

pub const NO_VALID_ITEMS: &str = "Add at least one valid item (name, price ≥ 0, quantity ≥ 1).";
pub const SAVED_NOTICE: &str = "Items saved. Stats updated.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A dismissible message about the last submit. Each one carries a fresh id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("{}", NO_VALID_ITEMS)]
    NoValidItems,
    #[error("a submission is already in flight")]
    InFlight,
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Clone)]
pub struct DraftSession {
    rows: Vec<DraftItem>,
    batch: Option<Stats>,
    global: Option<Stats>,
    notice: Option<Notice>,
    submitting: bool,
    notice_sequence: u64,
}

impl Default for DraftSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftSession {
    pub fn new() -> Self {
        Self {
            rows: vec![DraftItem::blank()],
            batch: None,
            global: None,
            notice: None,
            submitting: false,
            notice_sequence: 0,
        }
    }

    pub fn with_rows(rows: Vec<DraftItem>) -> Self {
        Self {
            rows,
            ..Self::new()
        }
    }

    pub fn rows(&self) -> &[DraftItem] {
        &self.rows
    }

    pub fn add_row(&mut self) {
        self.rows.push(DraftItem::blank());
    }

    /// Removes the row at `index`; out-of-range indexes are ignored.
    pub fn delete_row(&mut self, index: usize) -> Option<DraftItem> {
        (index < self.rows.len()).then(|| self.rows.remove(index))
    }

    pub fn set_name(&mut self, index: usize, name: impl Into<String>) -> bool {
        self.edit(index, |row| row.name = name.into())
    }

    pub fn set_price(&mut self, index: usize, price: impl Into<DraftValue>) -> bool {
        self.edit(index, |row| row.price = price.into())
    }

    pub fn set_quantity(&mut self, index: usize, quantity: impl Into<DraftValue>) -> bool {
        self.edit(index, |row| row.quantity = quantity.into())
    }

    fn edit(&mut self, index: usize, apply: impl FnOnce(&mut DraftItem)) -> bool {
        match self.rows.get_mut(index) {
            Some(row) => {
                apply(row);
                true
            }
            None => false,
        }
    }

    /// Back to a single blank row; saved stats and the notice are forgotten too.
    pub fn clear(&mut self) {
        self.rows = vec![DraftItem::blank()];
        self.batch = None;
        self.global = None;
        self.notice = None;
    }

    pub fn preview(&self) -> Stats {
        stats::preview(&self.rows)
    }

    /// The rows that would be sent: normalized and filtered to valid ones.
    pub fn payload(&self) -> Result<Vec<Item>, SubmissionError> {
        let items: Vec<Item> = self
            .rows
            .iter()
            .map(normalize)
            .filter(is_valid)
            .collect();
        if items.is_empty() {
            return Err(SubmissionError::NoValidItems);
        }
        Ok(items)
    }

    pub fn batch(&self) -> Option<&Stats> {
        self.batch.as_ref()
    }

    pub fn global(&self) -> Option<&Stats> {
        self.global.as_ref()
    }

    pub fn last_notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Marks the session busy and hands back the payload to send.
    ///
    /// A validation failure is reported as an error notice and the session stays idle.
    pub fn begin_submit(&mut self) -> Result<Vec<Item>, SubmissionError> {
        if self.submitting {
            return Err(SubmissionError::InFlight);
        }
        self.notice = None;

        match self.payload() {
            Ok(items) => {
                self.submitting = true;
                Ok(items)
            }
            Err(err) => {
                self.push_notice(NoticeKind::Error, err.to_string());
                Err(err)
            }
        }
    }

    /// Applies the response. Failures leave the previous batch and global stats untouched.
    pub fn finish_submit(
        &mut self,
        result: Result<BulkOutcome, ClientError>,
    ) -> Result<BulkOutcome, SubmissionError> {
        self.submitting = false;
        match result {
            Ok(outcome) => {
                info!(
                    lines = outcome.batch.line_item_count,
                    total_cost = outcome.batch.total_cost,
                    "items saved"
                );
                self.batch = Some(outcome.batch);
                self.global = Some(outcome.global);
                self.push_notice(NoticeKind::Success, SAVED_NOTICE.to_string());
                Ok(outcome)
            }
            Err(err) => {
                warn!(error = %err, "item submission failed");
                self.push_notice(NoticeKind::Error, err.to_string());
                Err(SubmissionError::Client(err))
            }
        }
    }

    pub async fn submit<G>(&mut self, gateway: &G) -> Result<BulkOutcome, SubmissionError>
    where
        G: ItemsGateway + ?Sized,
    {
        let items = self.begin_submit()?;
        let result = gateway.save_and_calculate(&items).await;
        self.finish_submit(result)
    }

    fn push_notice(&mut self, kind: NoticeKind, text: String) {
        self.notice_sequence += 1;
        self.notice = Some(Notice {
            id: self.notice_sequence,
            kind,
            text,
        });
    }
}
