//! Line items and the statistics derived from them.
//!
//! The pure core is [`normalizer`], [`validator`] and [`stats`]. [`draft`] holds editor state,
//! [`client`] speaks the HTTP contract, and [`service`]/[`router`] serve it.

pub mod client;
pub mod domain;
pub mod draft;
pub mod import;
pub mod normalizer;
pub mod repository;
pub mod router;
pub mod service;
pub mod stats;
pub mod validator;

pub use client::{BulkOutcome, ClientError, ItemsClient, ItemsGateway};
pub use domain::{BulkItemsRequest, DraftItem, DraftValue, Item, MergeKey, StoredItem};
pub use draft::{DraftSession, Notice, NoticeKind, SubmissionError};
pub use import::{ItemImport, ItemImportError};
pub use normalizer::normalize;
pub use repository::{ItemRepository, RepositoryError};
pub use router::{item_routes, items_router, with_cors};
pub use service::{ItemLedgerService, ItemServiceError};
pub use stats::{aggregate, preview, round2, Stats};
pub use validator::{is_valid, validate, ItemRejection};
