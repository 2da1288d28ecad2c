//! # contract: capability seams for the sync engine
//!
//! This module defines the two traits the engine depends on and the plain
//! data types that flow across them:
//!
//! - [`WorkspaceSource`]: read access to the remote workspace API (page
//!   metadata, block children, database metadata, paginated row queries).
//! - [`RecordStore`]: the injected document store the engine writes synced
//!   records to and reads sync selections from.
//!
//! ## Mocking & Testing
//! Both traits are annotated for `mockall`, exported behind the
//! `test-export-mocks` feature so the integration test suite can drive the
//! engine against deterministic fakes.
//!
//! ## Error Handling
//! All trait methods return boxed error trait objects. A failed remote call
//! is an ordinary fetch fault; the engine contains it at the smallest scope
//! (per block subtree, per item, per row) and never propagates it across
//! sibling work.

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

/// Boxed error for remote workspace fetch operations.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed error for record store operations.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Whether a sync target is a standalone page or a database ("collection").
///
/// Serialized as `page` / `database` to match the remote API's object names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Page,
    #[serde(rename = "database")]
    Collection,
}

/// A remote item marked for mirroring. Written by the selection toggle
/// collaborator; the engine only reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncTarget {
    pub remote_id: String,
    pub kind: TargetKind,
    pub enabled: bool,
}

/// One styled inline span of a rich text run. Only `plain_text` is carried;
/// styling is intentionally dropped (lossy flattening).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichTextSpan {
    pub plain_text: String,
}

impl RichTextSpan {
    pub fn new(plain_text: impl Into<String>) -> Self {
        Self {
            plain_text: plain_text.into(),
        }
    }
}

/// One node of the remote content tree, reconstructed per sync call.
///
/// Children are never embedded: they are fetched on demand via
/// [`WorkspaceSource::fetch_children`] and only when `has_children` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentNode {
    pub id: String,
    pub kind: BlockKind,
    pub has_children: bool,
}

/// Closed set of block kinds the renderer knows how to linearize.
///
/// Remote kinds outside this set decode to `Unknown` and contribute no text,
/// so new upstream block types degrade safely instead of failing a render.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Paragraph {
        rich_text: Vec<RichTextSpan>,
    },
    /// Heading levels 1 through 3.
    Heading {
        level: u8,
        rich_text: Vec<RichTextSpan>,
    },
    BulletedItem {
        rich_text: Vec<RichTextSpan>,
    },
    NumberedItem {
        rich_text: Vec<RichTextSpan>,
    },
    Code {
        rich_text: Vec<RichTextSpan>,
        language: Option<String>,
    },
    Quote {
        rich_text: Vec<RichTextSpan>,
    },
    Image {
        caption: Vec<RichTextSpan>,
        url: Option<String>,
    },
    File {
        caption: Vec<RichTextSpan>,
        url: Option<String>,
    },
    Unknown,
}

/// One typed field of a structured record (page property or database row
/// column), paired with its display name.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyField {
    pub name: String,
    pub value: PropertyValue,
}

/// Closed set of property kinds the extractor can turn into display strings.
///
/// Payloads carry only what extraction consumes; absent sub-fields are
/// already collapsed to `None`/empty at decode time.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Title(Vec<RichTextSpan>),
    RichText(Vec<RichTextSpan>),
    Number(Option<f64>),
    /// The selected option's name, if any.
    Select(Option<String>),
    /// Names of all selected options.
    MultiSelect(Vec<String>),
    Date(Option<DateValue>),
    /// Display names of the referenced people.
    People(Vec<String>),
    Url(Option<String>),
    Email(Option<String>),
    PhoneNumber(Option<String>),
    Checkbox(bool),
    Status(Option<String>),
    /// Filenames of the attached files.
    Files(Vec<String>),
    Unknown,
}

/// A date property payload: a start date, optionally a range end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateValue {
    pub start: String,
    pub end: Option<String>,
}

/// Metadata for a single page-like item: its typed properties (the title
/// lives in whichever field is tagged as title) and its canonical URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemMetadata {
    pub properties: Vec<PropertyField>,
    pub url: Option<String>,
}

/// Metadata for a collection (database): its title run and canonical URL.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionMetadata {
    pub title: Vec<RichTextSpan>,
    pub url: Option<String>,
}

/// One row of a collection query: the row's own id (also the root of its
/// nested block content) and its typed fields in API order.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionRow {
    pub id: String,
    pub properties: Vec<PropertyField>,
}

/// One page of a paginated collection query.
#[derive(Debug, Clone, PartialEq)]
pub struct RowPage {
    pub rows: Vec<CollectionRow>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// The stored mirror of one synced item. Each sync performs a full replace
/// keyed by `id`; no partial merge, no history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedRecord {
    pub id: String,
    pub title: String,
    /// The flattened, linearized text rendering of the remote content.
    pub content: String,
    /// ISO-8601 UTC timestamp of the sync that produced this record.
    pub last_synced: String,
    pub url: Option<String>,
    pub kind: TargetKind,
    /// For pages: true iff the rendered content was blank (the item is
    /// shared with the integration but its blocks are not readable).
    /// Collections always store false.
    pub has_permission_error: bool,
}

/// Read access to the remote workspace API.
///
/// Implemented by the real HTTP client ([`crate::notion::NotionClient`]) and
/// by test mocks. Timeouts and retries are the implementor's concern; the
/// engine treats any returned error as an ordinary fetch fault.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait WorkspaceSource: Send + Sync {
    /// Fetch the metadata (typed properties, URL) of a single page-like item.
    async fn fetch_item_metadata(&self, id: &str) -> Result<ItemMetadata, SourceError>;

    /// Fetch one page of a node's direct children, in source order.
    async fn fetch_children(&self, node_id: &str) -> Result<Vec<ContentNode>, SourceError>;

    /// Fetch the metadata (title run, URL) of a collection.
    async fn fetch_collection_metadata(&self, id: &str)
        -> Result<CollectionMetadata, SourceError>;

    /// Fetch one page of a collection's rows, continuing from `cursor`.
    async fn query_collection_rows(
        &self,
        id: &str,
        cursor: Option<String>,
    ) -> Result<RowPage, SourceError>;
}

/// The injected store capability the engine writes synced records to.
///
/// Upserts are keyed by record id: concurrent upserts to distinct keys do
/// not conflict, and re-upserting the same key is a full replace.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or fully replace the record keyed by `record.id`.
    async fn upsert_record(&self, record: SyncedRecord) -> Result<(), StoreError>;

    /// Fetch a single synced record by id.
    async fn get_record(&self, id: &str) -> Result<Option<SyncedRecord>, StoreError>;

    /// List all synced records.
    async fn list_records(&self) -> Result<Vec<SyncedRecord>, StoreError>;

    /// Insert or replace a sync selection, keyed by `target.remote_id`.
    /// Used by the selection toggle collaborator, not by the engine itself.
    async fn upsert_target(&self, target: SyncTarget) -> Result<(), StoreError>;

    /// Load every sync target currently marked enabled.
    async fn load_enabled_targets(&self) -> Result<Vec<SyncTarget>, StoreError>;
}
