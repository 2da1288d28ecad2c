//! High-level pipeline: fetch remote items, render them flat, upsert records.
//!
//! This module provides the synchronisation logic for mirroring enabled
//! targets into the record store:
//!   - [`sync_page`] mirrors one page: metadata fetch, recursive block
//!     render, permission-failure classification, upsert.
//!   - [`sync_collection`] mirrors one database: metadata fetch, paginated
//!     row walk, per-row property extraction and nested render, upsert.
//!   - [`Synchroniser`] orchestrates a full run over all enabled targets and
//!     aggregates a [`SyncReport`].
//!
//! # Error Handling
//! Per-item faults are contained: a failed page or collection sync logs and
//! counts as a failure in the report, it never aborts the remaining targets.
//! Only a missing API credential is fatal to a run, and it short-circuits
//! before any store write.
//!
//! # Concurrency
//! Targets are processed one at a time within a run, so each item is
//! at-most-once-in-flight per cycle. Overlapping full runs (scheduled vs
//! on-demand trigger) are serialized by a run-level mutex; upserts are
//! idempotent per key, so a re-run over unchanged data only moves
//! `last_synced`.

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::contract::{
    PropertyValue, RecordStore, StoreError, SyncTarget, SyncedRecord, TargetKind, WorkspaceSource,
};
use crate::property::{extract_property_value, resolve_title};
use crate::render::{flatten_rich_text, render_blocks};

/// Hard ceiling on row pages fetched per collection. The remote's `has_more`
/// signal is the normal terminator; the ceiling guards against a source that
/// never reports exhaustion.
pub const MAX_ROW_PAGES: usize = 100;

/// Stored content for a collection with no rows.
pub const EMPTY_COLLECTION_PLACEHOLDER: &str = "No entries in this database.";

/// Fatal errors for a full sync run. Per-item failures are not errors; they
/// are carried in the [`SyncReport`].
#[derive(Debug, Error)]
pub enum SyncRunError {
    #[error("no workspace API credential is configured")]
    MissingCredential,
    #[error("failed to load sync targets: {0}")]
    LoadTargets(StoreError),
}

/// Outcome of one full sync run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// Number of enabled targets dispatched.
    pub attempted: usize,
    /// Number of targets that synced successfully.
    pub synced: usize,
    /// The targets that failed, in dispatch order.
    pub failures: Vec<SyncFailure>,
}

/// One failed target within a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    pub remote_id: String,
    pub kind: TargetKind,
}

/// Mirror one page into the store. Returns true on success; any fetch or
/// store fault is logged and yields false.
pub async fn sync_page<S, R>(source: &S, store: &R, page_id: &str) -> bool
where
    S: WorkspaceSource,
    R: RecordStore,
{
    match sync_page_inner(source, store, page_id).await {
        Ok(()) => true,
        Err(e) => {
            error!(page_id, error = ?e, "Failed to sync page");
            false
        }
    }
}

async fn sync_page_inner<S, R>(source: &S, store: &R, page_id: &str) -> Result<(), StoreError>
where
    S: WorkspaceSource,
    R: RecordStore,
{
    let metadata = source.fetch_item_metadata(page_id).await?;
    let title = resolve_title(&metadata.properties);
    let content = render_blocks(source, page_id, 0).await;

    // Blank content means the integration can see the page but not read its
    // blocks; surfaced as a flag, not as an error.
    let has_permission_error = content.trim().is_empty();

    store
        .upsert_record(SyncedRecord {
            id: page_id.to_owned(),
            title,
            content,
            last_synced: Utc::now().to_rfc3339(),
            url: metadata.url,
            kind: TargetKind::Page,
            has_permission_error,
        })
        .await?;

    info!(page_id, has_permission_error, "Synced page");
    Ok(())
}

/// Mirror one collection (database) into the store. Returns true on success;
/// any fetch or store fault is logged and yields false.
pub async fn sync_collection<S, R>(source: &S, store: &R, collection_id: &str) -> bool
where
    S: WorkspaceSource,
    R: RecordStore,
{
    match sync_collection_inner(source, store, collection_id).await {
        Ok(()) => true,
        Err(e) => {
            error!(collection_id, error = ?e, "Failed to sync collection");
            false
        }
    }
}

async fn sync_collection_inner<S, R>(
    source: &S,
    store: &R,
    collection_id: &str,
) -> Result<(), StoreError>
where
    S: WorkspaceSource,
    R: RecordStore,
{
    let metadata = source.fetch_collection_metadata(collection_id).await?;
    let title = flatten_rich_text(&metadata.title);

    let mut entries: Vec<String> = Vec::new();
    let mut cursor: Option<String> = None;

    for page_no in 0.. {
        if page_no == MAX_ROW_PAGES {
            warn!(
                collection_id,
                page_no, "Row pagination ceiling reached, truncating collection"
            );
            break;
        }

        let page = source
            .query_collection_rows(collection_id, cursor.clone())
            .await?;

        for row in &page.rows {
            entries.push(render_row(source, row).await);
        }

        if !page.has_more {
            break;
        }
        if page.next_cursor.is_none() {
            warn!(
                collection_id,
                page_no, "Source reported more rows but no cursor, stopping pagination"
            );
            break;
        }
        cursor = page.next_cursor;
    }

    let content = if entries.is_empty() {
        EMPTY_COLLECTION_PLACEHOLDER.to_owned()
    } else {
        entries.join("\n")
    };

    store
        .upsert_record(SyncedRecord {
            id: collection_id.to_owned(),
            title,
            content,
            last_synced: Utc::now().to_rfc3339(),
            url: metadata.url,
            kind: TargetKind::Collection,
            has_permission_error: false,
        })
        .await?;

    info!(collection_id, rows = entries.len(), "Synced collection");
    Ok(())
}

/// Render one collection row: `### title`, bullet lines for the non-title
/// fields that extract to something, then the row's own nested content.
async fn render_row<S>(source: &S, row: &crate::contract::CollectionRow) -> String
where
    S: WorkspaceSource,
{
    let title = resolve_title(&row.properties);
    let mut parts: Vec<String> = vec![format!("### {title}\n")];

    let property_lines: Vec<String> = row
        .properties
        .iter()
        .filter(|field| !matches!(field.value, PropertyValue::Title(_)))
        .filter_map(|field| {
            let value = extract_property_value(&field.value);
            if value.is_empty() {
                None
            } else {
                Some(format!("- **{}**: {}", field.name, value))
            }
        })
        .collect();

    if !property_lines.is_empty() {
        parts.push(property_lines.join("\n"));
        parts.push("\n\n".to_owned());
    }

    let nested = render_blocks(source, &row.id, 0).await;
    if !nested.trim().is_empty() {
        parts.push(nested);
    }

    parts.push("\n".to_owned());
    parts.concat()
}

/// Orchestrates full sync runs over the enabled targets.
///
/// The workspace source is optional: `None` models an unconfigured API
/// credential, in which case [`Synchroniser::run_full_sync`] short-circuits
/// with [`SyncRunError::MissingCredential`] before touching the store.
pub struct Synchroniser<S, R> {
    source: Option<S>,
    store: R,
    run_lock: Mutex<()>,
}

impl<S, R> Synchroniser<S, R>
where
    S: WorkspaceSource,
    R: RecordStore,
{
    pub fn new(source: Option<S>, store: R) -> Self {
        Self {
            source,
            store,
            run_lock: Mutex::new(()),
        }
    }

    /// Read access to the injected store (record listing, status summaries).
    pub fn store(&self) -> &R {
        &self.store
    }

    /// Sync a single target, dispatched by kind. Returns true on success.
    pub async fn sync_one(&self, target: &SyncTarget) -> bool {
        let Some(source) = &self.source else {
            error!(
                remote_id = %target.remote_id,
                "Cannot sync target: no API credential configured"
            );
            return false;
        };

        match target.kind {
            TargetKind::Page => sync_page(source, &self.store, &target.remote_id).await,
            TargetKind::Collection => {
                sync_collection(source, &self.store, &target.remote_id).await
            }
        }
    }

    /// Run one full sync over every enabled target.
    ///
    /// Overlapping runs are serialized; one target's failure never aborts
    /// the remaining targets.
    pub async fn run_full_sync(&self) -> Result<SyncReport, SyncRunError> {
        let _guard = self.run_lock.lock().await;

        if self.source.is_none() {
            return Err(SyncRunError::MissingCredential);
        }

        let targets = self
            .store
            .load_enabled_targets()
            .await
            .map_err(SyncRunError::LoadTargets)?;

        info!(targets = targets.len(), "Starting full synchronisation run");

        let mut report = SyncReport {
            attempted: targets.len(),
            synced: 0,
            failures: Vec::new(),
        };

        for target in &targets {
            if self.sync_one(target).await {
                report.synced += 1;
            } else {
                report.failures.push(SyncFailure {
                    remote_id: target.remote_id.clone(),
                    kind: target.kind,
                });
            }
        }

        info!(
            synced = report.synced,
            attempted = report.attempted,
            failed = report.failures.len(),
            "Full synchronisation run complete"
        );
        Ok(report)
    }
}
