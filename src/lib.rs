#![doc = "notion-mirror: content-extraction and synchronisation engine for workspace mirroring."]

//! This crate mirrors selected pages and databases from a Notion workspace
//! into a local store and re-renders the hierarchical, richly-typed remote
//! content into flat markdown for downstream consumption.
//!
//! # Usage
//! Inject a [`contract::WorkspaceSource`] and a [`contract::RecordStore`]
//! into a [`synchronise::Synchroniser`], then call `run_full_sync` (or
//! `sync_one` for a single target).

pub mod cli;
pub mod config;
pub mod contract;
pub mod load_config;
pub mod notion;
pub mod property;
pub mod render;
pub mod store;
pub mod synchronise;
