//! Core types and the attribute projection engine for Vitrine catalogs.
//!
//! A product's feature/value attributes live twice: as relational assignment
//! rows and as a denormalised JSON projection used on the read path. This
//! crate keeps the two consistent, backfills catalog defaults, corrects
//! ordering drift and builds the grouped views consumed by rendering.
//!
//! The engine itself is synchronous. Only the [`store::CatalogStore`] boundary
//! and the [`batch::ResolutionBatch`] driver that talks to it are async. This
//! crate is free of database dependencies; backends live in their own crates.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod attribute;
pub mod attribute_catalog;
pub mod batch;
pub mod catalog;
pub mod defaults;
pub mod error;
pub mod id;
pub mod position;
pub mod product;
pub mod projection;
pub mod reconcile;
pub mod slug;
pub mod store;

pub use error::{Error, Result};

#[cfg(test)]
pub(crate) mod fixtures;
