// src/lib.rs

//! Curator Extension Registry
//!
//! Mutation-and-aggregation engine for a software extension registry: an
//! in-memory catalog of published packages with ownership enforcement,
//! strict version ordering, and download-statistics aggregation.
//!
//! # Architecture
//!
//! - Registry-first: the in-memory map is authoritative; storage backends
//!   persist snapshots of it asynchronously
//! - Per-name locking: mutations of the same package are serialized, while
//!   unrelated packages mutate concurrently
//! - Typed commands: administrative operations go through one
//!   authorize-apply-persist executor
//! - Trait seams: validation, storage, and ownership resolution are
//!   pluggable collaborators

pub mod auth;
pub mod config;
mod error;
pub mod registry;
pub mod storage;
pub mod validate;
pub mod version;

pub use error::{Error, Result};
