//! Vocabulary review scheduling.
//!
//! The core is [`record`] (per-word state), [`scheduler`] (SM-2 advancement
//! and due-set ordering) and [`session`] (one pass over the due set), operating
//! on an explicit [`book::WordBook`]. Time is always passed in by the caller.
//! Storage, catalogs, the learner's [`custom`] dictionary, statistics and the
//! HTTP API sit around that core.

pub mod book;
pub mod catalog;
pub mod config;
pub mod custom;
pub mod error;
pub mod record;
pub mod scheduler;
pub mod session;
pub mod stats;
pub mod store;
pub mod web;

pub use book::WordBook;
pub use catalog::{CatalogEntry, CatalogProvider, StaticCatalog};
pub use custom::{CustomDictionary, CustomWord};
pub use error::{CatalogError, ConfigError, Error, Result, StoreError};
pub use record::{Difficulty, Schedule, WordRecord};
pub use scheduler::{Grade, advance, due_words};
pub use session::{ReviewSession, SessionSummary, Step};
pub use store::{JsonStore, Library, Persistence};
