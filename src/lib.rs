// src/lib.rs
//! Catalog extraction pipeline: fetch BattleScribe-style catalog files, parse
//! them with a tolerant markup parser, classify and merge their entries, lay
//! the override tables on top and hand out finished templates.
//!
//! Entry points: [`store::Store`] for cached per-concept loads,
//! [`scrape::run`] for one-shot loads.

#[macro_use]
pub mod macros;
#[macro_use]
pub mod log;

pub mod assemble;
pub mod catalog;
pub mod config;
pub mod core;
pub mod error;
pub mod overrides;
pub mod progress;
pub mod scrape;
pub mod store;

#[cfg(feature = "cli")]
pub mod cli;

pub use assemble::{ConceptResult, TitanResult, TitanTemplate};
pub use config::CatalogOptions;
pub use error::{Error, Result};
pub use scrape::{Collected, Concept};
pub use store::{ResultCache, Status, Store};
