//! Multi-source trading card catalog importer.
//!
//! Pulls card data from third-party card databases (JSON APIs and scraped
//! HTML sites) or from uploaded CSV/JSON exports, normalizes it into a shared
//! catalog of cards and printings, and upserts it idempotently. Every import
//! runs inside one transaction and can be executed as a dry run.

pub mod cancel;
pub mod config;
pub mod database;
pub mod error;
pub mod fields;
pub mod importer;
pub mod models;
pub mod payload;
pub mod registry;
pub mod scraper;
pub mod sources;
pub mod traits;
pub mod upsert;

pub use cancel::CancellationToken;
pub use config::{HttpSettings, ImporterConfig, RunSettings};
pub use database::{Catalog, UnitOfWork, run_with_dry_run};
pub use error::{ImportError, RecordError, Result};
pub use models::{
    Card, CardPrinting, CardRecord, ImportOptions, ImportSummary, PrintingMatch, Style,
};
pub use registry::AdapterRegistry;
pub use traits::{CardSource, PagedSource, ScrapedSource, SourceConfig};
