//! Traits and interfaces for source-agnostic card imports

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::cancel::CancellationToken;
use crate::database::Catalog;
use crate::error::{ImportError, RecordError, Result};
use crate::fields;
use crate::importer;
use crate::models::{CardRecord, ImportOptions, ImportSummary, PrintingMatch};
use crate::payload;
use crate::scraper::{ListingSelectors, PageFetcher};

/// Configuration for a card source
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Registry key, matched case-insensitively
    pub key: String,
    /// Display name for logs
    pub name: String,
    /// Game every card from this source belongs to; empty when records name
    /// their own game
    pub game: String,
    /// Base URL for remote requests
    pub base_url: String,
    /// How existing printings are matched
    pub printing_match: PrintingMatch,
    /// Whether remote imports need a set code
    pub requires_set_code: bool,
    /// Pause between consecutive remote fetches
    pub request_delay: Duration,
}

/// A card data source able to import from its remote service or from an
/// uploaded export.
#[async_trait]
pub trait CardSource: Send + Sync {
    /// Get the configuration for this source
    fn config(&self) -> &SourceConfig;

    /// Catalog this source writes into
    fn catalog(&self) -> &Catalog;

    fn key(&self) -> &str {
        &self.config().key
    }

    /// Turn one raw record into zero or more normalized printings.
    fn normalize(&self, raw: &Value) -> std::result::Result<Vec<CardRecord>, RecordError>;

    /// Fetch and import cards from the remote service.
    async fn import_from_remote(
        &self,
        options: &ImportOptions,
        cancel: &CancellationToken,
    ) -> Result<ImportSummary>;

    /// Import an uploaded CSV or JSON payload.
    async fn import_from_file(
        &self,
        reader: &mut (dyn AsyncRead + Unpin + Send),
        options: &ImportOptions,
        cancel: &CancellationToken,
    ) -> Result<ImportSummary> {
        let mut bytes = Vec::new();
        cancel.guard(reader.read_to_end(&mut bytes)).await??;
        let records = payload::parse_records(&bytes)?;
        importer::import_records(self, records, options, cancel).await
    }

    /// Upper-cased set code, or a precondition failure when this source
    /// requires one and none was given. Sources that scope themselves get an
    /// empty code instead.
    fn required_set_code(&self, options: &ImportOptions) -> Result<String> {
        match options.set_code() {
            Some(code) => Ok(fields::set_code(code)),
            None if !self.config().requires_set_code => Ok(String::new()),
            None => Err(ImportError::MissingSetCode {
                source_key: self.key().to_string(),
            }),
        }
    }

    /// Fill `{base}` and `{set}` placeholders, URL-encoding the set code.
    fn build_url(&self, pattern: &str, set_code: &str) -> String {
        let encoded = urlencoding::encode(set_code);
        pattern
            .replace("{base}", self.config().base_url.trim_end_matches('/'))
            .replace("{set}", &encoded)
    }
}

/// A source served by a paginated JSON API.
pub trait PagedSource: CardSource {
    fn fetcher(&self) -> &PageFetcher;

    fn first_page_url(&self, set_code: &str) -> String;

    /// Raw records on a fetched page, restricted to `set_code` where the
    /// API returns more than was asked for.
    fn page_records(&self, page: &Value, set_code: &str) -> Vec<Value>;

    /// Continuation URL, or `None` on the last page.
    fn next_page_url(&self, page: &Value, current_url: &str) -> Option<String>;
}

/// A source scraped from HTML listing and card detail pages.
pub trait ScrapedSource: CardSource {
    fn fetcher(&self) -> &PageFetcher;

    fn listing_url(&self, set_code: &str) -> String;

    fn listing(&self) -> &ListingSelectors;

    /// Extract the raw field map of one card detail page.
    fn parse_detail(&self, html: &str, url: &str) -> std::result::Result<Value, RecordError>;
}
