//! Riftbound card gallery scraper

use async_trait::async_trait;
use serde_json::Value;

use crate::cancel::CancellationToken;
use crate::config::ImporterConfig;
use crate::database::Catalog;
use crate::error::{RecordError, Result};
use crate::fields;
use crate::importer;
use crate::models::{CardRecord, ImportOptions, ImportSummary, PrintingMatch, UNKNOWN_CARD_TYPE};
use crate::scraper::{DetailExtractor, ListingSelectors, PageFetcher};
use crate::traits::{CardSource, ScrapedSource, SourceConfig};

use super::source_config;

const DEFAULT_BASE_URL: &str = "https://riftbound.gg";
const LISTING_URL: &str = "{base}/cards?set={set}";
const CARD_LINK: &str = "a.card-tile, .card-grid a[href*='/cards/']";
const NEXT_PAGE: &str = "a[rel=next], .pagination a.next";

const NAME: &[&str] = &["name"];
const TYPE: &[&str] = &["card_type"];
const TEXT: &[&str] = &["text"];
const SET: &[&str] = &["set"];
const NUMBER: &[&str] = &["number"];
const RARITY: &[&str] = &["rarity"];
const FINISH: &[&str] = &["finish"];
const IMAGE: &[&str] = &["image"];

const CARD_DETAILS: &[(&str, &[&str])] = &[
    ("domain", &["domain"]),
    ("energy", &["energy"]),
    ("might", &["might"]),
    ("power", &["power"]),
    ("tags", &["tags"]),
];

const PRINTING_DETAILS: &[(&str, &[&str])] = &[
    ("finish", &["finish"]),
    ("artist", &["artist"]),
    ("detail_url", &["detail_url"]),
];

pub struct RiftboundSource {
    config: SourceConfig,
    catalog: Catalog,
    fetcher: PageFetcher,
    listing: ListingSelectors,
    detail: DetailExtractor,
}

impl RiftboundSource {
    pub fn new(catalog: Catalog, config: &ImporterConfig) -> Result<Self> {
        let source = source_config(
            config,
            "riftbound",
            "Riftbound",
            "Riftbound",
            DEFAULT_BASE_URL,
            PrintingMatch::SetNumberAndStyle,
        );

        let listing = ListingSelectors::new(&source.base_url, CARD_LINK, Some(NEXT_PAGE))?;
        let detail = DetailExtractor::new(&source.base_url)?
            .field("name", &["h1.card-name", ".card-header h1"], &["Name"])?
            .field("card_type", &[".card-type"], &["Type", "Card Type"])?
            .field("text", &[".card-text", ".rules-text"], &["Text", "Ability"])?
            .field("set", &[".card-set"], &["Set"])?
            .field("number", &[".card-number"], &["Number", "Card Number", "Collector Number"])?
            .field("rarity", &[".card-rarity"], &["Rarity"])?
            .field("finish", &[".card-finish"], &["Finish", "Variant"])?
            .field("domain", &[], &["Domain"])?
            .field("energy", &[], &["Energy", "Cost"])?
            .field("might", &[], &["Might"])?
            .field("power", &[], &["Power"])?
            .field("tags", &[], &["Tags"])?
            .field("artist", &[], &["Artist", "Illustrator"])?
            .url_field("image", &["img.card-image", ".card-art img"], &["data-src", "src"])?;

        Ok(Self {
            config: source,
            catalog,
            fetcher: PageFetcher::new(&config.http)?,
            listing,
            detail,
        })
    }

    /// `001/298` is stored as `001`.
    fn number(raw: &Value) -> std::result::Result<String, RecordError> {
        let number = fields::text(raw, NUMBER).map(|number| match number.split_once('/') {
            Some((own, _)) => own.trim().to_string(),
            None => number,
        });
        fields::collector_number(number)
    }

    /// Set labels read like `Origins (OGN)`; the code in parentheses wins.
    fn set_code(raw: &Value) -> Option<String> {
        let label = fields::text(raw, SET)?;
        let code = label
            .rsplit_once('(')
            .and_then(|(_, rest)| rest.split_once(')'))
            .map(|(code, _)| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .unwrap_or(label);
        Some(fields::set_code(&code))
    }
}

#[async_trait]
impl CardSource for RiftboundSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn normalize(&self, raw: &Value) -> std::result::Result<Vec<CardRecord>, RecordError> {
        let name = fields::required_text(raw, "name", NAME)?;
        let set_code = Self::set_code(raw).ok_or(RecordError::MissingField("set"))?;
        let number = Self::number(raw)?;

        Ok(vec![CardRecord {
            game: self.config.game.clone(),
            name,
            card_type: fields::text(raw, TYPE).unwrap_or_else(|| UNKNOWN_CARD_TYPE.to_string()),
            description: fields::text(raw, TEXT),
            card_details: fields::collect_details(raw, CARD_DETAILS)?,
            set_code,
            number,
            rarity: fields::text(raw, RARITY),
            style: fields::style_from_finishes(fields::list(raw, FINISH)),
            image_url: fields::text(raw, IMAGE),
            printing_details: fields::collect_details(raw, PRINTING_DETAILS)?,
        }])
    }

    async fn import_from_remote(
        &self,
        options: &ImportOptions,
        cancel: &CancellationToken,
    ) -> Result<ImportSummary> {
        importer::import_scraped(self, options, cancel).await
    }
}

impl ScrapedSource for RiftboundSource {
    fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    fn listing_url(&self, set_code: &str) -> String {
        self.build_url(LISTING_URL, &set_code.to_lowercase())
    }

    fn listing(&self) -> &ListingSelectors {
        &self.listing
    }

    fn parse_detail(&self, html: &str, url: &str) -> std::result::Result<Value, RecordError> {
        let mut fields = self.detail.extract(html, url);
        fields.insert("detail_url".to_string(), Value::String(url.to_string()));
        Ok(Value::Object(fields))
    }
}
