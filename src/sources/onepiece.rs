//! One Piece Card Game scraper.
//!
//! The official card list renders every card of a series on one listing
//! page; detail pages describe a card as label/value pairs.

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

use super::{number_prefix, source_config};

const DEFAULT_BASE_URL: &str = "https://en.onepiece-cardgame.com";
const LISTING_URL: &str = "{base}/cardlist/?series={set}";
const CARD_LINK: &str = "a.card-detail-link, .resultCol a[href*='/cards/']";

const NAME: &[&str] = &["name"];
const TYPE: &[&str] = &["card_type"];
const TEXT: &[&str] = &["effect"];
const TRIGGER: &[&str] = &["trigger"];
const SET: &[&str] = &["set"];
const NUMBER: &[&str] = &["number"];
const RARITY: &[&str] = &["rarity"];
const IMAGE: &[&str] = &["image"];
const FINISH: &[&str] = &["finish"];

const CARD_DETAILS: &[(&str, &[&str])] = &[
    ("cost", &["cost"]),
    ("power", &["power"]),
    ("counter", &["counter"]),
    ("color", &["color"]),
    ("attribute", &["attribute"]),
    ("feature", &["feature"]),
];

const PRINTING_DETAILS: &[(&str, &[&str])] = &[("detail_url", &["detail_url"])];

pub struct OnePieceSource {
    config: SourceConfig,
    catalog: Catalog,
    fetcher: PageFetcher,
    listing: ListingSelectors,
    detail: DetailExtractor,
}

impl OnePieceSource {
    pub fn new(catalog: Catalog, config: &ImporterConfig) -> Result<Self> {
        let source = source_config(
            config,
            "onepiece",
            "One Piece Card Game",
            "One Piece Card Game",
            DEFAULT_BASE_URL,
            PrintingMatch::SetAndNumber,
        );

        let listing = ListingSelectors::new(&source.base_url, CARD_LINK, None)?;
        let detail = DetailExtractor::new(&source.base_url)?
            .field("name", &[".cardName", "h1.card-name"], &["Card Name", "Name"])?
            .field("number", &[".cardNumber", ".card-number"], &["Card Number", "Number"])?
            .field("rarity", &[".rarity"], &["Rarity"])?
            .field("card_type", &[".cardType", ".card-type"], &["Card Type", "Category", "Type"])?
            .field("effect", &[".text", ".card-effect"], &["Effect", "Text"])?
            .field("trigger", &[".trigger"], &["Trigger"])?
            .field("set", &[".getInfo", ".card-set"], &["Card Set(s)", "Set", "Series"])?
            .field("cost", &[".cost"], &["Cost", "Life"])?
            .field("power", &[".power"], &["Power"])?
            .field("counter", &[".counter"], &["Counter"])?
            .field("color", &[".color"], &["Color"])?
            .field("attribute", &[".attribute"], &["Attribute"])?
            .field("feature", &[".feature"], &["Type(s)", "Feature"])?
            .field("finish", &[".finish"], &["Finish", "Foil"])?
            .url_field("image", &[".frontCol img", "img.card-image"], &["data-src", "src"])?;

        Ok(Self {
            config: source,
            catalog,
            fetcher: PageFetcher::new(&config.http)?,
            listing,
            detail,
        })
    }

    /// Set code from a label such as `-ROMANCE DAWN- [OP01]`, falling back
    /// to the number prefix (`OP01-001` → `OP01`).
    fn set_code(raw: &Value, number: &str) -> Option<String> {
        let from_label = fields::text(raw, SET).and_then(|label| {
            let (_, rest) = label.rsplit_once('[')?;
            let (code, _) = rest.split_once(']')?;
            Some(code.trim().to_string()).filter(|code| !code.is_empty())
        });
        from_label
            .or_else(|| number_prefix(number).map(str::to_string))
            .or_else(|| fields::text(raw, SET))
            .map(|code| fields::set_code(&code))
    }

    fn description(raw: &Value) -> Option<String> {
        let effect = fields::text(raw, TEXT);
        match fields::text(raw, TRIGGER) {
            Some(trigger) => Some(match effect {
                Some(effect) => format!("{effect}\n[Trigger] {trigger}"),
                None => format!("[Trigger] {trigger}"),
            }),
            None => effect,
        }
    }
}

#[async_trait]
impl CardSource for OnePieceSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn normalize(&self, raw: &Value) -> std::result::Result<Vec<CardRecord>, RecordError> {
        let name = fields::required_text(raw, "name", NAME)?;
        let number = fields::collector_number(fields::text(raw, NUMBER))?;
        let set_code = Self::set_code(raw, &number).ok_or(RecordError::MissingField("set"))?;

        Ok(vec![CardRecord {
            game: self.config.game.clone(),
            name,
            card_type: fields::text(raw, TYPE).unwrap_or_else(|| UNKNOWN_CARD_TYPE.to_string()),
            description: Self::description(raw),
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

impl ScrapedSource for OnePieceSource {
    fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    fn listing_url(&self, set_code: &str) -> String {
        self.build_url(LISTING_URL, set_code)
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
