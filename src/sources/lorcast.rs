//! Lorcast (Disney Lorcana) JSON API source

use async_trait::async_trait;
use serde_json::Value;

use crate::cancel::CancellationToken;
use crate::config::ImporterConfig;
use crate::database::Catalog;
use crate::error::{RecordError, Result};
use crate::fields;
use crate::importer;
use crate::models::{
    CardRecord, ImportOptions, ImportSummary, PrintingMatch, Style, UNKNOWN_CARD_TYPE,
};
use crate::scraper::PageFetcher;
use crate::traits::{CardSource, PagedSource, SourceConfig};

use super::{array_items, source_config};

const DEFAULT_BASE_URL: &str = "https://api.lorcast.com";
const SEARCH_URL: &str = "{base}/v0/cards/search?q=set%3A{set}";

const NAME: &[&str] = &["name", "card_name"];
const VERSION: &[&str] = &["version", "subtitle"];
const TYPE: &[&str] = &["type", "card_type", "types"];
const TEXT: &[&str] = &["text", "rules_text", "body_text"];
const SET: &[&str] = &["set.code", "set_code", "set"];
const NUMBER: &[&str] = &["collector_number", "number"];
const RARITY: &[&str] = &["rarity"];
const IMAGE: &[&str] = &[
    "image_uris.digital.large",
    "image_uris.digital.normal",
    "image_url",
];
const FINISHES: &[&str] = &["finishes", "foil_types", "finish"];

/// Enchanted cards only exist as foils.
const FOIL_ONLY_RARITIES: &[&str] = &["enchanted", "epic", "iconic"];

const CARD_DETAILS: &[(&str, &[&str])] = &[
    ("cost", &["cost"]),
    ("inkwell", &["inkwell"]),
    ("ink", &["ink"]),
    ("strength", &["strength"]),
    ("willpower", &["willpower"]),
    ("lore", &["lore"]),
    ("move_cost", &["move_cost"]),
    ("classifications", &["classifications"]),
    ("keywords", &["keywords"]),
];

const PRINTING_DETAILS: &[(&str, &[&str])] = &[
    ("lorcast_id", &["id"]),
    ("illustrators", &["illustrators"]),
    ("flavor_text", &["flavor_text"]),
];

pub struct LorcastSource {
    config: SourceConfig,
    catalog: Catalog,
    fetcher: PageFetcher,
}

impl LorcastSource {
    pub fn new(catalog: Catalog, config: &ImporterConfig) -> Result<Self> {
        Ok(Self {
            config: source_config(
                config,
                "lorcast",
                "Lorcast",
                "Disney Lorcana",
                DEFAULT_BASE_URL,
                PrintingMatch::SetAndNumber,
            ),
            catalog,
            fetcher: PageFetcher::new(&config.http)?,
        })
    }

    /// Lorcana names a card by character plus version ("Elsa - Snow Queen").
    fn full_name(raw: &Value) -> std::result::Result<String, RecordError> {
        let name = fields::required_text(raw, "name", NAME)?;
        Ok(match fields::text(raw, VERSION) {
            Some(version) if !name.contains(&version) => format!("{name} - {version}"),
            _ => name,
        })
    }

    fn style(raw: &Value, rarity: Option<&str>) -> Style {
        let foil_only = rarity.is_some_and(|r| FOIL_ONLY_RARITIES.contains(&r.to_lowercase().as_str()));
        if foil_only {
            Style::Foil
        } else {
            fields::style_from_finishes(fields::list(raw, FINISHES))
        }
    }
}

#[async_trait]
impl CardSource for LorcastSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn normalize(&self, raw: &Value) -> std::result::Result<Vec<CardRecord>, RecordError> {
        let name = Self::full_name(raw)?;
        let set_code = fields::set_code(&fields::required_text(raw, "set", SET)?);
        let number = fields::collector_number(fields::text(raw, NUMBER))?;
        let rarity = fields::text(raw, RARITY);
        let card_type = fields::list(raw, TYPE);

        Ok(vec![CardRecord {
            game: self.config.game.clone(),
            name,
            card_type: if card_type.is_empty() {
                UNKNOWN_CARD_TYPE.to_string()
            } else {
                card_type.join(" ")
            },
            description: fields::text(raw, TEXT),
            card_details: fields::collect_details(raw, CARD_DETAILS)?,
            set_code,
            number,
            style: Self::style(raw, rarity.as_deref()),
            rarity,
            image_url: fields::text(raw, IMAGE),
            printing_details: fields::collect_details(raw, PRINTING_DETAILS)?,
        }])
    }

    async fn import_from_remote(
        &self,
        options: &ImportOptions,
        cancel: &CancellationToken,
    ) -> Result<ImportSummary> {
        importer::import_paged(self, options, cancel).await
    }
}

impl PagedSource for LorcastSource {
    fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    fn first_page_url(&self, set_code: &str) -> String {
        self.build_url(SEARCH_URL, set_code)
    }

    fn page_records(&self, page: &Value, _set_code: &str) -> Vec<Value> {
        array_items(page, &["results", "data"])
    }

    fn next_page_url(&self, page: &Value, _current_url: &str) -> Option<String> {
        fields::text(page, &["next", "next_page"])
    }
}
