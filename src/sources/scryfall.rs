//! Scryfall (Magic: The Gathering) JSON API source

use async_trait::async_trait;
use serde_json::Value;

use crate::cancel::CancellationToken;
use crate::config::ImporterConfig;
use crate::database::Catalog;
use crate::error::{RecordError, Result};
use crate::fields;
use crate::importer;
use crate::models::{CardRecord, ImportOptions, ImportSummary, PrintingMatch, UNKNOWN_CARD_TYPE};
use crate::scraper::PageFetcher;
use crate::traits::{CardSource, PagedSource, SourceConfig};

use super::{array_items, source_config};

const DEFAULT_BASE_URL: &str = "https://api.scryfall.com";
const SEARCH_URL: &str = "{base}/cards/search?q=e%3A{set}&unique=prints&order=set";

const NAME: &[&str] = &["name", "card_name"];
const TYPE: &[&str] = &["type_line", "type", "card_type", "card_faces.0.type_line"];
const TEXT: &[&str] = &["oracle_text", "rules_text", "text"];
const SET: &[&str] = &["set", "set_code", "setCode"];
const NUMBER: &[&str] = &["collector_number", "number", "collectorNumber"];
const RARITY: &[&str] = &["rarity"];
const FINISHES: &[&str] = &["finishes", "finish"];
const IMAGE: &[&str] = &[
    "image_uris.normal",
    "image_uris.large",
    "card_faces.0.image_uris.normal",
    "image_url",
    "image",
];

const CARD_DETAILS: &[(&str, &[&str])] = &[
    ("mana_cost", &["mana_cost"]),
    ("cmc", &["cmc", "mana_value"]),
    ("colors", &["colors"]),
    ("power", &["power"]),
    ("toughness", &["toughness"]),
    ("loyalty", &["loyalty"]),
    ("keywords", &["keywords"]),
];

const PRINTING_DETAILS: &[(&str, &[&str])] = &[
    ("scryfall_id", &["id"]),
    ("artist", &["artist"]),
    ("lang", &["lang"]),
    ("frame", &["frame"]),
    ("border_color", &["border_color"]),
];

pub struct ScryfallSource {
    config: SourceConfig,
    catalog: Catalog,
    fetcher: PageFetcher,
}

impl ScryfallSource {
    pub fn new(catalog: Catalog, config: &ImporterConfig) -> Result<Self> {
        Ok(Self {
            config: source_config(
                config,
                "scryfall",
                "Scryfall",
                "Magic: The Gathering",
                DEFAULT_BASE_URL,
                PrintingMatch::SetAndNumber,
            ),
            catalog,
            fetcher: PageFetcher::new(&config.http)?,
        })
    }

    /// Oracle text, joining the faces of multi-faced cards.
    fn rules_text(raw: &Value) -> Option<String> {
        fields::text(raw, TEXT).or_else(|| {
            let faces = raw.get("card_faces")?.as_array()?;
            let texts: Vec<String> = faces
                .iter()
                .filter_map(|face| fields::text(face, &["oracle_text"]))
                .collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join("\n//\n"))
            }
        })
    }

    fn finishes(raw: &Value) -> Vec<String> {
        let finishes = fields::list(raw, FINISHES);
        if finishes.is_empty() && raw.get("foil").and_then(Value::as_bool) == Some(true) {
            return vec!["foil".to_string()];
        }
        finishes
    }
}

#[async_trait]
impl CardSource for ScryfallSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn normalize(&self, raw: &Value) -> std::result::Result<Vec<CardRecord>, RecordError> {
        let name = fields::required_text(raw, "name", NAME)?;
        let set_code = fields::set_code(&fields::required_text(raw, "set", SET)?);
        let number = fields::collector_number(fields::text(raw, NUMBER))?;

        Ok(vec![CardRecord {
            game: self.config.game.clone(),
            name,
            card_type: fields::text(raw, TYPE).unwrap_or_else(|| UNKNOWN_CARD_TYPE.to_string()),
            description: Self::rules_text(raw),
            card_details: fields::collect_details(raw, CARD_DETAILS)?,
            set_code,
            number,
            rarity: fields::text(raw, RARITY),
            style: fields::style_from_finishes(Self::finishes(raw)),
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

impl PagedSource for ScryfallSource {
    fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    fn first_page_url(&self, set_code: &str) -> String {
        self.build_url(SEARCH_URL, &set_code.to_lowercase())
    }

    fn page_records(&self, page: &Value, _set_code: &str) -> Vec<Value> {
        array_items(page, &["data"])
    }

    fn next_page_url(&self, page: &Value, _current_url: &str) -> Option<String> {
        if page.get("has_more").and_then(Value::as_bool) != Some(true) {
            return None;
        }
        fields::text(page, &["next_page"])
    }
}
