//! SWU-DB (Star Wars: Unlimited) JSON API source.
//!
//! A set is served as a single page. Hyperspace, showcase and foil variants
//! share the base card's number, so printings match on style as well.

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

use super::{array_items, join_text, source_config};

const DEFAULT_BASE_URL: &str = "https://api.swu-db.com";
const SET_URL: &str = "{base}/cards/{set}?format=json&order=setnumber";

const NAME: &[&str] = &["Name", "name"];
const SUBTITLE: &[&str] = &["Subtitle", "subtitle"];
const TYPE: &[&str] = &["Type", "type", "card_type"];
const FRONT_TEXT: &[&str] = &["FrontText", "front_text", "text"];
const EPIC_ACTION: &[&str] = &["EpicAction", "epic_action"];
const BACK_TEXT: &[&str] = &["BackText", "back_text"];
const SET: &[&str] = &["Set", "set", "set_code"];
const NUMBER: &[&str] = &["Number", "number", "collector_number"];
const RARITY: &[&str] = &["Rarity", "rarity"];
const IMAGE: &[&str] = &["FrontArt", "front_art", "image_url"];
const VARIANT: &[&str] = &["VariantType", "variant_type", "finish", "finishes"];

const CARD_DETAILS: &[(&str, &[&str])] = &[
    ("cost", &["Cost", "cost"]),
    ("power", &["Power", "power"]),
    ("hp", &["HP", "hp"]),
    ("aspects", &["Aspects", "aspects"]),
    ("traits", &["Traits", "traits"]),
    ("arenas", &["Arenas", "arenas"]),
    ("keywords", &["Keywords", "keywords"]),
    ("unique", &["Unique", "unique"]),
];

const PRINTING_DETAILS: &[(&str, &[&str])] = &[
    ("variant_type", &["VariantType", "variant_type"]),
    ("artist", &["Artist", "artist"]),
];

pub struct SwuDbSource {
    config: SourceConfig,
    catalog: Catalog,
    fetcher: PageFetcher,
}

impl SwuDbSource {
    pub fn new(catalog: Catalog, config: &ImporterConfig) -> Result<Self> {
        Ok(Self {
            config: source_config(
                config,
                "swudb",
                "SWU-DB",
                "Star Wars: Unlimited",
                DEFAULT_BASE_URL,
                PrintingMatch::SetNumberAndStyle,
            ),
            catalog,
            fetcher: PageFetcher::new(&config.http)?,
        })
    }

    fn style(raw: &Value) -> Style {
        let foil_flag = ["Foil", "foil"]
            .iter()
            .any(|key| raw.get(*key).and_then(Value::as_bool) == Some(true));
        if foil_flag {
            Style::Foil
        } else {
            fields::style_from_finishes(fields::list(raw, VARIANT))
        }
    }
}

#[async_trait]
impl CardSource for SwuDbSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn normalize(&self, raw: &Value) -> std::result::Result<Vec<CardRecord>, RecordError> {
        let name = fields::required_text(raw, "name", NAME)?;
        let name = match fields::text(raw, SUBTITLE) {
            Some(subtitle) => format!("{name} - {subtitle}"),
            None => name,
        };
        let set_code = fields::set_code(&fields::required_text(raw, "set", SET)?);
        let number = fields::collector_number(fields::text(raw, NUMBER))?;

        Ok(vec![CardRecord {
            game: self.config.game.clone(),
            name,
            card_type: fields::text(raw, TYPE).unwrap_or_else(|| UNKNOWN_CARD_TYPE.to_string()),
            description: join_text([
                fields::text(raw, FRONT_TEXT),
                fields::text(raw, EPIC_ACTION),
                fields::text(raw, BACK_TEXT),
            ]),
            card_details: fields::collect_details(raw, CARD_DETAILS)?,
            set_code,
            number,
            rarity: fields::text(raw, RARITY),
            style: Self::style(raw),
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

impl PagedSource for SwuDbSource {
    fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    fn first_page_url(&self, set_code: &str) -> String {
        self.build_url(SET_URL, &set_code.to_lowercase())
    }

    fn page_records(&self, page: &Value, _set_code: &str) -> Vec<Value> {
        array_items(page, &["data"])
    }

    fn next_page_url(&self, _page: &Value, _current_url: &str) -> Option<String> {
        None
    }
}
