//! Digimon Card Game scraper.
//!
//! Card numbers carry their set (`BT1-084`), so the set code is taken from
//! the number prefix when the page does not state one.

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

use super::{join_text, number_prefix, source_config};

const DEFAULT_BASE_URL: &str = "https://world.digimoncard.com";
const LISTING_URL: &str = "{base}/cardlist/?search=true&category={set}";
const CARD_LINK: &str = "a.card-link, .card_list a[href*='card']";
const NEXT_PAGE: &str = "a[rel=next], .pager a.next";

const NAME: &[&str] = &["name"];
const TYPE: &[&str] = &["card_type"];
const EFFECT: &[&str] = &["effect"];
const INHERITED: &[&str] = &["inherited_effect"];
const SECURITY: &[&str] = &["security_effect"];
const SET: &[&str] = &["set"];
const NUMBER: &[&str] = &["number"];
const RARITY: &[&str] = &["rarity"];
const IMAGE: &[&str] = &["image"];
const FINISH: &[&str] = &["finish"];

const CARD_DETAILS: &[(&str, &[&str])] = &[
    ("level", &["level"]),
    ("color", &["color"]),
    ("play_cost", &["play_cost"]),
    ("dp", &["dp"]),
    ("form", &["form"]),
    ("attribute", &["attribute"]),
    ("digimon_type", &["digimon_type"]),
];

const PRINTING_DETAILS: &[(&str, &[&str])] = &[("detail_url", &["detail_url"])];

pub struct DigimonSource {
    config: SourceConfig,
    catalog: Catalog,
    fetcher: PageFetcher,
    listing: ListingSelectors,
    detail: DetailExtractor,
}

impl DigimonSource {
    pub fn new(catalog: Catalog, config: &ImporterConfig) -> Result<Self> {
        let source = source_config(
            config,
            "digimon",
            "Digimon Card Game",
            "Digimon Card Game",
            DEFAULT_BASE_URL,
            PrintingMatch::SetAndNumber,
        );

        let listing = ListingSelectors::new(&source.base_url, CARD_LINK, Some(NEXT_PAGE))?;
        let detail = DetailExtractor::new(&source.base_url)?
            .field("name", &[".card_name", "h1.card-name"], &["Name", "Card Name"])?
            .field("number", &[".cardno", ".card-number"], &["Card Number", "Number"])?
            .field("rarity", &[".cardrarity", ".rarity"], &["Rarity"])?
            .field("card_type", &[".cardtype", ".card-type"], &["Card Type", "Category"])?
            .field("effect", &[".cardEffect", ".effect"], &["Effect"])?
            .field("inherited_effect", &[".inheritedEffect"], &["Inherited Effect", "Digivolve Source Effect"])?
            .field("security_effect", &[".securityEffect"], &["Security Effect"])?
            .field("set", &[".cardSet"], &["Set", "Notes"])?
            .field("level", &[".cardlv"], &["Lv.", "Level"])?
            .field("color", &[".cardColor"], &["Color"])?
            .field("play_cost", &[], &["Play Cost", "Cost"])?
            .field("dp", &[], &["DP"])?
            .field("form", &[], &["Form"])?
            .field("attribute", &[], &["Attribute"])?
            .field("digimon_type", &[], &["Type"])?
            .field("finish", &[".finish"], &["Finish", "Parallel"])?
            .url_field("image", &[".card_img img", "img.card-image"], &["data-src", "src"])?;

        Ok(Self {
            config: source,
            catalog,
            fetcher: PageFetcher::new(&config.http)?,
            listing,
            detail,
        })
    }

    fn description(raw: &Value) -> Option<String> {
        join_text([
            fields::text(raw, EFFECT),
            fields::text(raw, INHERITED).map(|text| format!("[Inherited] {text}")),
            fields::text(raw, SECURITY).map(|text| format!("[Security] {text}")),
        ])
    }
}

#[async_trait]
impl CardSource for DigimonSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn normalize(&self, raw: &Value) -> std::result::Result<Vec<CardRecord>, RecordError> {
        let name = fields::required_text(raw, "name", NAME)?;
        let number = fields::collector_number(fields::text(raw, NUMBER))?;
        let set_code = number_prefix(&number)
            .map(str::to_string)
            .or_else(|| fields::text(raw, SET))
            .map(|code| fields::set_code(&code))
            .ok_or(RecordError::MissingField("set"))?;

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

impl ScrapedSource for DigimonSource {
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
