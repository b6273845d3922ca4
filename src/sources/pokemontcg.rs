//! Pokémon TCG API source.
//!
//! The API pages by number rather than cursor. A card's finishes are the
//! price variants TCGplayer lists for it (`normal`, `holofoil`,
//! `reverseHolofoil`, ...), and every distinct finish becomes its own
//! printing, so printings here match on set, number and style.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

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

const DEFAULT_BASE_URL: &str = "https://api.pokemontcg.io";
const CARDS_URL: &str = "{base}/v2/cards?q=set.id%3A{set}&page=1&pageSize=250&orderBy=number";

const NAME: &[&str] = &["name"];
const SUPERTYPE: &[&str] = &["supertype", "card_type", "type"];
const SUBTYPES: &[&str] = &["subtypes"];
const RULES: &[&str] = &["rules", "rules_text", "text"];
const SET: &[&str] = &["set.id", "set_id", "set_code", "set"];
const NUMBER: &[&str] = &["number", "collector_number"];
const RARITY: &[&str] = &["rarity"];
const IMAGE: &[&str] = &["images.large", "images.small", "image_url"];
const FINISHES: &[&str] = &["finishes", "finish", "variants"];

const CARD_DETAILS: &[(&str, &[&str])] = &[
    ("hp", &["hp"]),
    ("types", &["types"]),
    ("subtypes", &["subtypes"]),
    ("evolves_from", &["evolvesFrom", "evolves_from"]),
    ("retreat_cost", &["convertedRetreatCost", "retreat_cost"]),
];

const PRINTING_DETAILS: &[(&str, &[&str])] = &[
    ("pokemontcg_id", &["id"]),
    ("artist", &["artist"]),
    ("national_pokedex_numbers", &["nationalPokedexNumbers"]),
];

pub struct PokemonTcgSource {
    config: SourceConfig,
    catalog: Catalog,
    fetcher: PageFetcher,
}

impl PokemonTcgSource {
    pub fn new(catalog: Catalog, config: &ImporterConfig) -> Result<Self> {
        let fetcher = match config.pokemontcg_api_key.as_deref() {
            Some(key) => PageFetcher::with_headers(&config.http, &[("X-Api-Key", key)])?,
            None => PageFetcher::new(&config.http)?,
        };

        Ok(Self {
            config: source_config(
                config,
                "pokemontcg",
                "Pokémon TCG API",
                "Pokémon TCG",
                DEFAULT_BASE_URL,
                PrintingMatch::SetNumberAndStyle,
            ),
            catalog,
            fetcher,
        })
    }

    fn card_type(raw: &Value) -> String {
        let supertype = fields::text(raw, SUPERTYPE);
        let subtypes = fields::list(raw, SUBTYPES);
        match (supertype, subtypes.is_empty()) {
            (Some(supertype), false) => format!("{} - {}", supertype, subtypes.join(" ")),
            (Some(supertype), true) => supertype,
            (None, _) => UNKNOWN_CARD_TYPE.to_string(),
        }
    }

    fn description(raw: &Value) -> Option<String> {
        let named = |key: &str, render: fn(&Value) -> Option<String>| -> Vec<Option<String>> {
            raw.get(key)
                .and_then(Value::as_array)
                .map(|items| items.iter().map(render).collect())
                .unwrap_or_default()
        };

        let mut parts = vec![fields::text(raw, RULES)];
        parts.extend(named("abilities", |ability| {
            let name = fields::text(ability, &["name"])?;
            let text = fields::text(ability, &["text"]).unwrap_or_default();
            Some(format!("{name}: {text}"))
        }));
        parts.extend(named("attacks", |attack| {
            let name = fields::text(attack, &["name"])?;
            let damage = fields::text(attack, &["damage"])
                .map(|d| format!(" ({d})"))
                .unwrap_or_default();
            let text = fields::text(attack, &["text"])
                .map(|t| format!(": {t}"))
                .unwrap_or_default();
            Some(format!("{name}{damage}{text}"))
        }));
        join_text(parts)
    }

    /// Finish names grouped by the style they normalize to.
    fn finishes_by_style(raw: &Value) -> BTreeMap<Style, Vec<String>> {
        let mut finishes: Vec<String> = raw
            .pointer("/tcgplayer/prices")
            .and_then(Value::as_object)
            .map(|prices| prices.keys().cloned().collect())
            .unwrap_or_default();
        if finishes.is_empty() {
            finishes = fields::list(raw, FINISHES);
        }

        let mut grouped: BTreeMap<Style, Vec<String>> = BTreeMap::new();
        for finish in finishes {
            let style = fields::style_from_finishes([&finish]);
            grouped.entry(style).or_default().push(finish);
        }
        if grouped.is_empty() {
            grouped.insert(Style::Standard, Vec::new());
        }
        grouped
    }
}

#[async_trait]
impl CardSource for PokemonTcgSource {
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
        let card_type = Self::card_type(raw);
        let description = Self::description(raw);
        let card_details = fields::collect_details(raw, CARD_DETAILS)?;
        let rarity = fields::text(raw, RARITY);
        let image_url = fields::text(raw, IMAGE);

        let mut records = Vec::new();
        for (style, finishes) in Self::finishes_by_style(raw) {
            let mut details = Map::new();
            for (key, candidates) in PRINTING_DETAILS {
                if let Some(value) = fields::lookup(raw, candidates) {
                    details.insert((*key).to_string(), value.clone());
                }
            }
            if !finishes.is_empty() {
                details.insert("finishes".to_string(), Value::from(finishes));
            }

            records.push(CardRecord {
                game: self.config.game.clone(),
                name: name.clone(),
                card_type: card_type.clone(),
                description: description.clone(),
                card_details: card_details.clone(),
                set_code: set_code.clone(),
                number: number.clone(),
                rarity: rarity.clone(),
                style,
                image_url: image_url.clone(),
                printing_details: fields::details_json(details)?,
            });
        }
        Ok(records)
    }

    async fn import_from_remote(
        &self,
        options: &ImportOptions,
        cancel: &CancellationToken,
    ) -> Result<ImportSummary> {
        importer::import_paged(self, options, cancel).await
    }
}

impl PagedSource for PokemonTcgSource {
    fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    fn first_page_url(&self, set_code: &str) -> String {
        self.build_url(CARDS_URL, &set_code.to_lowercase())
    }

    fn page_records(&self, page: &Value, _set_code: &str) -> Vec<Value> {
        array_items(page, &["data"])
    }

    fn next_page_url(&self, page: &Value, current_url: &str) -> Option<String> {
        let number = |key: &str| page.get(key).and_then(Value::as_u64);
        let (current, size, total) = (number("page")?, number("pageSize")?, number("totalCount")?);
        if current * size >= total {
            return None;
        }
        Some(current_url.replace(
            &format!("page={current}&"),
            &format!("page={}&", current + 1),
        ))
    }
}
