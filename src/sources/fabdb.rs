//! FaB DB (Flesh and Blood) JSON API source.
//!
//! A card carries a `printings` array covering every set it appeared in; each
//! printing is identified by a code such as `WTR001` and a foiling letter.
//! The API filters by set loosely, so page records are trimmed to the
//! printings of the requested set before they reach the import loop.

use async_trait::async_trait;
use serde_json::{Map, Value};

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

const DEFAULT_BASE_URL: &str = "https://api.fabdb.net";
const CARDS_URL: &str = "{base}/cards?set={set}&per_page=100";

const NAME: &[&str] = &["name"];
const PITCH: &[&str] = &["pitch", "stats.resource"];
const TYPE: &[&str] = &["type_text", "keywords", "types", "type"];
const TEXT: &[&str] = &["text", "functional_text", "rules_text"];
const IDENTIFIER: &[&str] = &["identifier", "sku.sku", "id"];
const SET: &[&str] = &["set", "set.id", "set_code"];
const NUMBER: &[&str] = &["number", "collector_number"];
const RARITY: &[&str] = &["rarity", "rarity_name"];
const FOILING: &[&str] = &["foiling", "finish"];
const IMAGE: &[&str] = &["image", "image_url"];

const CARD_DETAILS: &[(&str, &[&str])] = &[
    ("pitch", &["pitch", "stats.resource"]),
    ("cost", &["cost", "stats.cost"]),
    ("power", &["power", "stats.attack"]),
    ("defense", &["defense", "stats.defense"]),
    ("class", &["class"]),
    ("talent", &["talent"]),
];

const PRINTING_DETAILS: &[(&str, &[&str])] = &[
    ("identifier", &["identifier", "sku.sku"]),
    ("foiling", &["foiling"]),
    ("edition", &["edition"]),
    ("artist", &["artist", "illustrator"]),
];

pub struct FabDbSource {
    config: SourceConfig,
    catalog: Catalog,
    fetcher: PageFetcher,
}

impl FabDbSource {
    pub fn new(catalog: Catalog, config: &ImporterConfig) -> Result<Self> {
        Ok(Self {
            config: source_config(
                config,
                "fabdb",
                "FaB DB",
                "Flesh and Blood",
                DEFAULT_BASE_URL,
                PrintingMatch::SetNumberAndStyle,
            ),
            catalog,
            fetcher: PageFetcher::new(&config.http)?,
        })
    }

    /// Pitched variants share a name, so the pitch colour is appended.
    fn full_name(raw: &Value) -> std::result::Result<String, RecordError> {
        let name = fields::required_text(raw, "name", NAME)?;
        let colour = match fields::text(raw, PITCH).as_deref() {
            Some("1") => Some("Red"),
            Some("2") => Some("Yellow"),
            Some("3") => Some("Blue"),
            _ => None,
        };
        Ok(match colour {
            Some(colour) if !name.ends_with(')') => format!("{name} ({colour})"),
            _ => name,
        })
    }

    /// Expand the foiling letter into a finish name.
    fn finish(printing: &Value) -> Option<String> {
        let foiling = fields::text(printing, FOILING)?;
        Some(match foiling.to_uppercase().as_str() {
            "S" => "Standard".to_string(),
            "R" => "Rainbow Foil".to_string(),
            "C" => "Cold Foil".to_string(),
            "G" => "Gold Cold Foil".to_string(),
            _ => foiling,
        })
    }

    /// Split an identifier such as `WTR001` or `1HP367` into set and number.
    fn split_identifier(identifier: &str) -> Option<(String, String)> {
        let identifier = identifier.trim();
        let split = identifier.rfind(|c: char| !c.is_ascii_digit())? + 1;
        let (set, number) = identifier.split_at(split);
        if set.is_empty() || number.is_empty() {
            return None;
        }
        Some((fields::set_code(set), number.to_string()))
    }

    /// Set and number of one printing, from explicit fields or its identifier.
    fn locate(printing: &Value) -> std::result::Result<(String, String), RecordError> {
        let from_identifier = fields::text(printing, IDENTIFIER)
            .as_deref()
            .and_then(Self::split_identifier);

        let set_code = fields::text(printing, SET)
            .map(|set| fields::set_code(&set))
            .or_else(|| from_identifier.as_ref().map(|(set, _)| set.clone()))
            .ok_or(RecordError::MissingField("set"))?;
        let number = fields::collector_number(
            fields::text(printing, NUMBER).or(from_identifier.map(|(_, number)| number)),
        )?;
        Ok((set_code, number))
    }

    fn printing_set(printing: &Value) -> Option<String> {
        Self::locate(printing).ok().map(|(set, _)| set)
    }

    fn printings(raw: &Value) -> Option<&Vec<Value>> {
        raw.get("printings").and_then(Value::as_array)
    }
}

#[async_trait]
impl CardSource for FabDbSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn normalize(&self, raw: &Value) -> std::result::Result<Vec<CardRecord>, RecordError> {
        let name = Self::full_name(raw)?;
        let card_type = fields::text(raw, TYPE)
            .map(|t| t.replace('\n', " "))
            .unwrap_or_else(|| UNKNOWN_CARD_TYPE.to_string());
        let description = fields::text(raw, TEXT);
        let card_details = fields::collect_details(raw, CARD_DETAILS)?;

        // Flat exports describe a single printing on the card itself.
        let flat = [raw.clone()];
        let printings: &[Value] = match Self::printings(raw) {
            Some(printings) if !printings.is_empty() => printings,
            _ => &flat,
        };

        let mut records = Vec::with_capacity(printings.len());
        for printing in printings {
            let (set_code, number) = Self::locate(printing)?;
            let finish = Self::finish(printing);

            let mut details = Map::new();
            for (key, candidates) in PRINTING_DETAILS {
                if let Some(value) = fields::lookup(printing, candidates) {
                    details.insert((*key).to_string(), value.clone());
                }
            }
            if let Some(finish) = &finish {
                details.insert("finish".to_string(), Value::String(finish.clone()));
            }

            records.push(CardRecord {
                game: self.config.game.clone(),
                name: name.clone(),
                card_type: card_type.clone(),
                description: description.clone(),
                card_details: card_details.clone(),
                set_code,
                number,
                rarity: fields::text(printing, RARITY).or_else(|| fields::text(raw, RARITY)),
                style: fields::style_from_finishes(finish),
                image_url: fields::text(printing, IMAGE).or_else(|| fields::text(raw, IMAGE)),
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

impl PagedSource for FabDbSource {
    fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    fn first_page_url(&self, set_code: &str) -> String {
        self.build_url(CARDS_URL, set_code)
    }

    fn page_records(&self, page: &Value, set_code: &str) -> Vec<Value> {
        array_items(page, &["data", "cards"])
            .into_iter()
            .filter_map(|mut card| {
                let Some(printings) = card.get_mut("printings").and_then(Value::as_array_mut)
                else {
                    return Some(card);
                };
                printings.retain(|p| Self::printing_set(p).as_deref() == Some(set_code));
                if printings.is_empty() { None } else { Some(card) }
            })
            .collect()
    }

    fn next_page_url(&self, page: &Value, current_url: &str) -> Option<String> {
        let cursor = fields::text(page, &["meta.next_cursor", "links.next_cursor"])?;
        let base = current_url
            .split_once("&cursor=")
            .map_or(current_url, |(base, _)| base);
        Some(format!("{}&cursor={}", base, urlencoding::encode(&cursor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_split_into_set_and_number() {
        assert_eq!(
            FabDbSource::split_identifier("wtr001"),
            Some(("WTR".to_string(), "001".to_string()))
        );
        assert_eq!(
            FabDbSource::split_identifier("1HP367"),
            Some(("1HP".to_string(), "367".to_string()))
        );
        assert_eq!(FabDbSource::split_identifier("001"), None);
        assert_eq!(FabDbSource::split_identifier("WTR"), None);
    }
}
