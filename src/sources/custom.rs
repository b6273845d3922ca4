//! Generic file-only source for hand-maintained card lists.
//!
//! Records name their own game, so one upload may span several games.
//! Free-form attributes travel in optional `details` and `printing_details`
//! objects and are stored as-is.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::cancel::CancellationToken;
use crate::database::Catalog;
use crate::error::{ImportError, RecordError, Result};
use crate::fields;
use crate::models::{
    CardRecord, ImportOptions, ImportSummary, PrintingMatch, Style, UNKNOWN_CARD_TYPE,
};
use crate::traits::{CardSource, SourceConfig};

const GAME: &[&str] = &["game", "Game"];
const NAME: &[&str] = &["name", "Name", "card_name"];
const TYPE: &[&str] = &["card_type", "type", "Type"];
const TEXT: &[&str] = &["description", "text", "rules_text"];
const SET: &[&str] = &["set_code", "set", "Set"];
const NUMBER: &[&str] = &["number", "collector_number", "Number"];
const RARITY: &[&str] = &["rarity", "Rarity"];
const IMAGE: &[&str] = &["image_url", "image", "Image"];
const FINISHES: &[&str] = &["finishes", "finish", "style"];

pub struct CustomSource {
    config: SourceConfig,
    catalog: Catalog,
}

impl CustomSource {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            config: SourceConfig {
                key: "custom".to_string(),
                name: "Custom upload".to_string(),
                game: String::new(),
                base_url: String::new(),
                printing_match: PrintingMatch::SetNumberAndStyle,
                requires_set_code: false,
                request_delay: Duration::ZERO,
            },
            catalog,
        }
    }

    /// A `foil` column counts when it holds `true`, `yes`, `1`, `y` or a
    /// foil finish name.
    fn foil_flag(raw: &Value) -> bool {
        match fields::lookup(raw, &["foil", "Foil", "is_foil"]) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
            Some(Value::String(s)) => {
                let s = s.trim().to_lowercase();
                matches!(s.as_str(), "true" | "yes" | "y" | "1") || fields::is_foil_indicator(&s)
            }
            _ => false,
        }
    }

    /// An embedded details object, or a JSON string holding one.
    fn embedded_details(raw: &Value, key: &str) -> std::result::Result<Option<String>, RecordError> {
        match raw.get(key) {
            Some(Value::Object(map)) => fields::details_json(map.clone()),
            Some(Value::String(s)) if !s.trim().is_empty() => {
                let parsed: Map<String, Value> =
                    serde_json::from_str(s).map_err(|e| RecordError::InvalidValue {
                        field: "details",
                        message: e.to_string(),
                    })?;
                fields::details_json(parsed)
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl CardSource for CustomSource {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn normalize(&self, raw: &Value) -> std::result::Result<Vec<CardRecord>, RecordError> {
        let game = fields::required_text(raw, "game", GAME)?;
        let name = fields::required_text(raw, "name", NAME)?;
        let set_code = fields::set_code(&fields::required_text(raw, "set", SET)?);
        let number = fields::collector_number(fields::text(raw, NUMBER))?;

        let style = if Self::foil_flag(raw) {
            Style::Foil
        } else {
            fields::style_from_finishes(fields::list(raw, FINISHES))
        };

        Ok(vec![CardRecord {
            game,
            name,
            card_type: fields::text(raw, TYPE).unwrap_or_else(|| UNKNOWN_CARD_TYPE.to_string()),
            description: fields::text(raw, TEXT),
            card_details: Self::embedded_details(raw, "details")?,
            set_code,
            number,
            rarity: fields::text(raw, RARITY),
            style,
            image_url: fields::text(raw, IMAGE),
            printing_details: Self::embedded_details(raw, "printing_details")?,
        }])
    }

    async fn import_from_remote(
        &self,
        _options: &ImportOptions,
        _cancel: &CancellationToken,
    ) -> Result<ImportSummary> {
        Err(ImportError::RemoteUnsupported(self.config.key.clone()))
    }
}
