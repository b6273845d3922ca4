//! Built-in card sources

use std::sync::Arc;

use serde_json::Value;

use crate::config::ImporterConfig;
use crate::database::Catalog;
use crate::error::Result;
use crate::models::PrintingMatch;
use crate::traits::{CardSource, SourceConfig};

pub mod custom;
pub mod digimon;
pub mod fabdb;
pub mod lorcast;
pub mod onepiece;
pub mod pokemontcg;
pub mod riftbound;
pub mod scryfall;
pub mod swudb;

pub use custom::CustomSource;
pub use digimon::DigimonSource;
pub use fabdb::FabDbSource;
pub use lorcast::LorcastSource;
pub use onepiece::OnePieceSource;
pub use pokemontcg::PokemonTcgSource;
pub use riftbound::RiftboundSource;
pub use scryfall::ScryfallSource;
pub use swudb::SwuDbSource;

/// Every built-in source, ready for the registry.
pub fn default_sources(
    catalog: &Catalog,
    config: &ImporterConfig,
) -> Result<Vec<Arc<dyn CardSource>>> {
    Ok(vec![
        Arc::new(ScryfallSource::new(catalog.clone(), config)?),
        Arc::new(PokemonTcgSource::new(catalog.clone(), config)?),
        Arc::new(LorcastSource::new(catalog.clone(), config)?),
        Arc::new(SwuDbSource::new(catalog.clone(), config)?),
        Arc::new(FabDbSource::new(catalog.clone(), config)?),
        Arc::new(OnePieceSource::new(catalog.clone(), config)?),
        Arc::new(RiftboundSource::new(catalog.clone(), config)?),
        Arc::new(DigimonSource::new(catalog.clone(), config)?),
        Arc::new(CustomSource::new(catalog.clone())),
    ])
}

pub(crate) fn source_config(
    config: &ImporterConfig,
    key: &str,
    name: &str,
    game: &str,
    default_base_url: &str,
    printing_match: PrintingMatch,
) -> SourceConfig {
    SourceConfig {
        key: key.to_string(),
        name: name.to_string(),
        game: game.to_string(),
        base_url: config.base_url(key, default_base_url),
        printing_match,
        requires_set_code: true,
        request_delay: config.http.scrape_delay,
    }
}

/// Clone the array held at the first present candidate.
pub(crate) fn array_items(page: &Value, candidates: &[&str]) -> Vec<Value> {
    match crate::fields::lookup(page, candidates) {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Join the present parts with newlines.
pub(crate) fn join_text<I>(parts: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    let parts: Vec<String> = parts.into_iter().flatten().collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

/// Set prefix of a hyphenated card number (`BT1-084` → `BT1`).
pub(crate) fn number_prefix(number: &str) -> Option<&str> {
    number
        .split_once('-')
        .map(|(prefix, _)| prefix.trim())
        .filter(|prefix| !prefix.is_empty())
}
