//! Canonical catalog model and the request/result types shared by every source

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Card type stored when a source reports none.
pub const UNKNOWN_CARD_TYPE: &str = "Unknown";

/// Source-independent card, unique per (game, name)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Assigned by the catalog store on first save
    pub id: Option<i64>,
    pub game: String,
    pub name: String,
    pub card_type: String,
    pub description: Option<String>,
    pub details_json: Option<String>,
}

/// A physical printing of a [`Card`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPrinting {
    pub id: Option<i64>,
    /// `None` only while the owning card is still pending its first save
    pub card_id: Option<i64>,
    pub set_code: String,
    pub number: String,
    pub rarity: Option<String>,
    pub style: String,
    pub image_url: Option<String>,
    pub details_json: Option<String>,
}

/// Finish label of a printing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Style {
    Foil,
    Standard,
}

impl Style {
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Foil => "Foil",
            Style::Standard => "Standard",
        }
    }
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a source identifies an existing printing under a card.
///
/// Some sources have no finish concept and key strictly on set and number,
/// letting the style float; others treat each finish as its own printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintingMatch {
    SetAndNumber,
    SetNumberAndStyle,
}

/// One card printing after a source's schema has been normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRecord {
    pub game: String,
    pub name: String,
    pub card_type: String,
    pub description: Option<String>,
    pub card_details: Option<String>,
    pub set_code: String,
    pub number: String,
    pub rarity: Option<String>,
    pub style: Style,
    pub image_url: Option<String>,
    pub printing_details: Option<String>,
}

/// Options for a single import call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    /// Execute everything but discard all writes
    pub dry_run: bool,
    /// Reserved; every source currently upserts
    pub upsert: bool,
    /// Stop after this many records
    pub limit: Option<usize>,
    /// Attribution only
    pub user_id: Option<String>,
    /// Scope filter, required by most remote imports
    pub set_code: Option<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            upsert: true,
            limit: None,
            user_id: None,
            set_code: None,
        }
    }
}

impl ImportOptions {
    /// Options for a committed (non-preview) import.
    pub fn committed() -> Self {
        Self {
            dry_run: false,
            ..Self::default()
        }
    }

    pub fn with_set_code(mut self, set_code: impl Into<String>) -> Self {
        self.set_code = Some(set_code.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Trimmed, non-blank set code.
    pub fn set_code(&self) -> Option<&str> {
        self.set_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

/// What happened to an entity during an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Created,
    Updated,
    Unchanged,
}

/// Result of upserting one [`CardRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub card: Change,
    pub printing: Change,
}

/// Result of one import call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub source: String,
    pub dry_run: bool,
    pub cards_created: u32,
    pub cards_updated: u32,
    pub printings_created: u32,
    pub printings_updated: u32,
    pub errors: u32,
    pub messages: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ImportSummary {
    pub fn new(source: impl Into<String>, dry_run: bool) -> Self {
        Self {
            source: source.into(),
            dry_run,
            cards_created: 0,
            cards_updated: 0,
            printings_created: 0,
            printings_updated: 0,
            errors: 0,
            messages: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome.card {
            Change::Created => self.cards_created += 1,
            Change::Updated => self.cards_updated += 1,
            Change::Unchanged => {}
        }
        match outcome.printing {
            Change::Created => self.printings_created += 1,
            Change::Updated => self.printings_updated += 1,
            Change::Unchanged => {}
        }
    }

    pub fn record_error(&mut self, message: String) {
        self.errors += 1;
        self.messages.push(message);
    }

    pub fn push_message(&mut self, message: String) {
        self.messages.push(message);
    }
}
