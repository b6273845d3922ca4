//! Scoped unit of work: one transaction plus a change tracker.
//!
//! Entities loaded or created during an import are tracked here (an identity
//! map) until [`UnitOfWork::save_changes`] flushes them in one pass. Lookups
//! always consult the tracker before the database, so several records naming
//! the same card within one batch resolve to the same pending entity rather
//! than inserting duplicates.

use sqlx::{Sqlite, Transaction};
use tracing::debug;

use super::{card_from_row, printing_from_row};
use crate::models::{Card, CardPrinting};

/// Tracking state of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Added,
    Modified,
    Unchanged,
}

/// Reference to a card tracked by a [`UnitOfWork`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardHandle(usize);

/// Reference to a printing tracked by a [`UnitOfWork`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintingHandle(usize);

/// Rows written by one [`UnitOfWork::save_changes`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveStats {
    pub cards_inserted: usize,
    pub cards_updated: usize,
    pub printings_inserted: usize,
    pub printings_updated: usize,
}

struct TrackedCard {
    card: Card,
    state: EntityState,
}

struct TrackedPrinting {
    printing: CardPrinting,
    card: CardHandle,
    state: EntityState,
}

pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    cards: Vec<TrackedCard>,
    printings: Vec<TrackedPrinting>,
}

impl UnitOfWork {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self {
            tx,
            cards: Vec::new(),
            printings: Vec::new(),
        }
    }

    /// Find a card by its natural key, tracked entities first.
    pub async fn find_card(
        &mut self,
        game: &str,
        name: &str,
    ) -> Result<Option<CardHandle>, sqlx::Error> {
        if let Some(index) = self
            .cards
            .iter()
            .position(|t| t.card.game == game && t.card.name == name)
        {
            return Ok(Some(CardHandle(index)));
        }

        let row = sqlx::query(
            r"
            SELECT id, game, name, card_type, description, details_json
            FROM cards
            WHERE game = ? AND name = ?
            ",
        )
        .bind(game)
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|row| self.track_card(card_from_row(&row), EntityState::Unchanged)))
    }

    /// Track a new card for insertion on the next save.
    pub fn add_card(&mut self, card: Card) -> CardHandle {
        self.track_card(card, EntityState::Added)
    }

    fn track_card(&mut self, card: Card, state: EntityState) -> CardHandle {
        self.cards.push(TrackedCard { card, state });
        CardHandle(self.cards.len() - 1)
    }

    pub fn card(&self, handle: CardHandle) -> &Card {
        &self.cards[handle.0].card
    }

    /// Mutable access to a tracked card; marks it modified.
    pub fn card_mut(&mut self, handle: CardHandle) -> &mut Card {
        let tracked = &mut self.cards[handle.0];
        if tracked.state == EntityState::Unchanged {
            tracked.state = EntityState::Modified;
        }
        &mut tracked.card
    }

    pub fn card_state(&self, handle: CardHandle) -> EntityState {
        self.cards[handle.0].state
    }

    /// Find a printing of `card` by set and number, and by style when given.
    ///
    /// Stored rows are matched through their parent card, so a printing can
    /// only ever resolve under the game of the card it belongs to.
    pub async fn find_printing(
        &mut self,
        card: CardHandle,
        set_code: &str,
        number: &str,
        style: Option<&str>,
    ) -> Result<Option<PrintingHandle>, sqlx::Error> {
        if let Some(index) = self.printings.iter().position(|t| {
            t.card == card
                && t.printing.set_code == set_code
                && t.printing.number == number
                && style.is_none_or(|s| t.printing.style == s)
        }) {
            return Ok(Some(PrintingHandle(index)));
        }

        let owner = &self.cards[card.0].card;
        let Some(card_id) = owner.id else {
            // Not saved yet, so nothing stored can belong to it.
            return Ok(None);
        };
        let game = owner.game.clone();

        let rows = sqlx::query(
            r"
            SELECT p.id, p.card_id, p.set_code, p.number, p.rarity, p.style,
                   p.image_url, p.details_json
            FROM card_printings p
            JOIN cards c ON c.id = p.card_id
            WHERE c.id = ? AND c.game = ? AND p.set_code = ? AND p.number = ?
              AND (? IS NULL OR p.style = ?)
            ORDER BY p.id
            ",
        )
        .bind(card_id)
        .bind(&game)
        .bind(set_code)
        .bind(number)
        .bind(style)
        .bind(style)
        .fetch_all(&mut *self.tx)
        .await?;

        let found = rows
            .iter()
            .map(printing_from_row)
            .find(|p| !self.printings.iter().any(|t| t.printing.id == p.id));

        Ok(found.map(|printing| self.track_printing(card, printing, EntityState::Unchanged)))
    }

    /// Track a new printing of `card` for insertion on the next save.
    pub fn add_printing(&mut self, card: CardHandle, printing: CardPrinting) -> PrintingHandle {
        self.track_printing(card, printing, EntityState::Added)
    }

    fn track_printing(
        &mut self,
        card: CardHandle,
        printing: CardPrinting,
        state: EntityState,
    ) -> PrintingHandle {
        self.printings.push(TrackedPrinting {
            printing,
            card,
            state,
        });
        PrintingHandle(self.printings.len() - 1)
    }

    pub fn printing(&self, handle: PrintingHandle) -> &CardPrinting {
        &self.printings[handle.0].printing
    }

    /// Mutable access to a tracked printing; marks it modified.
    pub fn printing_mut(&mut self, handle: PrintingHandle) -> &mut CardPrinting {
        let tracked = &mut self.printings[handle.0];
        if tracked.state == EntityState::Unchanged {
            tracked.state = EntityState::Modified;
        }
        &mut tracked.printing
    }

    pub fn printing_state(&self, handle: PrintingHandle) -> EntityState {
        self.printings[handle.0].state
    }

    /// Number of tracked entities.
    pub fn tracked(&self) -> usize {
        self.cards.len() + self.printings.len()
    }

    /// Write every added or modified entity inside the transaction.
    pub async fn save_changes(&mut self) -> Result<SaveStats, sqlx::Error> {
        let mut stats = SaveStats::default();

        for tracked in &mut self.cards {
            match tracked.state {
                EntityState::Added => {
                    let card = &tracked.card;
                    let result = sqlx::query(
                        r"
                        INSERT INTO cards (game, name, card_type, description, details_json)
                        VALUES (?, ?, ?, ?, ?)
                        ",
                    )
                    .bind(&card.game)
                    .bind(&card.name)
                    .bind(&card.card_type)
                    .bind(&card.description)
                    .bind(&card.details_json)
                    .execute(&mut *self.tx)
                    .await?;
                    tracked.card.id = Some(result.last_insert_rowid());
                    stats.cards_inserted += 1;
                }
                EntityState::Modified => {
                    let card = &tracked.card;
                    sqlx::query(
                        r"
                        UPDATE cards
                        SET card_type = ?, description = ?, details_json = ?
                        WHERE id = ?
                        ",
                    )
                    .bind(&card.card_type)
                    .bind(&card.description)
                    .bind(&card.details_json)
                    .bind(card.id)
                    .execute(&mut *self.tx)
                    .await?;
                    stats.cards_updated += 1;
                }
                EntityState::Unchanged => continue,
            }
            tracked.state = EntityState::Unchanged;
        }

        for tracked in &mut self.printings {
            if tracked.state == EntityState::Unchanged {
                continue;
            }

            let card_id = self.cards[tracked.card.0]
                .card
                .id
                .ok_or(sqlx::Error::RowNotFound)?;
            tracked.printing.card_id = Some(card_id);
            let printing = &tracked.printing;

            if tracked.state == EntityState::Added {
                let result = sqlx::query(
                    r"
                    INSERT INTO card_printings
                        (card_id, set_code, number, rarity, style, image_url, details_json)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    ",
                )
                .bind(card_id)
                .bind(&printing.set_code)
                .bind(&printing.number)
                .bind(&printing.rarity)
                .bind(&printing.style)
                .bind(&printing.image_url)
                .bind(&printing.details_json)
                .execute(&mut *self.tx)
                .await?;
                tracked.printing.id = Some(result.last_insert_rowid());
                stats.printings_inserted += 1;
            } else {
                sqlx::query(
                    r"
                    UPDATE card_printings
                    SET rarity = ?, style = ?, image_url = ?, details_json = ?
                    WHERE id = ?
                    ",
                )
                .bind(&printing.rarity)
                .bind(&printing.style)
                .bind(&printing.image_url)
                .bind(&printing.details_json)
                .bind(printing.id)
                .execute(&mut *self.tx)
                .await?;
                stats.printings_updated += 1;
            }
            tracked.state = EntityState::Unchanged;
        }

        debug!(
            cards_inserted = stats.cards_inserted,
            cards_updated = stats.cards_updated,
            printings_inserted = stats.printings_inserted,
            printings_updated = stats.printings_updated,
            "Saved catalog changes"
        );
        Ok(stats)
    }

    /// Stop tracking everything, returning how many entities were dropped.
    pub fn detach_all(&mut self) -> usize {
        let detached = self.tracked();
        self.cards.clear();
        self.printings.clear();
        detached
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }

    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        self.tx.rollback().await
    }
}
