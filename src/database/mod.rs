use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, migrate::MigrateDatabase};
use tracing::info;

use crate::error::Result;
use crate::models::{Card, CardPrinting};

mod dry_run;
mod unit_of_work;

pub use dry_run::run_with_dry_run;
pub use unit_of_work::{CardHandle, EntityState, PrintingHandle, SaveStats, UnitOfWork};

/// Handle to the card catalog store
#[derive(Clone)]
pub struct Catalog {
    pool: SqlitePool,
}

impl Catalog {
    /// Open (creating if needed) the catalog at `db_url` and run migrations.
    pub async fn connect(db_url: &str) -> Result<Self> {
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating catalog database at {}", db_url);
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePool::connect(db_url).await?;
        Self::from_pool(pool).await
    }

    /// A private in-memory catalog, migrated and ready to use.
    ///
    /// Held on a single connection that never expires, since every SQLite
    /// memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        info!("Running catalog migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Start a unit of work in a fresh transaction.
    pub async fn begin(&self) -> Result<UnitOfWork> {
        let tx = self.pool.begin().await?;
        Ok(UnitOfWork::new(tx))
    }

    pub async fn count_cards(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM cards")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n"))
    }

    pub async fn count_printings(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM card_printings")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n"))
    }

    pub async fn find_card(&self, game: &str, name: &str) -> Result<Option<Card>> {
        let row = sqlx::query(
            r"
            SELECT id, game, name, card_type, description, details_json
            FROM cards
            WHERE game = ? AND name = ?
            ",
        )
        .bind(game)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(card_from_row))
    }

    pub async fn printings_for(&self, card_id: i64) -> Result<Vec<CardPrinting>> {
        let rows = sqlx::query(
            r"
            SELECT id, card_id, set_code, number, rarity, style, image_url, details_json
            FROM card_printings
            WHERE card_id = ?
            ORDER BY id
            ",
        )
        .bind(card_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(printing_from_row).collect())
    }
}

pub(crate) fn card_from_row(row: &SqliteRow) -> Card {
    Card {
        id: Some(row.get("id")),
        game: row.get("game"),
        name: row.get("name"),
        card_type: row.get("card_type"),
        description: row.get("description"),
        details_json: row.get("details_json"),
    }
}

pub(crate) fn printing_from_row(row: &SqliteRow) -> CardPrinting {
    CardPrinting {
        id: Some(row.get("id")),
        card_id: Some(row.get("card_id")),
        set_code: row.get("set_code"),
        number: row.get("number"),
        rarity: row.get("rarity"),
        style: row.get("style"),
        image_url: row.get("image_url"),
        details_json: row.get("details_json"),
    }
}
