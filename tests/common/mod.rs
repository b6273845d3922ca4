//! Shared fixtures for the importer integration tests.
//!
//! Every test gets its own migrated in-memory catalog and a registry holding
//! the built-in sources. Payloads are inline strings, and remote sources are
//! pointed at a local canned-response server.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use card_catalog_importer::{
    AdapterRegistry, CancellationToken, CardPrinting, CardSource, Catalog, ImportOptions,
    ImportSummary, ImporterConfig, Result,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const MTG: &str = "Magic: The Gathering";

/// A fresh, migrated in-memory catalog.
pub async fn catalog() -> Catalog {
    Catalog::in_memory().await.unwrap()
}

/// Registry of the built-in sources writing into `catalog`.
pub fn registry(catalog: &Catalog) -> AdapterRegistry {
    AdapterRegistry::with_default_sources(catalog, &ImporterConfig::default()).unwrap()
}

/// Configuration pointing `key` at `base_url`, with no polite delay.
pub fn config_for(key: &str, base_url: &str) -> ImporterConfig {
    let mut config = ImporterConfig::default();
    config.http.scrape_delay = Duration::ZERO;
    config.http.timeout = Duration::from_secs(5);
    config
        .base_urls
        .insert(key.to_string(), base_url.to_string());
    config
}

/// Run a file import of `payload`, returning the call's result.
pub async fn try_import(
    source: &dyn CardSource,
    payload: &str,
    options: &ImportOptions,
) -> Result<ImportSummary> {
    let mut reader = payload.as_bytes();
    source
        .import_from_file(&mut reader, options, &CancellationToken::new())
        .await
}

/// Run a file import of `payload` that is expected to succeed.
pub async fn import(source: &dyn CardSource, payload: &str, options: &ImportOptions) -> ImportSummary {
    try_import(source, payload, options).await.unwrap()
}

/// Stored printings of the card `(game, name)`.
pub async fn printings_of(catalog: &Catalog, game: &str, name: &str) -> Vec<CardPrinting> {
    let card = catalog
        .find_card(game, name)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("card {name} not found"));
    catalog.printings_for(card.id.unwrap()).await.unwrap()
}

/// Catalog row counts as `(cards, printings)`.
pub async fn counts(catalog: &Catalog) -> (i64, i64) {
    (
        catalog.count_cards().await.unwrap(),
        catalog.count_printings().await.unwrap(),
    )
}

/// Three Scryfall-shaped records across two cards.
pub const SCRYFALL_BATCH: &str = r#"[
    {
        "name": "Llanowar Elves",
        "type_line": "Creature - Elf Druid",
        "oracle_text": "{T}: Add {G}.",
        "set": "dom",
        "collector_number": "168",
        "rarity": "common",
        "finishes": ["nonfoil", "foil"],
        "power": "1",
        "toughness": "1",
        "image_uris": { "normal": "https://img.example/dom/168.jpg" }
    },
    {
        "name": "Llanowar Elves",
        "type_line": "Creature - Elf Druid",
        "oracle_text": "{T}: Add {G}.",
        "set": "m19",
        "collector_number": "314",
        "rarity": "common",
        "finishes": ["nonfoil"],
        "power": "1",
        "toughness": "1"
    },
    {
        "name": "Shivan Dragon",
        "type_line": "Creature - Dragon",
        "oracle_text": "Flying",
        "set": "dom",
        "collector_number": "150",
        "rarity": "rare",
        "finishes": ["nonfoil"]
    }
]"#;

// ---------------------------------------------------------------------------
// Canned HTTP responses
// ---------------------------------------------------------------------------

struct Route {
    target: String,
    status: u16,
    body: String,
}

/// Minimal HTTP/1.1 server answering request targets (path plus query) with
/// mounted bodies; anything unmounted is a 404.
pub struct MockServer {
    base_url: String,
    routes: Arc<Mutex<Vec<Route>>>,
}

impl MockServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let routes: Arc<Mutex<Vec<Route>>> = Arc::default();

        let served = routes.clone();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let routes = served.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut chunk).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => request.extend_from_slice(&chunk[..n]),
                        }
                    }

                    let request = String::from_utf8_lossy(&request);
                    let target = request.split_whitespace().nth(1).unwrap_or("/");
                    let (status, body) = routes
                        .lock()
                        .unwrap()
                        .iter()
                        .find(|route| route.target == target)
                        .map(|route| (route.status, route.body.clone()))
                        .unwrap_or((404, "not found".to_string()));

                    let content_type = if body.starts_with('{') || body.starts_with('[') {
                        "application/json"
                    } else {
                        "text/html; charset=utf-8"
                    };
                    let response = format!(
                        "HTTP/1.1 {status} X\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Self { base_url, routes }
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Answer `target` (path and query, e.g. `/cards?set=ogn`) with `body`.
    pub fn mount(&self, target: &str, status: u16, body: impl Into<String>) {
        self.routes.lock().unwrap().push(Route {
            target: target.to_string(),
            status,
            body: body.into(),
        });
    }
}
