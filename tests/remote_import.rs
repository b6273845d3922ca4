//! Remote entry point against a local canned-response server.

mod common;

use card_catalog_importer::{
    AdapterRegistry, CancellationToken, ImportError, ImportOptions, ImportSummary,
};
use common::MockServer;

const SEARCH_DOM: &str = "/cards/search?q=e%3Adom&unique=prints&order=set";

async fn import_remote(
    registry: &AdapterRegistry,
    key: &str,
    options: &ImportOptions,
) -> Result<ImportSummary, ImportError> {
    registry
        .get(key)
        .unwrap()
        .import_from_remote(options, &CancellationToken::new())
        .await
}

fn scryfall_card(name: &str, number: &str) -> String {
    format!(
        r#"{{ "name": "{name}", "type_line": "Creature", "set": "dom",
             "collector_number": "{number}", "rarity": "common", "finishes": ["nonfoil"] }}"#
    )
}

// ---------------------------------------------------------------------------
// Paged JSON APIs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn follows_continuation_links_across_pages() {
    let server = MockServer::start().await;
    server.mount(
        SEARCH_DOM,
        200,
        format!(
            r#"{{ "object": "list", "has_more": true, "next_page": "{}/cards/search?page=2",
                 "data": [{}, {}] }}"#,
            server.url(),
            scryfall_card("Llanowar Elves", "168"),
            scryfall_card("Shivan Dragon", "150"),
        ),
    );
    server.mount(
        "/cards/search?page=2",
        200,
        format!(
            r#"{{ "object": "list", "has_more": false, "data": [{}] }}"#,
            scryfall_card("Serra Angel", "33")
        ),
    );

    let catalog = common::catalog().await;
    let config = common::config_for("scryfall", server.url());
    let registry = AdapterRegistry::with_default_sources(&catalog, &config).unwrap();

    let options = ImportOptions::committed().with_set_code("dom");
    let summary = import_remote(&registry, "scryfall", &options).await.unwrap();

    assert_eq!(summary.source, "scryfall");
    assert_eq!(summary.cards_created, 3);
    assert_eq!(summary.printings_created, 3);
    assert_eq!(
        summary.messages.last().map(String::as_str),
        Some("Processed 3 records for set=DOM")
    );
    assert_eq!(common::counts(&catalog).await, (3, 3));

    let again = import_remote(&registry, "scryfall", &options).await.unwrap();
    assert_eq!(again.cards_created + again.cards_updated, 0);
    assert_eq!(again.printings_created + again.printings_updated, 0);
}

#[tokio::test]
async fn limit_stops_paging_early() {
    let server = MockServer::start().await;
    server.mount(
        SEARCH_DOM,
        200,
        format!(
            r#"{{ "has_more": true, "next_page": "{}/cards/search?page=2", "data": [{}, {}] }}"#,
            server.url(),
            scryfall_card("Llanowar Elves", "168"),
            scryfall_card("Shivan Dragon", "150"),
        ),
    );

    let catalog = common::catalog().await;
    let config = common::config_for("scryfall", server.url());
    let registry = AdapterRegistry::with_default_sources(&catalog, &config).unwrap();

    let options = ImportOptions::committed().with_set_code("DOM").with_limit(1);
    let summary = import_remote(&registry, "scryfall", &options).await.unwrap();

    assert_eq!(summary.cards_created, 1);
    assert_eq!(common::counts(&catalog).await, (1, 1));
}

#[tokio::test]
async fn failed_page_fails_the_whole_batch() {
    let server = MockServer::start().await;
    server.mount(
        SEARCH_DOM,
        200,
        format!(
            r#"{{ "has_more": true, "next_page": "{}/cards/search?page=2", "data": [{}] }}"#,
            server.url(),
            scryfall_card("Llanowar Elves", "168"),
        ),
    );
    server.mount("/cards/search?page=2", 500, "upstream exploded");

    let catalog = common::catalog().await;
    let config = common::config_for("scryfall", server.url());
    let registry = AdapterRegistry::with_default_sources(&catalog, &config).unwrap();

    let result = import_remote(&registry, "scryfall", &ImportOptions::committed().with_set_code("dom")).await;

    assert!(matches!(result, Err(ImportError::Status { status: 500, .. })));
    assert_eq!(common::counts(&catalog).await, (0, 0));
}

#[tokio::test]
async fn fabdb_keeps_only_printings_of_requested_set() {
    let server = MockServer::start().await;
    server.mount(
        "/cards?set=WTR&per_page=100",
        200,
        r#"{ "data": [
            { "name": "Snatch", "pitch": 1, "type_text": "Generic Action - Attack",
              "printings": [
                { "identifier": "WTR167", "foiling": "S" },
                { "identifier": "1HP367", "foiling": "S" }
              ] },
            { "name": "Command and Conquer", "type_text": "Generic Action - Attack",
              "printings": [{ "identifier": "ARC159", "foiling": "S" }] }
          ],
          "meta": { "next_cursor": null } }"#,
    );

    let catalog = common::catalog().await;
    let config = common::config_for("fabdb", server.url());
    let registry = AdapterRegistry::with_default_sources(&catalog, &config).unwrap();

    let summary = import_remote(&registry, "fabdb", &ImportOptions::committed().with_set_code("wtr"))
        .await
        .unwrap();

    assert_eq!(summary.cards_created, 1);
    assert_eq!(summary.printings_created, 1);
    let printings = common::printings_of(&catalog, "Flesh and Blood", "Snatch (Red)").await;
    assert_eq!(printings[0].set_code, "WTR");
    assert_eq!(printings[0].number, "167");
}

// ---------------------------------------------------------------------------
// Scraped HTML sites
// ---------------------------------------------------------------------------

fn riftbound_detail(name: &str, number: &str, finish: &str) -> String {
    format!(
        r#"<html><body>
             <h1 class="card-name">{name}</h1>
             <table>
               <tr><th>Set</th><td>Origins (OGN)</td></tr>
               <tr><th>Number</th><td>{number}/298</td></tr>
               <tr><th>Type</th><td>Unit</td></tr>
               <tr><th>Rarity</th><td>Common</td></tr>
               <tr><th>Finish</th><td>{finish}</td></tr>
             </table>
           </body></html>"#
    )
}

#[tokio::test]
async fn scrapes_listing_pages_and_isolates_broken_detail_pages() {
    let server = MockServer::start().await;
    server.mount(
        "/cards?set=ogn",
        200,
        r#"<div class="card-grid">
             <a class="card-tile" href="/cards/ogn-001">Jinx</a>
             <a class="card-tile" href="/cards/ogn-002">Vi</a>
           </div>
           <nav class="pagination"><a class="next" href="/cards?set=ogn&amp;page=2">Next</a></nav>"#,
    );
    server.mount(
        "/cards?set=ogn&page=2",
        200,
        r#"<div class="card-grid">
             <a class="card-tile" href="/cards/ogn-003">Missing</a>
             <a class="card-tile" href="/cards/ogn-001">Jinx again</a>
           </div>"#,
    );
    server.mount("/cards/ogn-001", 200, riftbound_detail("Jinx, Rebel", "001", "Standard"));
    server.mount("/cards/ogn-002", 200, riftbound_detail("Vi, Enforcer", "002", "Foil"));

    let catalog = common::catalog().await;
    let config = common::config_for("riftbound", server.url());
    let registry = AdapterRegistry::with_default_sources(&catalog, &config).unwrap();

    let summary = import_remote(&registry, "riftbound", &ImportOptions::committed().with_set_code("OGN"))
        .await
        .unwrap();

    assert_eq!(summary.cards_created, 2);
    assert_eq!(summary.printings_created, 2);
    assert_eq!(summary.errors, 1);
    assert!(summary.messages[0].contains("ogn-003"));
    assert!(summary.messages[0].contains("failed to fetch"));
    assert_eq!(
        summary.messages.last().map(String::as_str),
        Some("Processed 3 records for set=OGN")
    );

    let vi = common::printings_of(&catalog, "Riftbound", "Vi, Enforcer").await;
    assert_eq!(vi[0].set_code, "OGN");
    assert_eq!(vi[0].number, "002");
    assert_eq!(vi[0].style, "Foil");
}

#[tokio::test]
async fn query_relative_next_link_stays_on_the_listing_path() {
    let server = MockServer::start().await;
    server.mount(
        "/cards?set=ogn",
        200,
        r#"<div class="card-grid"><a class="card-tile" href="/cards/ogn-001">Jinx</a></div>
           <a rel="next" href="?set=ogn&amp;page=2">Next</a>"#,
    );
    server.mount(
        "/cards?set=ogn&page=2",
        200,
        r#"<div class="card-grid"><a class="card-tile" href="ogn-002">Vi</a></div>"#,
    );
    server.mount("/cards/ogn-001", 200, riftbound_detail("Jinx, Rebel", "001", "Standard"));
    server.mount("/ogn-002", 200, riftbound_detail("Vi, Enforcer", "002", "Standard"));

    let catalog = common::catalog().await;
    let config = common::config_for("riftbound", server.url());
    let registry = AdapterRegistry::with_default_sources(&catalog, &config).unwrap();

    let summary = import_remote(&registry, "riftbound", &ImportOptions::committed().with_set_code("ogn"))
        .await
        .unwrap();

    assert_eq!(summary.errors, 0, "{:?}", summary.messages);
    assert_eq!(summary.cards_created, 2);
    assert_eq!(common::counts(&catalog).await, (2, 2));
}

#[tokio::test]
async fn failed_listing_page_fails_the_whole_batch() {
    let server = MockServer::start().await;

    let catalog = common::catalog().await;
    let config = common::config_for("riftbound", server.url());
    let registry = AdapterRegistry::with_default_sources(&catalog, &config).unwrap();

    let result = import_remote(&registry, "riftbound", &ImportOptions::committed().with_set_code("ogn")).await;
    assert!(matches!(result, Err(ImportError::Status { status: 404, .. })));
}

#[tokio::test]
async fn dry_run_scrape_writes_nothing() {
    let server = MockServer::start().await;
    server.mount(
        "/cards?set=ogn",
        200,
        r#"<div class="card-grid"><a class="card-tile" href="/cards/ogn-001">Jinx</a></div>"#,
    );
    server.mount("/cards/ogn-001", 200, riftbound_detail("Jinx, Rebel", "001", "Standard"));

    let catalog = common::catalog().await;
    let config = common::config_for("riftbound", server.url());
    let registry = AdapterRegistry::with_default_sources(&catalog, &config).unwrap();

    let summary = import_remote(&registry, "riftbound", &ImportOptions::default().with_set_code("ogn"))
        .await
        .unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.cards_created, 1);
    assert_eq!(common::counts(&catalog).await, (0, 0));
}
