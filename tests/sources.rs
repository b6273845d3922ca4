//! Per-source schema normalization, pagination and HTML extraction.

mod common;

use card_catalog_importer::sources::{
    DigimonSource, FabDbSource, LorcastSource, OnePieceSource, PokemonTcgSource, RiftboundSource,
    ScryfallSource, SwuDbSource,
};
use card_catalog_importer::{
    CardSource, ImporterConfig, PagedSource, RecordError, ScrapedSource, Style,
};
use serde_json::json;

fn config() -> ImporterConfig {
    ImporterConfig::default()
}

// ---------------------------------------------------------------------------
// Scryfall
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scryfall_normalizes_multi_faced_cards() {
    let source = ScryfallSource::new(common::catalog().await, &config()).unwrap();
    let records = source
        .normalize(&json!({
            "id": "abc",
            "name": "Delver of Secrets // Insectile Aberration",
            "set": "isd",
            "collector_number": "51",
            "rarity": "common",
            "finishes": ["nonfoil", "foil"],
            "card_faces": [
                { "type_line": "Creature - Human Wizard", "oracle_text": "Transform it.",
                  "image_uris": { "normal": "https://img/front.jpg" } },
                { "type_line": "Creature - Human Insect", "oracle_text": "Flying" }
            ]
        }))
        .unwrap();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.card_type, "Creature - Human Wizard");
    assert_eq!(record.description.as_deref(), Some("Transform it.\n//\nFlying"));
    assert_eq!(record.set_code, "ISD");
    assert_eq!(record.style, Style::Foil);
    assert_eq!(record.image_url.as_deref(), Some("https://img/front.jpg"));
    assert_eq!(record.printing_details.as_deref(), Some(r#"{"scryfall_id":"abc"}"#));
}

#[tokio::test]
async fn scryfall_pagination_requires_has_more() {
    let source = ScryfallSource::new(common::catalog().await, &config()).unwrap();

    assert_eq!(
        source.first_page_url("DOM"),
        "https://api.scryfall.com/cards/search?q=e%3Adom&unique=prints&order=set"
    );
    let page = json!({ "has_more": false, "next_page": "https://api.scryfall.com/x", "data": [{}] });
    assert_eq!(source.next_page_url(&page, "u"), None);
    assert_eq!(source.page_records(&page, "DOM").len(), 1);

    let page = json!({ "has_more": true, "next_page": "https://api.scryfall.com/x" });
    assert_eq!(source.next_page_url(&page, "u").as_deref(), Some("https://api.scryfall.com/x"));
}

// ---------------------------------------------------------------------------
// Pokémon TCG
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pokemontcg_pages_by_number() {
    let source = PokemonTcgSource::new(common::catalog().await, &config()).unwrap();
    let first = source.first_page_url("SV1");
    assert_eq!(
        first,
        "https://api.pokemontcg.io/v2/cards?q=set.id%3Asv1&page=1&pageSize=250&orderBy=number"
    );

    let page = json!({ "page": 1, "pageSize": 250, "totalCount": 300, "data": [] });
    assert_eq!(
        source.next_page_url(&page, &first).as_deref(),
        Some("https://api.pokemontcg.io/v2/cards?q=set.id%3Asv1&page=2&pageSize=250&orderBy=number")
    );

    let last = json!({ "page": 2, "pageSize": 250, "totalCount": 300, "data": [] });
    assert_eq!(source.next_page_url(&last, &first), None);
}

#[tokio::test]
async fn pokemontcg_without_prices_uses_finish_list() {
    let source = PokemonTcgSource::new(common::catalog().await, &config()).unwrap();
    let records = source
        .normalize(&json!({
            "name": "Professor's Research",
            "supertype": "Trainer",
            "subtypes": ["Supporter"],
            "rules": ["Discard your hand and draw 7 cards."],
            "set": { "id": "sv1" },
            "number": "189",
            "finishes": "holofoil"
        }))
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].card_type, "Trainer - Supporter");
    assert_eq!(records[0].style, Style::Foil);
    assert_eq!(records[0].description.as_deref(), Some("Discard your hand and draw 7 cards."));
}

// ---------------------------------------------------------------------------
// Lorcast
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lorcast_joins_version_and_treats_enchanted_as_foil() {
    let source = LorcastSource::new(common::catalog().await, &config()).unwrap();
    let records = source
        .normalize(&json!({
            "id": "crd_1",
            "name": "Elsa",
            "version": "Snow Queen",
            "type": ["Character", "Floodborn"],
            "text": "Freeze",
            "set": { "code": "1", "name": "The First Chapter" },
            "collector_number": "207",
            "rarity": "Enchanted",
            "cost": 8,
            "ink": "Amethyst",
            "image_uris": { "digital": { "large": "https://img/elsa.avif" } }
        }))
        .unwrap();

    let record = &records[0];
    assert_eq!(record.name, "Elsa - Snow Queen");
    assert_eq!(record.card_type, "Character Floodborn");
    assert_eq!(record.set_code, "1");
    assert_eq!(record.style, Style::Foil);
    assert_eq!(record.image_url.as_deref(), Some("https://img/elsa.avif"));
    assert_eq!(record.card_details.as_deref(), Some(r#"{"cost":8,"ink":"Amethyst"}"#));
}

#[tokio::test]
async fn lorcast_follows_next_link() {
    let source = LorcastSource::new(common::catalog().await, &config()).unwrap();
    let page = json!({ "results": [{ "name": "A" }, { "name": "B" }], "next": "https://api.lorcast.com/next" });
    assert_eq!(source.page_records(&page, "1").len(), 2);
    assert_eq!(source.next_page_url(&page, "u").as_deref(), Some("https://api.lorcast.com/next"));
    assert_eq!(source.next_page_url(&json!({ "results": [] }), "u"), None);
}

// ---------------------------------------------------------------------------
// SWU-DB
// ---------------------------------------------------------------------------

#[tokio::test]
async fn swudb_maps_capitalized_schema() {
    let source = SwuDbSource::new(common::catalog().await, &config()).unwrap();
    let records = source
        .normalize(&json!({
            "Set": "SOR",
            "Number": "010",
            "Name": "Darth Vader",
            "Subtitle": "Dark Lord of the Sith",
            "Type": "Leader",
            "Rarity": "Common",
            "FrontText": "Action: Deal 1 damage.",
            "EpicAction": "Epic Action: Deploy.",
            "Aspects": ["Aggression", "Villainy"],
            "VariantType": "Hyperspace Foil",
            "FrontArt": "https://img/vader.png"
        }))
        .unwrap();

    let record = &records[0];
    assert_eq!(record.name, "Darth Vader - Dark Lord of the Sith");
    assert_eq!(record.card_type, "Leader");
    assert_eq!(
        record.description.as_deref(),
        Some("Action: Deal 1 damage.\nEpic Action: Deploy.")
    );
    assert_eq!(record.style, Style::Foil);
    assert_eq!(
        record.printing_details.as_deref(),
        Some(r#"{"variant_type":"Hyperspace Foil"}"#)
    );
    assert_eq!(source.first_page_url("SOR"), "https://api.swu-db.com/cards/sor?format=json&order=setnumber");
    assert_eq!(source.next_page_url(&json!({ "data": [] }), "u"), None);
}

// ---------------------------------------------------------------------------
// FaB DB
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fabdb_filters_printings_and_pages_by_cursor() {
    let source = FabDbSource::new(common::catalog().await, &config()).unwrap();
    let page = json!({
        "data": [
            { "name": "Snatch", "printings": [{ "identifier": "WTR167" }, { "identifier": "ARC159" }] },
            { "name": "Other", "printings": [{ "identifier": "ARC001" }] },
            { "name": "Flat", "identifier": "WTR002" }
        ],
        "meta": { "next_cursor": "abc=" }
    });

    let records = source.page_records(&page, "WTR");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["printings"].as_array().unwrap().len(), 1);
    assert_eq!(records[1]["name"], "Flat");

    let first = source.first_page_url("WTR");
    let next = source.next_page_url(&page, &first).unwrap();
    assert_eq!(next, "https://api.fabdb.net/cards?set=WTR&per_page=100&cursor=abc%3D");
    let after = source.next_page_url(&page, &next).unwrap();
    assert_eq!(after, next);
}

#[tokio::test]
async fn fabdb_flat_record_is_one_printing() {
    let source = FabDbSource::new(common::catalog().await, &config()).unwrap();
    let records = source
        .normalize(&json!({ "name": "Flat", "pitch": "3", "identifier": "WTR002", "foiling": "C" }))
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Flat (Blue)");
    assert_eq!(records[0].card_type, "Unknown");
    assert_eq!(records[0].set_code, "WTR");
    assert_eq!(records[0].number, "002");
    assert_eq!(records[0].style, Style::Foil);
}

// ---------------------------------------------------------------------------
// Scraped sources
// ---------------------------------------------------------------------------

const ONE_PIECE_DETAIL: &str = r#"
<html><body>
  <h1 class="card-name">Monkey.D.Luffy</h1>
  <div class="frontCol"><img src="/images/cardlist/card/OP01-024.png"></div>
  <dl>
    <dt>Card Number</dt><dd>OP01-024</dd>
    <dt>Rarity</dt><dd>SR</dd>
    <dt>Category:</dt><dd>CHARACTER</dd>
    <dt>Cost</dt><dd>5</dd>
    <dt>Power</dt><dd>6000</dd>
    <dt>Effect</dt><dd>[On Play] Rest up to 1 of your opponent's Characters.</dd>
    <dt>Trigger</dt><dd>Play this card.</dd>
    <dt>Card Set(s)</dt><dd>-ROMANCE DAWN- [OP01]</dd>
  </dl>
</body></html>
"#;

#[tokio::test]
async fn onepiece_detail_page_normalizes() {
    let source = OnePieceSource::new(common::catalog().await, &config()).unwrap();
    let url = "https://en.onepiece-cardgame.com/cards/OP01-024";
    let raw = source.parse_detail(ONE_PIECE_DETAIL, url).unwrap();

    assert_eq!(raw["image"], "https://en.onepiece-cardgame.com/images/cardlist/card/OP01-024.png");

    let records = source.normalize(&raw).unwrap();
    let record = &records[0];
    assert_eq!(record.name, "Monkey.D.Luffy");
    assert_eq!(record.set_code, "OP01");
    assert_eq!(record.number, "OP01-024");
    assert_eq!(record.card_type, "CHARACTER");
    assert_eq!(record.rarity.as_deref(), Some("SR"));
    assert_eq!(
        record.description.as_deref(),
        Some("[On Play] Rest up to 1 of your opponent's Characters.\n[Trigger] Play this card.")
    );
    assert_eq!(record.card_details.as_deref(), Some(r#"{"cost":"5","power":"6000"}"#));
    assert_eq!(
        record.printing_details.as_deref(),
        Some(r#"{"detail_url":"https://en.onepiece-cardgame.com/cards/OP01-024"}"#)
    );
}

#[tokio::test]
async fn onepiece_listing_collects_detail_links() {
    let source = OnePieceSource::new(common::catalog().await, &config()).unwrap();
    assert_eq!(
        source.listing_url("OP01"),
        "https://en.onepiece-cardgame.com/cardlist/?series=OP01"
    );

    let page = source.listing().parse(
        r#"<div class="resultCol">
             <a href="/cards/OP01-001">1</a>
             <a href="/cards/OP01-002">2</a>
             <a href="/rules">rules</a>
           </div>"#,
        &source.listing_url("OP01"),
    );
    assert_eq!(
        page.card_links,
        vec![
            "https://en.onepiece-cardgame.com/cards/OP01-001",
            "https://en.onepiece-cardgame.com/cards/OP01-002",
        ]
    );
    assert_eq!(page.next_page, None);
}

#[tokio::test]
async fn riftbound_detail_table_normalizes() {
    let source = RiftboundSource::new(common::catalog().await, &config()).unwrap();
    let raw = source
        .parse_detail(
            r#"<html><body>
                 <h1 class="card-name">Jinx, Rebel</h1>
                 <img class="card-image" data-src="https://cdn.riftbound.gg/jinx.png">
                 <table>
                   <tr><th>Set:</th><td>Origins (OGN)</td></tr>
                   <tr><th>Number</th><td>202/298</td></tr>
                   <tr><th>Type</th><td>Champion Unit</td></tr>
                   <tr><th>Rarity</th><td>Epic</td></tr>
                   <tr><th>Finish</th><td>Foil</td></tr>
                   <tr><th>Might</th><td>5</td></tr>
                 </table>
               </body></html>"#,
            "https://riftbound.gg/cards/ogn-202",
        )
        .unwrap();

    let record = &source.normalize(&raw).unwrap()[0];
    assert_eq!(record.set_code, "OGN");
    assert_eq!(record.number, "202");
    assert_eq!(record.card_type, "Champion Unit");
    assert_eq!(record.style, Style::Foil);
    assert_eq!(record.image_url.as_deref(), Some("https://cdn.riftbound.gg/jinx.png"));
    assert_eq!(record.card_details.as_deref(), Some(r#"{"might":"5"}"#));
}

#[tokio::test]
async fn digimon_set_comes_from_number_prefix() {
    let source = DigimonSource::new(common::catalog().await, &config()).unwrap();
    let raw = source
        .parse_detail(
            r#"<html><body>
                 <h1 class="card-name">Agumon</h1>
                 <dl>
                   <dt>Card Number</dt><dd>BT1-010</dd>
                   <dt>Rarity</dt><dd>R</dd>
                   <dt>Card Type</dt><dd>Digimon</dd>
                   <dt>Lv.</dt><dd>Lv.3</dd>
                   <dt>DP</dt><dd>2000</dd>
                   <dt>Effect</dt><dd>[When Digivolving] Gain 1 memory.</dd>
                   <dt>Inherited Effect</dt><dd>[Your Turn] +1000 DP.</dd>
                 </dl>
               </body></html>"#,
            "https://world.digimoncard.com/cards/BT1-010",
        )
        .unwrap();

    let record = &source.normalize(&raw).unwrap()[0];
    assert_eq!(record.name, "Agumon");
    assert_eq!(record.set_code, "BT1");
    assert_eq!(record.card_type, "Digimon");
    assert_eq!(
        record.description.as_deref(),
        Some("[When Digivolving] Gain 1 memory.\n[Inherited] [Your Turn] +1000 DP.")
    );
    assert_eq!(record.card_details.as_deref(), Some(r#"{"dp":"2000","level":"Lv.3"}"#));
}

#[tokio::test]
async fn scraped_record_without_number_is_rejected() {
    let source = DigimonSource::new(common::catalog().await, &config()).unwrap();
    let raw = source
        .parse_detail("<html><body><h1 class=\"card-name\">Gabumon</h1></body></html>", "u")
        .unwrap();
    assert!(matches!(source.normalize(&raw), Err(RecordError::BlankNumber)));
}
