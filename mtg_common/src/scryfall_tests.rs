//! Tests for the Scryfall catalog client.

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{ScryfallCard, ScryfallClient};
use crate::error::CatalogError;

/// Helper: creates a minimal ScryfallCard JSON value for mock responses.
fn scryfall_card_json(name: &str, set: &str, cn: &str, usd: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "id": format!("{set}-{cn}"),
        "name": name,
        "set": set,
        "set_name": "Test Set",
        "collector_number": cn,
        "rarity": "common",
        "prices": { "usd": usd, "usd_foil": null, "eur": "1.50", "eur_foil": null },
        "image_uris": { "normal": "https://example.com/image.jpg" }
    })
}

fn not_found_json() -> serde_json::Value {
    serde_json::json!({
        "object": "error",
        "status": 404,
        "code": "not_found",
        "details": "Your query didn't match any cards."
    })
}

// ── ScryfallCard helpers ─────────────────────────────────────────────

#[test]
fn reference_price_prefers_usd() {
    let card: ScryfallCard =
        serde_json::from_value(scryfall_card_json("Lightning Bolt", "lea", "161", Some("4.25")))
            .unwrap();
    assert_eq!(card.reference_price(), Some(4.25));
}

#[test]
fn reference_price_falls_back_to_foil() {
    let card: ScryfallCard = serde_json::from_value(serde_json::json!({
        "id": "x",
        "name": "Foil Only",
        "prices": { "usd": null, "usd_foil": "12.00" }
    }))
    .unwrap();
    assert_eq!(card.reference_price(), Some(12.0));
}

#[test]
fn reference_price_none_without_usd() {
    let card: ScryfallCard = serde_json::from_value(serde_json::json!({
        "id": "x",
        "name": "Euro Only",
        "prices": { "usd": null, "eur": "3.00" }
    }))
    .unwrap();
    assert_eq!(card.reference_price(), None);
}

#[test]
fn image_url_uses_front_face_for_double_faced() {
    let card: ScryfallCard = serde_json::from_value(serde_json::json!({
        "id": "dfc",
        "name": "Delver of Secrets // Insectile Aberration",
        "card_faces": [
            { "name": "Delver of Secrets", "image_uris": { "normal": "https://example.com/front.jpg" } },
            { "name": "Insectile Aberration", "image_uris": { "normal": "https://example.com/back.jpg" } }
        ]
    }))
    .unwrap();
    assert_eq!(card.image_url(), Some("https://example.com/front.jpg"));
}

// ── search ───────────────────────────────────────────────────────────

#[tokio::test]
async fn search_returns_cards() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards/search"))
        .and(query_param("q", "lightning bolt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": "list",
            "total_cards": 2,
            "has_more": false,
            "data": [
                scryfall_card_json("Lightning Bolt", "lea", "161", Some("450.00")),
                scryfall_card_json("Lightning Bolt", "m10", "146", Some("1.20"))
            ]
        })))
        .mount(&mock_server)
        .await;

    let client = ScryfallClient::with_base_url(mock_server.uri());
    let cards = client.search("lightning bolt").await.unwrap();

    assert_eq!(cards.len(), 2);
    assert_eq!(cards[1].set, "m10");
    assert_eq!(cards[1].reference_price(), Some(1.2));
}

#[tokio::test]
async fn search_not_found_is_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards/search"))
        .respond_with(ResponseTemplate::new(404).set_body_json(not_found_json()))
        .mount(&mock_server)
        .await;

    let client = ScryfallClient::with_base_url(mock_server.uri());
    let cards = client.search("zzzz no such card").await.unwrap();
    assert!(cards.is_empty());
}

#[tokio::test]
async fn search_server_error_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards/search"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&mock_server)
        .await;

    let client = ScryfallClient::with_base_url(mock_server.uri());
    match client.search("bolt").await {
        Err(CatalogError::HttpStatus(status)) => assert_eq!(status.as_u16(), 503),
        other => panic!("Expected CatalogError::HttpStatus, got: {other:?}"),
    }
}

// ── named / card ─────────────────────────────────────────────────────

#[tokio::test]
async fn named_uses_fuzzy_lookup() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards/named"))
        .and(query_param("fuzzy", "bolt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(scryfall_card_json(
            "Lightning Bolt",
            "2xm",
            "141",
            Some("1.00"),
        )))
        .mount(&mock_server)
        .await;

    let client = ScryfallClient::with_base_url(mock_server.uri());
    let card = client.named("bolt").await.unwrap();
    assert_eq!(card.name, "Lightning Bolt");
}

#[tokio::test]
async fn named_not_found_returns_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards/named"))
        .respond_with(ResponseTemplate::new(404).set_body_json(not_found_json()))
        .mount(&mock_server)
        .await;

    let client = ScryfallClient::with_base_url(mock_server.uri());
    match client.named("ThisCardDoesNotExistXYZ123").await {
        Err(CatalogError::Api { code, details }) => {
            assert_eq!(code, "not_found");
            assert!(details.contains("didn't match"));
        }
        other => panic!("Expected CatalogError::Api, got: {other:?}"),
    }
}

#[tokio::test]
async fn card_lowercases_set_code() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards/m10/146"))
        .respond_with(ResponseTemplate::new(200).set_body_json(scryfall_card_json(
            "Lightning Bolt",
            "m10",
            "146",
            None,
        )))
        .mount(&mock_server)
        .await;

    let client = ScryfallClient::with_base_url(mock_server.uri());
    let card = client.card("M10", "146").await.unwrap();
    assert_eq!(card.collector_number, "146");
    assert_eq!(card.reference_price(), None);
}

// ── printings / autocomplete ─────────────────────────────────────────

#[tokio::test]
async fn printings_searches_exact_name_with_unique_prints() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards/search"))
        .and(query_param("q", "!\"Lightning Bolt\""))
        .and(query_param("unique", "prints"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": "list",
            "data": [
                scryfall_card_json("Lightning Bolt", "lea", "161", Some("450.00")),
                scryfall_card_json("Lightning Bolt", "leb", "162", Some("300.00")),
                scryfall_card_json("Lightning Bolt", "m10", "146", Some("1.20"))
            ]
        })))
        .mount(&mock_server)
        .await;

    let client = ScryfallClient::with_base_url(mock_server.uri());
    let prints = client.printings("Lightning Bolt").await.unwrap();

    let sets: Vec<&str> = prints.iter().map(|c| c.set.as_str()).collect();
    assert_eq!(sets, vec!["lea", "leb", "m10"]);
}

#[tokio::test]
async fn autocomplete_returns_names() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cards/autocomplete"))
        .and(query_param("q", "light"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": "catalog",
            "total_values": 2,
            "data": ["Lightning Bolt", "Lightning Helix"]
        })))
        .mount(&mock_server)
        .await;

    let client = ScryfallClient::with_base_url(mock_server.uri());
    let names = client.autocomplete("light").await.unwrap();
    assert_eq!(names, vec!["Lightning Bolt", "Lightning Helix"]);
}

#[tokio::test]
async fn autocomplete_short_prefix_skips_request() {
    // No mock mounted: a request would fail with a 404 from the mock server
    let mock_server = MockServer::start().await;
    let client = ScryfallClient::with_base_url(mock_server.uri());

    let names = client.autocomplete("l").await.unwrap();
    assert!(names.is_empty());
}

// Integration tests (require network access)
#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn named_integration() {
    let card = ScryfallClient::new().named("Lightning Bolt").await.unwrap();
    assert!(card.name.to_lowercase().contains("lightning"));
    assert!(card.image_url().is_some());
}
