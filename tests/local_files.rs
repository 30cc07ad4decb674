// tests/local_files.rs
use titan_scrape::core::net::default_fetcher;
use titan_scrape::scrape::{self, Collected, Concept};
use titan_scrape::CatalogOptions;

const CATALOG_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/catalog");
const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

#[tokio::test]
async fn directory_base_with_local_overrides() {
    let opts = CatalogOptions::new(CATALOG_DIR, ["titans.gst", "legions.cat", "missing.cat"])
        .with_overrides(FIXTURES_DIR);
    let fetcher = default_fetcher().unwrap();

    let out = scrape::run(Concept::Titans, fetcher, &opts, None).await.unwrap();
    let Collected::Titans(result) = &out else {
        panic!("expected titans, got {out:?}");
    };
    assert_eq!(result.templates.len(), 2);
    let reaver = &result.templates[0];
    assert_eq!(reaver.id, "reaver");
    assert_eq!(reaver.stats.reactor_max, Some(6));
    assert!(out.warnings().iter().any(|w| w.contains("missing.cat")), "{:?}", out.warnings());

    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["templates"][0]["id"], "reaver");
    assert_eq!(json["templates"][0]["weapons"][0]["mount"], "arm");
}
