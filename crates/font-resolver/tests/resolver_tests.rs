use std::sync::Arc;
use std::time::{Duration, Instant};
use async_trait::async_trait;
use font_acquisition::FontFetcher;
use font_cache::CatalogCache;
use font_core::{
    FeatureDimension, FeatureVector, FontCategory, FontError, FontRecord, FontResult,
    MatchMethod, MatcherConfig, FEATURE_COUNT,
};
use font_parser::fixtures::TestFont;
use font_resolver_engine::{FontResolver, MatchRequest};
use font_similarity::extract;
use font_web_db::{save_records, ReferenceCatalog};

fn vector_of(bytes: &[u8]) -> FeatureVector {
    let font = font_parser::decode(bytes).expect("fixture decodes");
    extract(&font.view().expect("fixture parses"))
}

fn synthetic(base: f32, monospace: bool) -> FeatureVector {
    let mut values = [base; FEATURE_COUNT];
    values[FeatureDimension::Monospace.index()] = if monospace { 1.0 } else { 0.0 };
    FeatureVector::new(values)
}

fn record(family: &str, category: FontCategory, features: FeatureVector) -> FontRecord {
    FontRecord { family: family.to_string(), category, features }
}

fn sans_bytes() -> Vec<u8> {
    TestFont::sans("Fixture Sans").to_ttf()
}

fn catalog_records() -> Vec<FontRecord> {
    vec![
        record("Roboto", FontCategory::SansSerif, synthetic(0.40, false)),
        record("Open Sans", FontCategory::SansSerif, synthetic(0.45, false)),
        record("Merriweather", FontCategory::Serif, synthetic(0.70, false)),
        record("Lato", FontCategory::SansSerif, synthetic(0.35, false)),
        record("Fixture Sans", FontCategory::SansSerif, vector_of(&sans_bytes())),
        record("Fira Code", FontCategory::Monospace, synthetic(0.40, true)),
        record("Lobster", FontCategory::Display, synthetic(0.60, false)),
        record("JetBrains Mono", FontCategory::Monospace, synthetic(0.45, true)),
        record("Fixture Mono", FontCategory::Monospace, vector_of(&TestFont::monospace("Fixture Mono").to_ttf())),
    ]
}

fn resolver() -> FontResolver {
    let cache = CatalogCache::preloaded(ReferenceCatalog::from_records(catalog_records()));
    FontResolver::new(MatcherConfig::default()).with_catalog(Arc::new(cache))
}

fn families(results: &[font_core::MatchResult]) -> Vec<&str> {
    results.iter().map(|r| r.family.as_str()).collect()
}

struct StaticFetcher {
    bytes: Vec<u8>,
    delay: Duration,
}

#[async_trait]
impl FontFetcher for StaticFetcher {
    async fn fetch(&self, _url: &str) -> FontResult<Vec<u8>> {
        tokio::time::sleep(self.delay).await;
        Ok(self.bytes.clone())
    }
}

struct FailingFetcher;

#[async_trait]
impl FontFetcher for FailingFetcher {
    async fn fetch(&self, url: &str) -> FontResult<Vec<u8>> {
        Err(FontError::Network(format!("GET {}: connection refused", url)))
    }
}

#[tokio::test]
async fn test_missing_catalog_reports_no_database() {
    let dir = tempfile::tempdir().unwrap();
    let cache = CatalogCache::new(dir.path().join("font_catalog.json"));
    let resolver = FontResolver::new(MatcherConfig::default()).with_catalog(Arc::new(cache));

    let response = resolver
        .resolve(MatchRequest::new("Some Unknown Face").with_bytes(sans_bytes()))
        .await
        .unwrap();

    assert_eq!(response.results.len(), 1);
    let result = &response.results[0];
    assert_eq!(result.method, MatchMethod::NoDatabase);
    assert_eq!(result.similarity, 0);
    assert!(result.family.is_empty());
    assert!(result.reason.contains("build-catalog"));
}

#[tokio::test]
async fn test_curated_override_works_without_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let cache = CatalogCache::new(dir.path().join("absent.json"));
    let resolver = FontResolver::new(MatcherConfig::default()).with_catalog(Arc::new(cache));

    for spelling in ["Helvetica Neue", "helvetica-neue", "HELVETICA_NEUE"] {
        let response = resolver.resolve(MatchRequest::new(spelling)).await.unwrap();
        assert_eq!(response.method(), Some(MatchMethod::NameOverride));
        assert_eq!(
            families(&response.results),
            vec!["Inter", "Roboto", "Public Sans", "IBM Plex Sans", "Work Sans"]
        );
        assert!(response.results.iter().all(|r| r.url.is_some() && !r.reason.is_empty()));
    }
}

#[tokio::test]
async fn test_override_prepends_family_found_in_catalog() {
    let mut records = catalog_records();
    records.push(record("Helvetica Neue", FontCategory::SansSerif, synthetic(0.42, false)));
    let cache = CatalogCache::preloaded(ReferenceCatalog::from_records(records));
    let resolver = FontResolver::new(MatcherConfig::default()).with_catalog(Arc::new(cache));

    let response = resolver.resolve(MatchRequest::new("helvetica neue")).await.unwrap();
    assert_eq!(response.results.len(), 6);
    assert_eq!(response.results[0].family, "Helvetica Neue");
    assert_eq!(response.results[0].similarity, 100);
    assert!(response.results[0].reason.contains("already free"));
    assert!(response.results.iter().all(|r| r.method == MatchMethod::NameOverride));
}

#[tokio::test]
async fn test_catalog_name_hit_without_bytes() {
    let response = resolver().resolve(MatchRequest::new("open-sans")).await.unwrap();
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].family, "Open Sans");
    assert_eq!(response.results[0].method, MatchMethod::ExactMatch);
    assert_eq!(response.results[0].similarity, 100);
    assert_eq!(
        response.results[0].url.as_deref(),
        Some("https://fonts.google.com/specimen/Open+Sans")
    );
}

#[tokio::test]
async fn test_catalog_name_hit_through_build_artifact() {
    let response = resolver().resolve(MatchRequest::new("__Lato_a1b2c3")).await.unwrap();
    assert_eq!(response.query.lookup_key, "lato");
    assert_eq!(families(&response.results), vec!["Lato"]);
    assert_eq!(response.results[0].method, MatchMethod::ExactMatch);
}

#[tokio::test]
async fn test_catalog_name_hit_is_supplemented_with_neighbours() {
    let response = resolver()
        .resolve(MatchRequest::new("Open Sans").with_bytes(sans_bytes()))
        .await
        .unwrap();

    assert_eq!(response.results.len(), 5);
    assert_eq!(response.results[0].family, "Open Sans");
    assert_eq!(response.results[0].method, MatchMethod::ExactMatch);

    let supplements = &response.results[1..];
    assert!(supplements.iter().all(|r| r.method == MatchMethod::FeatureSimilarity));
    assert!(supplements.iter().all(|r| r.family != "Open Sans"));
    assert_eq!(supplements[0].family, "Fixture Sans");
    assert_eq!(supplements[0].similarity, 100);
}

#[tokio::test]
async fn test_unknown_name_with_bytes_uses_nearest_neighbours() {
    let response = resolver()
        .resolve(MatchRequest::new("Mystery Grotesk").with_bytes(sans_bytes()))
        .await
        .unwrap();

    assert!(response.query.features.is_some());
    assert_eq!(response.results.len(), MatcherConfig::default().top_k);
    assert!(response.results.iter().all(|r| r.method == MatchMethod::FeatureSimilarity));
    assert_eq!(response.results[0].family, "Fixture Sans");
    assert_eq!(response.results[0].distance, Some(0.0));

    let distances: Vec<f32> = response.results.iter().filter_map(|r| r.distance).collect();
    assert_eq!(distances.len(), response.results.len());
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_keyword_category_fallback() {
    let response = resolver().resolve(MatchRequest::new("Acme Mono Code")).await.unwrap();
    assert_eq!(response.query.inferred_category, Some(FontCategory::Monospace));
    assert_eq!(families(&response.results), vec!["Fira Code", "JetBrains Mono", "Fixture Mono"]);
    assert!(response
        .results
        .iter()
        .all(|r| r.method == MatchMethod::CategoryFallback && r.similarity == 50));
}

#[tokio::test]
async fn test_fallback_without_keyword_uses_whole_catalog() {
    let response = resolver().resolve(MatchRequest::new("Zyxw")).await.unwrap();
    assert_eq!(
        families(&response.results),
        vec!["Roboto", "Open Sans", "Merriweather", "Lato", "Fixture Sans"]
    );
}

#[tokio::test]
async fn test_corrupt_bytes_degrade_to_name_strategies() {
    let mut bytes = sans_bytes();
    bytes.truncate(40);
    let response = resolver()
        .resolve(MatchRequest::new("Quirky Serif Display").with_bytes(bytes))
        .await
        .unwrap();

    assert!(response.query.features.is_none());
    assert_eq!(response.method(), Some(MatchMethod::CategoryFallback));
    assert_eq!(families(&response.results), vec!["Merriweather"]);
}

#[tokio::test]
async fn test_fetched_bytes_feed_feature_search() {
    let fetcher = StaticFetcher { bytes: sans_bytes(), delay: Duration::ZERO };
    let response = resolver()
        .with_fetcher(Arc::new(fetcher))
        .resolve(MatchRequest::new("Mystery Grotesk").with_url("https://cdn.example.com/m.woff2"))
        .await
        .unwrap();

    assert_eq!(response.method(), Some(MatchMethod::FeatureSimilarity));
    assert_eq!(response.results[0].family, "Fixture Sans");
}

#[tokio::test]
async fn test_slow_fetch_times_out() {
    let config = MatcherConfig { fetch_timeout_ms: 50, ..MatcherConfig::default() };
    let cache = CatalogCache::preloaded(ReferenceCatalog::from_records(catalog_records()));
    let fetcher = StaticFetcher { bytes: sans_bytes(), delay: Duration::from_secs(30) };
    let resolver = FontResolver::new(config)
        .with_catalog(Arc::new(cache))
        .with_fetcher(Arc::new(fetcher));

    let started = Instant::now();
    let response = resolver
        .resolve(MatchRequest::new("Mystery Grotesk").with_url("https://cdn.example.com/m.woff2"))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(response.query.features.is_none());
    assert_eq!(response.method(), Some(MatchMethod::CategoryFallback));
}

#[tokio::test]
async fn test_fetch_failure_degrades() {
    let response = resolver()
        .with_fetcher(Arc::new(FailingFetcher))
        .resolve(MatchRequest::new("Acme Mono").with_url("https://cdn.example.com/a.woff"))
        .await
        .unwrap();
    assert_eq!(response.method(), Some(MatchMethod::CategoryFallback));
}

#[tokio::test]
async fn test_empty_family_is_rejected() {
    let err = resolver().resolve(MatchRequest::new("   ")).await.unwrap_err();
    assert!(matches!(err, FontError::NotFound(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_catalog_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("font_catalog.json");
    save_records(&path, &catalog_records()).unwrap();

    let cache = Arc::new(CatalogCache::new(&path));
    let config = MatcherConfig { max_concurrent_extractions: 2, ..MatcherConfig::default() };
    let resolver = Arc::new(FontResolver::new(config).with_catalog(cache.clone()));

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let resolver = resolver.clone();
            tokio::spawn(async move {
                let request = if i % 2 == 0 {
                    MatchRequest::new("Mystery Grotesk").with_bytes(sans_bytes())
                } else {
                    MatchRequest::new("Roboto")
                };
                resolver.resolve(request).await
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let response = handle.await.unwrap().unwrap();
        let expected = if i % 2 == 0 { "Fixture Sans" } else { "Roboto" };
        assert_eq!(response.results[0].family, expected);
    }
    assert_eq!(cache.load_count(), 1);
}

#[tokio::test]
async fn test_response_serializes_kebab_case_methods() {
    let response = resolver().resolve(MatchRequest::new("Acme Mono")).await.unwrap();
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["results"][0]["method"], "category-fallback");
    assert_eq!(json["results"][0]["category"], "monospace");
    assert_eq!(json["query"]["family"], "Acme Mono");
}
