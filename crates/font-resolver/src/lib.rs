//! Matcher cascade: curated overrides, catalog name lookup, feature
//! neighbours, category fallback.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use font_core::{
    FeatureVector, FontCategory, FontError, FontRecord, FontResult, MatchMethod, MatchResult,
    MatcherConfig,
};
use font_acquisition::FontFetcher;
use font_cache::CatalogCache;
use font_license::{LicenseChecker, OverrideMatch};
use font_normalizer::FontNormalizer;
use font_parser::FontParser;
use font_similarity::{nearest_neighbors, similarity, FeatureExtractor, Neighbor};
use font_web_db::ReferenceCatalog;

mod request;

pub use request::{MatchRequest, MatchResponse, QuerySummary};

/// Similarity reported for the prepended "already free" suggestion and
/// for catalog name hits
const IDENTITY_SIMILARITY: u8 = 100;

pub struct FontResolver {
    config: MatcherConfig,
    normalizer: FontNormalizer,
    overrides: LicenseChecker,
    catalog: Arc<CatalogCache>,
    fetcher: Option<Arc<dyn FontFetcher>>,
    workers: Arc<Semaphore>,
}

impl FontResolver {
    pub fn new(config: MatcherConfig) -> Self {
        let catalog = Arc::new(CatalogCache::new(config.catalog_path.clone()));
        let workers = Arc::new(Semaphore::new(config.max_concurrent_extractions.max(1)));
        Self {
            config,
            normalizer: FontNormalizer,
            overrides: LicenseChecker::new(),
            catalog,
            fetcher: None,
            workers,
        }
    }

    /// Share an existing catalog cache instead of the one built from `catalog_path`
    pub fn with_catalog(mut self, catalog: Arc<CatalogCache>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Used for requests that carry a `font_url` but no bytes
    pub fn with_fetcher(mut self, fetcher: Arc<dyn FontFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<CatalogCache> {
        &self.catalog
    }

    /// Run the cascade for one request. The first strategy that yields
    /// anything decides the whole result list.
    pub async fn resolve(&self, request: MatchRequest) -> FontResult<MatchResponse> {
        let family = request.family.trim().to_string();
        if family.is_empty() {
            return Err(FontError::NotFound("empty family name".to_string()));
        }

        let mut query = QuerySummary {
            family: family.clone(),
            lookup_key: self.normalizer.lookup_key(&family),
            weight: request.weight.clone(),
            style: request.style.clone(),
            inferred_category: self.normalizer.infer_category(&family),
            features: None,
        };

        let catalog = self.catalog.get().await;

        if let Some(hit) = self.overrides.find_override(&family) {
            info!(family = %family, matched = hit.family.name, step = ?hit.step, "curated override");
            let results = self.override_results(&hit, &family, &catalog);
            return Ok(MatchResponse { query, results });
        }

        if catalog.is_empty() {
            info!(family = %family, "no reference catalog available");
            return Ok(MatchResponse { query, results: vec![self.no_database_result()] });
        }

        let features = match self.query_bytes(&request).await {
            Some(bytes) => self.extract_features(bytes).await,
            None => None,
        };
        query.features = features;

        if let Some(hit) = catalog.find_by_name(&family) {
            info!(family = %family, matched = %hit.record.family, via = ?hit.via, "catalog name match");
            let mut results = vec![self.exact_result(hit.record, "Family is available in the free catalog")];
            if let Some(vector) = &features {
                let neighbors = nearest_neighbors(
                    catalog.records(),
                    vector,
                    self.config.supplement_neighbors,
                    Some(&hit.record.family),
                );
                results.extend(neighbors.iter().map(|n| self.neighbor_result(n)));
            }
            return Ok(MatchResponse { query, results });
        }

        if let Some(vector) = &features {
            let results = self.feature_results(&catalog, vector, &query.lookup_key);
            if !results.is_empty() {
                return Ok(MatchResponse { query, results });
            }
        }

        let results = self.category_fallback(&catalog, query.inferred_category);
        Ok(MatchResponse { query, results })
    }

    fn override_results(
        &self,
        hit: &OverrideMatch<'_>,
        declared: &str,
        catalog: &ReferenceCatalog,
    ) -> Vec<MatchResult> {
        let mut results = Vec::with_capacity(6);

        // The declared family is itself free: suggest keeping it
        let already_free = catalog.find_verbatim(declared);
        if let Some(record) = already_free {
            results.push(MatchResult {
                family: record.family.clone(),
                category: Some(record.category),
                similarity: IDENTITY_SIMILARITY,
                distance: None,
                reason: format!("{} is already free to use", record.family),
                method: MatchMethod::NameOverride,
                url: Some(self.config.specimen_url(&record.family)),
            });
        }

        let kept = already_free.map(|r| self.normalizer.normalize_name(&r.family));
        for alternative in &hit.family.alternatives {
            if kept.as_deref() == Some(self.normalizer.normalize_name(alternative.family).as_str()) {
                continue;
            }
            let category = catalog
                .find_verbatim(alternative.family)
                .map(|r| r.category)
                .unwrap_or(hit.family.category);
            results.push(MatchResult {
                family: alternative.family.to_string(),
                category: Some(category),
                similarity: alternative.similarity,
                distance: None,
                reason: format!("{} ({})", alternative.reason, alternative.license),
                method: MatchMethod::NameOverride,
                url: Some(self.config.specimen_url(alternative.family)),
            });
        }
        results
    }

    fn no_database_result(&self) -> MatchResult {
        MatchResult {
            family: String::new(),
            category: None,
            similarity: 0,
            distance: None,
            reason: "Reference catalog is missing or empty; run `fr build-catalog` to create it"
                .to_string(),
            method: MatchMethod::NoDatabase,
            url: None,
        }
    }

    fn exact_result(&self, record: &FontRecord, reason: &str) -> MatchResult {
        MatchResult {
            family: record.family.clone(),
            category: Some(record.category),
            similarity: IDENTITY_SIMILARITY,
            distance: None,
            reason: reason.to_string(),
            method: MatchMethod::ExactMatch,
            url: Some(self.config.specimen_url(&record.family)),
        }
    }

    fn neighbor_result(&self, neighbor: &Neighbor<'_>) -> MatchResult {
        let score = similarity(neighbor.distance);
        MatchResult {
            family: neighbor.record.family.clone(),
            category: Some(neighbor.record.category),
            similarity: score,
            distance: Some(neighbor.distance),
            reason: format!("Visually similar {} face (distance {:.3})", neighbor.record.category, neighbor.distance),
            method: MatchMethod::FeatureSimilarity,
            url: Some(self.config.specimen_url(&neighbor.record.family)),
        }
    }

    /// Top-K neighbours. When the nearest one carries the declared family
    /// name it is promoted to an exact match.
    fn feature_results(
        &self,
        catalog: &ReferenceCatalog,
        vector: &FeatureVector,
        lookup_key: &str,
    ) -> Vec<MatchResult> {
        let neighbors = nearest_neighbors(catalog.records(), vector, self.config.top_k, None);
        let Some(nearest) = neighbors.first() else {
            return Vec::new();
        };

        if !lookup_key.is_empty() && self.normalizer.normalize_name(&nearest.record.family) == lookup_key {
            debug!(family = %nearest.record.family, "nearest neighbour is the declared family");
            let mut results = vec![self.exact_result(
                nearest.record,
                "Supplied font matches this catalog family",
            )];
            results.extend(neighbors[1..].iter().map(|n| self.neighbor_result(n)));
            return results;
        }

        neighbors.iter().map(|n| self.neighbor_result(n)).collect()
    }

    fn category_fallback(
        &self,
        catalog: &ReferenceCatalog,
        category: Option<FontCategory>,
    ) -> Vec<MatchResult> {
        let limit = self.config.category_fallback_limit;
        let mut records = match category {
            Some(category) => catalog.by_category(category, limit),
            None => Vec::new(),
        };
        if records.is_empty() {
            records = catalog.first(limit);
        }

        let reason = match category {
            Some(category) => format!("Popular {} family", category),
            None => "Popular free family".to_string(),
        };
        records
            .into_iter()
            .map(|record| MatchResult {
                family: record.family.clone(),
                category: Some(record.category),
                similarity: self.config.category_fallback_similarity,
                distance: None,
                reason: reason.clone(),
                method: MatchMethod::CategoryFallback,
                url: Some(self.config.specimen_url(&record.family)),
            })
            .collect()
    }

    /// Supplied bytes, or bytes fetched from `font_url` within the timeout.
    /// Fetch failures only cost the feature strategies.
    async fn query_bytes(&self, request: &MatchRequest) -> Option<Vec<u8>> {
        if let Some(bytes) = &request.font_bytes {
            return Some(bytes.clone());
        }
        let url = request.font_url.as_deref()?;
        let fetcher = self.fetcher.as_ref()?;

        let timeout = Duration::from_millis(self.config.fetch_timeout_ms);
        match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
            Ok(Ok(bytes)) => Some(bytes),
            Ok(Err(e)) => {
                warn!(url, error = %e, "failed to fetch query font");
                None
            }
            Err(_) => {
                warn!(url, timeout_ms = self.config.fetch_timeout_ms, "query font fetch timed out");
                None
            }
        }
    }

    /// Decode and extract on the blocking pool, bounded by the worker semaphore
    async fn extract_features(&self, bytes: Vec<u8>) -> Option<FeatureVector> {
        let permit = self.workers.clone().acquire_owned().await.ok()?;

        let extracted = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let decoded = FontParser.decode(&bytes)?;
            let view = decoded.view().ok()?;
            Some(FeatureExtractor.extract(&view))
        })
        .await;

        match extracted {
            Ok(vector) => {
                if vector.is_none() {
                    debug!("query font did not decode");
                }
                vector
            }
            Err(e) => {
                warn!(error = %e, "feature extraction task failed");
                None
            }
        }
    }
}
