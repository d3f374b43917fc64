//! Free font alternatives: decode a font, describe it as a feature vector
//! and rank free replacements from a reference catalog.
//!
//! This crate re-exports the workspace members under one roof.

pub use font_core::{
    AppConfig, BuilderConfig, FeatureDimension, FeatureVector, FontCategory, FontError, FontFormat,
    FontRecord, FontResult, MatchMethod, MatchResult, MatcherConfig, FEATURE_COUNT, FEATURE_WEIGHTS,
};
pub use font_parser::{decode, detect_format, DecodedFont, FontParser, FontView};
pub use font_similarity::{
    distance, extract, nearest_neighbors, similarity, similarity_score, FeatureExtractor, Neighbor,
};
pub use font_normalizer::{lookup_key, normalize_name, strip_build_artifact, FontNormalizer};
pub use font_license::LicenseChecker;
pub use font_web_db::ReferenceCatalog;
pub use font_cache::CatalogCache;
pub use font_acquisition::{CatalogEntry, CatalogSource, FontFetcher, GoogleFontsProvider, HttpFontFetcher};
pub use font_updater::{BuildReport, CatalogBuilder, Checkpoint};
pub use font_resolver_engine::{FontResolver, MatchRequest, MatchResponse, QuerySummary};
pub use font_setup::{load_config, load_config_from, save_config, save_config_to};
