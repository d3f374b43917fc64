//! Perceptual feature extraction and weighted-distance scoring.

mod features;
mod scoring;

pub use features::{extract, FeatureExtractor, NOMINAL_SIZE, SAMPLE_CHARS};
pub use scoring::{distance, nearest_neighbors, similarity, similarity_score, Neighbor};
