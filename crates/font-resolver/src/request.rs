use serde::{Deserialize, Serialize};
use font_core::{FeatureVector, FontCategory, MatchResult};

/// What the caller knows about the font to replace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchRequest {
    /// Declared family name, possibly carrying a build-tool suffix
    pub family: String,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    /// Raw font file (sfnt, WOFF or WOFF2)
    #[serde(default, skip_serializing)]
    pub font_bytes: Option<Vec<u8>>,
    /// Where the font file can be fetched when no bytes are supplied
    #[serde(default)]
    pub font_url: Option<String>,
}

impl MatchRequest {
    pub fn new<S: Into<String>>(family: S) -> Self {
        Self { family: family.into(), ..Self::default() }
    }

    pub fn with_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.font_bytes = Some(bytes);
        self
    }

    pub fn with_url<S: Into<String>>(mut self, url: S) -> Self {
        self.font_url = Some(url.into());
        self
    }

    pub fn with_weight<S: Into<String>>(mut self, weight: S) -> Self {
        self.weight = Some(weight.into());
        self
    }

    pub fn with_style<S: Into<String>>(mut self, style: S) -> Self {
        self.style = Some(style.into());
        self
    }
}

/// Echo of the request plus what the matcher derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySummary {
    pub family: String,
    /// Normalized family with build artifacts removed
    pub lookup_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Category guessed from keywords in the name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inferred_category: Option<FontCategory>,
    /// Feature vector of the supplied font, when it decoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureVector>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResponse {
    pub query: QuerySummary,
    pub results: Vec<MatchResult>,
}

impl MatchResponse {
    /// Strategy that produced the results, if there are any
    pub fn method(&self) -> Option<font_core::MatchMethod> {
        self.results.first().map(|r| r.method)
    }
}
