use std::fmt;
use std::path::PathBuf;
use serde::{Serialize, Deserialize};

/// Number of dimensions in a [`FeatureVector`].
pub const FEATURE_COUNT: usize = 15;

/// One named dimension of the perceptual feature vector.
///
/// The discriminant is the index into [`FeatureVector`] and [`FEATURE_WEIGHTS`];
/// the order is shared by extraction, catalog storage and distance computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureDimension {
    WeightClass = 0,
    WidthClass = 1,
    XHeight = 2,
    CapHeight = 3,
    Ascender = 4,
    Descender = 5,
    AverageWidth = 6,
    SerifScore = 7,
    Contrast = 8,
    Roundness = 9,
    Monospace = 10,
    ItalicAngle = 11,
    PanoseSerif = 12,
    PanoseWeight = 13,
    Complexity = 14,
}

impl FeatureDimension {
    pub const ALL: [FeatureDimension; FEATURE_COUNT] = [
        FeatureDimension::WeightClass,
        FeatureDimension::WidthClass,
        FeatureDimension::XHeight,
        FeatureDimension::CapHeight,
        FeatureDimension::Ascender,
        FeatureDimension::Descender,
        FeatureDimension::AverageWidth,
        FeatureDimension::SerifScore,
        FeatureDimension::Contrast,
        FeatureDimension::Roundness,
        FeatureDimension::Monospace,
        FeatureDimension::ItalicAngle,
        FeatureDimension::PanoseSerif,
        FeatureDimension::PanoseWeight,
        FeatureDimension::Complexity,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Machine-friendly name, used in CLI and JSON dumps
    pub fn name(self) -> &'static str {
        match self {
            FeatureDimension::WeightClass => "weight_class",
            FeatureDimension::WidthClass => "width_class",
            FeatureDimension::XHeight => "x_height",
            FeatureDimension::CapHeight => "cap_height",
            FeatureDimension::Ascender => "ascender",
            FeatureDimension::Descender => "descender",
            FeatureDimension::AverageWidth => "average_width",
            FeatureDimension::SerifScore => "serif_score",
            FeatureDimension::Contrast => "contrast",
            FeatureDimension::Roundness => "roundness",
            FeatureDimension::Monospace => "monospace",
            FeatureDimension::ItalicAngle => "italic_angle",
            FeatureDimension::PanoseSerif => "panose_serif",
            FeatureDimension::PanoseWeight => "panose_weight",
            FeatureDimension::Complexity => "complexity",
        }
    }

    /// Valid (min, max) range; extraction and catalog loading clamp into it.
    pub fn range(self) -> (f32, f32) {
        match self {
            FeatureDimension::WeightClass => (0.0, 1.2),
            FeatureDimension::CapHeight => (0.0, 1.5),
            FeatureDimension::Ascender => (0.0, 2.0),
            FeatureDimension::AverageWidth => (0.0, 1.5),
            _ => (0.0, 1.0),
        }
    }

    /// Relative perceptual importance used by the weighted distance.
    pub fn weight(self) -> f32 {
        FEATURE_WEIGHTS[self.index()]
    }
}

impl fmt::Display for FeatureDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Static per-dimension multipliers, parallel to [`FeatureDimension::ALL`].
///
/// Monospace carries the largest weight; for every other dimension
/// `weight * range_width^2` stays below it.
pub const FEATURE_WEIGHTS: [f32; FEATURE_COUNT] = [
    2.0, // weight class
    1.0, // width class
    1.5, // x-height
    0.8, // cap-height
    0.6, // ascender
    0.6, // descender
    1.2, // average width
    2.5, // serif score
    1.2, // contrast
    1.0, // roundness
    3.0, // monospace
    0.8, // italic angle
    1.0, // panose serif
    0.5, // panose weight
    0.6, // complexity
];

/// Fixed-length perceptual description of a font.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct FeatureVector([f32; FEATURE_COUNT]);

impl FeatureVector {
    /// Build a vector, clamping every value into its dimension's range.
    /// Non-finite values are replaced by the range minimum.
    pub fn new(values: [f32; FEATURE_COUNT]) -> Self {
        let mut clamped = values;
        for dim in FeatureDimension::ALL {
            let (min, max) = dim.range();
            let value = clamped[dim.index()];
            clamped[dim.index()] = if value.is_finite() { value.clamp(min, max) } else { min };
        }
        Self(clamped)
    }

    pub fn from_slice(values: &[f32]) -> FontResult<Self> {
        let array: [f32; FEATURE_COUNT] = values.try_into().map_err(|_| {
            FontError::Parse(format!(
                "feature vector must have {} entries, got {}",
                FEATURE_COUNT,
                values.len()
            ))
        })?;
        if array.iter().any(|v| !v.is_finite()) {
            return Err(FontError::Parse("feature vector contains non-finite values".to_string()));
        }
        Ok(Self::new(array))
    }

    pub fn get(&self, dim: FeatureDimension) -> f32 {
        self.0[dim.index()]
    }

    pub fn values(&self) -> &[f32; FEATURE_COUNT] {
        &self.0
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn is_monospace(&self) -> bool {
        self.get(FeatureDimension::Monospace) >= 0.5
    }

    /// Named pairs in storage order
    pub fn named(&self) -> impl Iterator<Item = (FeatureDimension, f32)> + '_ {
        FeatureDimension::ALL.iter().map(move |dim| (*dim, self.get(*dim)))
    }
}

impl TryFrom<Vec<f32>> for FeatureVector {
    type Error = FontError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::from_slice(&values)
    }
}

impl From<FeatureVector> for Vec<f32> {
    fn from(vector: FeatureVector) -> Self {
        vector.0.to_vec()
    }
}

/// Coarse classification of a family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontCategory {
    Serif,
    SansSerif,
    Monospace,
    Display,
    Handwriting,
}

impl FontCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontCategory::Serif => "serif",
            FontCategory::SansSerif => "sans-serif",
            FontCategory::Monospace => "monospace",
            FontCategory::Display => "display",
            FontCategory::Handwriting => "handwriting",
        }
    }

    /// Parse a category label; accepts the catalog spelling and a few common variants.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().replace(&['_', ' '][..], "-").as_str() {
            "serif" => Some(FontCategory::Serif),
            "sans-serif" | "sans" | "sansserif" => Some(FontCategory::SansSerif),
            "monospace" | "mono" => Some(FontCategory::Monospace),
            "display" => Some(FontCategory::Display),
            "handwriting" | "script" => Some(FontCategory::Handwriting),
            _ => None,
        }
    }
}

impl fmt::Display for FontCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the reference catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontRecord {
    pub family: String,
    pub category: FontCategory,
    pub features: FeatureVector,
}

/// Which strategy of the matching cascade produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMethod {
    NameOverride,
    ExactMatch,
    FeatureSimilarity,
    CategoryFallback,
    NoDatabase,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::NameOverride => "name-override",
            MatchMethod::ExactMatch => "exact-match",
            MatchMethod::FeatureSimilarity => "feature-similarity",
            MatchMethod::CategoryFallback => "category-fallback",
            MatchMethod::NoDatabase => "no-database",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single ranked alternative returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Family name of the suggested font (empty for `no-database`)
    pub family: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<FontCategory>,

    /// 0 to 100
    pub similarity: u8,

    /// Weighted feature distance, only for vector-based results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,

    /// Human-readable justification
    pub reason: String,

    pub method: MatchMethod,

    /// Catalog browsing URL for the family
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Container format detected from the leading signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFormat {
    Ttf,
    Otf,
    Collection,
    Woff,
    Woff2,
}

impl fmt::Display for FontFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontFormat::Ttf => write!(f, "TTF"),
            FontFormat::Otf => write!(f, "OTF"),
            FontFormat::Collection => write!(f, "TTC"),
            FontFormat::Woff => write!(f, "WOFF"),
            FontFormat::Woff2 => write!(f, "WOFF2"),
        }
    }
}

/// Raw OS/2 fields used by feature extraction.
///
/// Values are in font units except the classification bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Os2Metrics {
    pub avg_char_width: i16,
    pub weight_class: u16,
    pub width_class: u16,
    pub panose: [u8; 10],
    pub typo_ascender: i16,
    pub typo_descender: i16,
    /// Present from table version 2 on
    pub x_height: Option<i16>,
    pub cap_height: Option<i16>,
}

/// Glyph bounding box in font units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphBounds {
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
}

/// One drawing instruction of a glyph outline
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo { x: f32, y: f32 },
    LineTo { x: f32, y: f32 },
    QuadTo { x1: f32, y1: f32, x: f32, y: f32 },
    CurveTo { x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32 },
    Close,
}

impl PathCommand {
    /// End point of the command, `None` for `Close`
    pub fn end_point(&self) -> Option<(f32, f32)> {
        match *self {
            PathCommand::MoveTo { x, y }
            | PathCommand::LineTo { x, y }
            | PathCommand::QuadTo { x, y, .. }
            | PathCommand::CurveTo { x, y, .. } => Some((x, y)),
            PathCommand::Close => None,
        }
    }

    pub fn is_curve(&self) -> bool {
        matches!(self, PathCommand::QuadTo { .. } | PathCommand::CurveTo { .. })
    }

    pub fn is_line(&self) -> bool {
        matches!(self, PathCommand::LineTo { .. })
    }

    /// Same command with every coordinate mapped through `f`
    pub fn map(self, f: impl Fn(f32, f32) -> (f32, f32)) -> Self {
        match self {
            PathCommand::MoveTo { x, y } => {
                let (x, y) = f(x, y);
                PathCommand::MoveTo { x, y }
            }
            PathCommand::LineTo { x, y } => {
                let (x, y) = f(x, y);
                PathCommand::LineTo { x, y }
            }
            PathCommand::QuadTo { x1, y1, x, y } => {
                let (x1, y1) = f(x1, y1);
                let (x, y) = f(x, y);
                PathCommand::QuadTo { x1, y1, x, y }
            }
            PathCommand::CurveTo { x1, y1, x2, y2, x, y } => {
                let (x1, y1) = f(x1, y1);
                let (x2, y2) = f(x2, y2);
                let (x, y) = f(x, y);
                PathCommand::CurveTo { x1, y1, x2, y2, x, y }
            }
            PathCommand::Close => PathCommand::Close,
        }
    }
}

/// Outline and metrics of a single glyph
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlyphOutline {
    /// Drawing commands in font units
    pub commands: Vec<PathCommand>,
    pub advance_width: Option<u16>,
    pub bounds: Option<GlyphBounds>,
}

/// Structural view of a decoded font, as consumed by feature extraction.
///
/// Implemented by the `ttf-parser` backed view in `font-parser`; tests can
/// provide lightweight in-memory implementations.
pub trait StructuralFont {
    fn units_per_em(&self) -> u16;

    /// `None` when the font has no (or a truncated) OS/2 table
    fn os2(&self) -> Option<Os2Metrics>;

    /// Font-level (hhea) ascender in font units
    fn ascender(&self) -> i16;

    /// Font-level (hhea) descender in font units, usually negative
    fn descender(&self) -> i16;

    /// `post.isFixedPitch`
    fn is_fixed_pitch(&self) -> bool;

    /// `post.italicAngle` in degrees, 0 when absent
    fn italic_angle(&self) -> f32;

    /// Outline of the glyph mapped to `ch`, `None` when the cmap has no entry
    fn glyph(&self, ch: char) -> Option<GlyphOutline>;
}

/// Matching cascade settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Reference catalog file (JSON, optionally gzip-compressed)
    pub catalog_path: PathBuf,

    /// Nearest-neighbour result count
    pub top_k: usize,

    /// Feature neighbours appended to a catalog name hit
    pub supplement_neighbors: usize,

    pub category_fallback_limit: usize,
    pub category_fallback_similarity: u8,

    /// Timeout for fetching the query font bytes
    pub fetch_timeout_ms: u64,

    /// Size of the decode/extract worker pool
    pub max_concurrent_extractions: usize,

    /// `{family}` is replaced with the family name, spaces as `+`
    pub specimen_url_template: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("data/font_catalog.json"),
            top_k: 6,
            supplement_neighbors: 4,
            category_fallback_limit: 5,
            category_fallback_similarity: 50,
            fetch_timeout_ms: 5000,
            max_concurrent_extractions: 4,
            specimen_url_template: "https://fonts.google.com/specimen/{family}".to_string(),
        }
    }
}

impl MatcherConfig {
    /// Browsing URL for a family according to the configured template
    pub fn specimen_url(&self, family: &str) -> String {
        let key = family.trim().split_whitespace().collect::<Vec<_>>().join("+");
        self.specimen_url_template.replace("{family}", &key)
    }
}

/// Offline catalog builder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Family listing endpoint (Google Fonts developer API)
    pub listing_endpoint: String,

    /// Listing credential; `GOOGLE_FONTS_API_KEY` overrides it
    pub api_key: Option<String>,

    /// Pause between two downloads
    pub download_delay_ms: u64,

    /// Successes between two checkpoint writes
    pub checkpoint_every: usize,

    pub output_path: PathBuf,
    pub checkpoint_path: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            listing_endpoint: "https://www.googleapis.com/webfonts/v1/webfonts".to_string(),
            api_key: None,
            download_delay_ms: 150,
            checkpoint_every: 50,
            output_path: PathBuf::from("data/font_catalog.json"),
            checkpoint_path: PathBuf::from("data/font_catalog.progress.json"),
            request_timeout_secs: 30,
        }
    }
}

/// Whole application configuration as stored in `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub matcher: MatcherConfig,
    pub builder: BuilderConfig,
}

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Font parsing error: {0}")]
    Parse(String),

    #[error("Font not found: {0}")]
    NotFound(String),

    #[error("Unsupported font format")]
    UnsupportedFormat,

    #[error("Decompression error: {0}")]
    Decompression(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for font operations
pub type FontResult<T> = Result<T, FontError>;
