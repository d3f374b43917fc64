//! The reference catalog: free families with precomputed feature vectors.

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use font_core::{FeatureVector, FontCategory, FontError, FontRecord, FontResult, FEATURE_COUNT};
use font_normalizer::{lookup_key, normalize_name, prefix_related};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const MIN_PREFIX_LEN: usize = 3;

/// How [`ReferenceCatalog::find_by_name`] resolved a declared family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameLookup {
    /// Case-insensitive match on the declared name
    Exact,
    /// Match once a bundler hash or id suffix was removed
    ArtifactStripped,
    /// One name is a prefix of the other
    Prefix,
}

#[derive(Debug, Clone, Copy)]
pub struct NameMatch<'a> {
    pub record: &'a FontRecord,
    pub via: NameLookup,
}

/// Entry shape as found on disk, before validation
#[derive(Debug, Deserialize)]
struct LooseRecord {
    #[serde(default)]
    family: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    features: Option<Vec<Value>>,
}

impl LooseRecord {
    fn validate(self) -> Option<FontRecord> {
        let family = self.family?.trim().to_string();
        if family.is_empty() {
            return None;
        }
        let category = FontCategory::parse(self.category.as_deref()?)?;

        let values = self.features?;
        if values.len() != FEATURE_COUNT {
            return None;
        }
        let numbers: Vec<f32> = values
            .iter()
            .map(|v| v.as_f64().map(|n| n as f32).filter(|n| n.is_finite()))
            .collect::<Option<_>>()?;
        let features = FeatureVector::from_slice(&numbers).ok()?;

        Some(FontRecord { family, category, features })
    }
}

/// Read-only collection of catalog records with a name index.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    records: Vec<FontRecord>,
    /// Normalized family to the first record carrying it
    by_name: HashMap<String, usize>,
}

impl ReferenceCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<FontRecord>) -> Self {
        let mut by_name = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            by_name.entry(normalize_name(&record.family)).or_insert(i);
        }
        Self { records, by_name }
    }

    /// Parse a catalog from JSON bytes, gzip-compressed or not.
    ///
    /// Malformed entries are skipped; only a document that is not a JSON
    /// array at all is an error.
    pub fn from_bytes(data: &[u8]) -> FontResult<Self> {
        let json = if data.starts_with(&GZIP_MAGIC) {
            let mut inflated = Vec::new();
            GzDecoder::new(data)
                .read_to_end(&mut inflated)
                .map_err(|e| FontError::Decompression(format!("gzip catalog: {}", e)))?;
            inflated
        } else {
            data.to_vec()
        };

        let document: Value = serde_json::from_slice(&json)?;
        let entries = match document {
            Value::Array(entries) => entries,
            _ => return Err(FontError::Catalog("catalog must be a JSON array".to_string())),
        };

        let total = entries.len();
        let records: Vec<FontRecord> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<LooseRecord>(entry).ok()?.validate())
            .collect();

        let skipped = total - records.len();
        if skipped > 0 {
            warn!(skipped, total, "skipped malformed catalog entries");
        }
        Ok(Self::from_records(records))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> FontResult<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let catalog = Self::from_bytes(&data)?;
        info!(path = %path.display(), records = catalog.len(), "loaded reference catalog");
        Ok(catalog)
    }

    /// Write the catalog; see [`save_records`].
    pub fn save<P: AsRef<Path>>(&self, path: P) -> FontResult<()> {
        save_records(path, &self.records)
    }

    pub fn records(&self) -> &[FontRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record whose family equals `name` after normalization
    pub fn find_verbatim(&self, name: &str) -> Option<&FontRecord> {
        self.by_name.get(&normalize_name(name)).map(|&i| &self.records[i])
    }

    /// Resolve a declared family: exact, then with build artifacts stripped,
    /// then by prefix containment in either direction.
    pub fn find_by_name(&self, declared: &str) -> Option<NameMatch<'_>> {
        if let Some(record) = self.find_verbatim(declared) {
            return Some(NameMatch { record, via: NameLookup::Exact });
        }

        let stripped = lookup_key(declared);
        if stripped.is_empty() {
            return None;
        }
        if let Some(&i) = self.by_name.get(&stripped) {
            return Some(NameMatch { record: &self.records[i], via: NameLookup::ArtifactStripped });
        }

        // closest length wins, catalog order breaks ties
        let found = self
            .records
            .iter()
            .map(|record| (record, normalize_name(&record.family)))
            .filter(|(_, name)| prefix_related(&stripped, name, MIN_PREFIX_LEN))
            .min_by_key(|(_, name)| name.len().abs_diff(stripped.len()))
            .map(|(record, _)| record);

        if let Some(record) = found {
            debug!(declared, matched = %record.family, "catalog prefix match");
        }
        found.map(|record| NameMatch { record, via: NameLookup::Prefix })
    }

    /// Up to `limit` records of one category, in catalog order
    pub fn by_category(&self, category: FontCategory, limit: usize) -> Vec<&FontRecord> {
        self.records.iter().filter(|r| r.category == category).take(limit).collect()
    }

    pub fn first(&self, limit: usize) -> Vec<&FontRecord> {
        self.records.iter().take(limit).collect()
    }
}

/// Serialize records as a compact JSON array, gzip-compressed when the path
/// ends in `.gz`, and replace `path` atomically.
pub fn save_records<P: AsRef<Path>>(path: P, records: &[FontRecord]) -> FontResult<()> {
    let path = path.as_ref();
    let json = serde_json::to_vec(records)?;

    let data = if path.extension().map_or(false, |ext| ext == "gz") {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        encoder.finish()?
    } else {
        json
    };

    write_atomic(path, &data)
}

/// Write to a sibling temporary file, then rename over `path`.
pub fn write_atomic(path: &Path, data: &[u8]) -> FontResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let temp_file = path.with_extension("tmp");
    fs::write(&temp_file, data)?;
    fs::rename(&temp_file, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use font_core::FeatureDimension;

    fn record(family: &str, category: FontCategory) -> FontRecord {
        FontRecord {
            family: family.to_string(),
            category,
            features: FeatureVector::new([0.5; FEATURE_COUNT]),
        }
    }

    fn catalog() -> ReferenceCatalog {
        ReferenceCatalog::from_records(vec![
            record("Roboto", FontCategory::SansSerif),
            record("Roboto Mono", FontCategory::Monospace),
            record("Open Sans", FontCategory::SansSerif),
            record("Merriweather", FontCategory::Serif),
            record("Inter", FontCategory::SansSerif),
        ])
    }

    #[test]
    fn test_loose_entries_are_validated() {
        let features = vec![0.5; FEATURE_COUNT];
        let json = serde_json::json!([
            { "family": "Good", "category": "serif", "features": features },
            { "family": "", "category": "serif", "features": features },
            { "family": "Short", "category": "serif", "features": [0.1, 0.2] },
            { "family": "Strings", "category": "serif", "features": vec!["x"; FEATURE_COUNT] },
            { "family": "Unknown Category", "category": "blackletter", "features": features },
            { "category": "serif", "features": features },
            "not an object",
            { "family": "Too Heavy", "category": "sans-serif",
              "features": [9.0, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.0, 0.0, 0.5, 0.5, 0.5] }
        ]);
        let catalog = ReferenceCatalog::from_bytes(json.to_string().as_bytes()).unwrap();

        let names: Vec<&str> = catalog.records().iter().map(|r| r.family.as_str()).collect();
        assert_eq!(names, vec!["Good", "Too Heavy"]);
        let heavy = &catalog.records()[1];
        assert_eq!(heavy.features.get(FeatureDimension::WeightClass), 1.2);
    }

    #[test]
    fn test_non_array_document_is_an_error() {
        assert!(ReferenceCatalog::from_bytes(b"{\"records\": []}").is_err());
        assert!(ReferenceCatalog::from_bytes(b"not json").is_err());
        assert!(ReferenceCatalog::from_bytes(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_gzip_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.json.gz");
        catalog().save(&path).unwrap();

        let raw = fs::read(&path).unwrap();
        assert!(raw.starts_with(&GZIP_MAGIC));
        let loaded = ReferenceCatalog::load(&path).unwrap();
        assert_eq!(loaded.records(), catalog().records());

        let plain = dir.path().join("catalog.json");
        catalog().save(&plain).unwrap();
        assert_eq!(fs::read(&plain).unwrap().first(), Some(&b'['));
        assert!(!dir.path().join("catalog.tmp").exists());
    }

    #[test]
    fn test_find_by_name_steps() {
        let catalog = catalog();

        let m = catalog.find_by_name("open-sans").unwrap();
        assert_eq!((m.record.family.as_str(), m.via), ("Open Sans", NameLookup::Exact));

        let m = catalog.find_by_name("__Inter_9e1f0c").unwrap();
        assert_eq!((m.record.family.as_str(), m.via), ("Inter", NameLookup::ArtifactStripped));

        let m = catalog.find_by_name("Merriweather-4b7a2c91").unwrap();
        assert_eq!(m.record.family, "Merriweather");

        let m = catalog.find_by_name("Roboto Flex").unwrap();
        assert_eq!((m.record.family.as_str(), m.via), ("Roboto", NameLookup::Prefix));

        let m = catalog.find_by_name("Roboto M").unwrap();
        assert_eq!(m.via, NameLookup::Prefix);

        assert!(catalog.find_by_name("Ro").is_none());
        assert!(catalog.find_by_name("Lato").is_none());
        assert!(catalog.find_by_name("").is_none());
    }

    #[test]
    fn test_letter_only_hash_finds_base_family() {
        let catalog = ReferenceCatalog::from_records(vec![
            record("Inter Tight", FontCategory::SansSerif),
            record("Inter", FontCategory::SansSerif),
        ]);

        for declared in ["Inter_abcdef", "Inter-deadbeef"] {
            let m = catalog.find_by_name(declared).unwrap();
            assert_eq!((m.record.family.as_str(), m.via), ("Inter", NameLookup::ArtifactStripped));
        }
    }

    #[test]
    fn test_category_listing() {
        let catalog = catalog();
        let sans: Vec<&str> = catalog
            .by_category(FontCategory::SansSerif, 2)
            .iter()
            .map(|r| r.family.as_str())
            .collect();
        assert_eq!(sans, vec!["Roboto", "Open Sans"]);
        assert!(catalog.by_category(FontCategory::Handwriting, 5).is_empty());
        assert_eq!(catalog.first(10).len(), 5);
    }
}
