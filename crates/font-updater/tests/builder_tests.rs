use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use async_trait::async_trait;
use font_acquisition::{CatalogEntry, CatalogSource};
use font_core::{BuilderConfig, FontCategory, FontError, FontResult};
use font_parser::fixtures::TestFont;
use font_updater::{CatalogBuilder, Checkpoint};
use font_web_db::ReferenceCatalog;

struct FakeSource {
    entries: Vec<CatalogEntry>,
    files: HashMap<String, Vec<u8>>,
    checkpoint_path: PathBuf,
    downloads: Mutex<Vec<String>>,
    checkpoint_seen: Mutex<Vec<bool>>,
}

impl FakeSource {
    fn new(checkpoint_path: &Path) -> Self {
        Self {
            entries: Vec::new(),
            files: HashMap::new(),
            checkpoint_path: checkpoint_path.to_path_buf(),
            downloads: Mutex::new(Vec::new()),
            checkpoint_seen: Mutex::new(Vec::new()),
        }
    }

    fn with_family(mut self, family: &str, category: FontCategory, bytes: Option<Vec<u8>>) -> Self {
        let url = format!("https://fonts.test/{}.ttf", family.replace(' ', "-"));
        if let Some(bytes) = bytes {
            self.files.insert(url.clone(), bytes);
        }
        self.entries.push(CatalogEntry { family: family.to_string(), category, file_url: url });
        self
    }

    fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogSource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    async fn list_families(&self) -> FontResult<Vec<CatalogEntry>> {
        Ok(self.entries.clone())
    }

    async fn download(&self, url: &str) -> FontResult<Vec<u8>> {
        self.downloads.lock().unwrap().push(url.to_string());
        self.checkpoint_seen.lock().unwrap().push(self.checkpoint_path.exists());
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| FontError::Network(format!("404 {}", url)))
    }
}

fn config(dir: &Path) -> BuilderConfig {
    BuilderConfig {
        download_delay_ms: 0,
        checkpoint_every: 2,
        output_path: dir.join("catalog.json"),
        checkpoint_path: dir.join("catalog.progress.json"),
        ..BuilderConfig::default()
    }
}

#[tokio::test]
async fn test_failures_are_counted_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let source = FakeSource::new(&config.checkpoint_path)
        .with_family("Alpha Sans", FontCategory::SansSerif, Some(TestFont::sans("Alpha Sans").to_ttf()))
        .with_family("Broken", FontCategory::Serif, Some(b"definitely not a font".to_vec()))
        .with_family("Missing", FontCategory::Serif, None)
        .with_family("Beta Mono", FontCategory::Monospace, Some(TestFont::monospace("Beta Mono").to_woff2().unwrap()))
        .with_family("Gamma Sans", FontCategory::SansSerif, Some(TestFont::sans("Gamma Sans").to_woff().unwrap()));

    let builder = CatalogBuilder::new(source, config.clone());
    let report = builder.run().await.unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(report.failed, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.total_records, 3);
    assert!(!config.checkpoint_path.exists());

    let catalog = ReferenceCatalog::load(&config.output_path).unwrap();
    let families: Vec<&str> = catalog.records().iter().map(|r| r.family.as_str()).collect();
    assert_eq!(families, vec!["Alpha Sans", "Beta Mono", "Gamma Sans"]);
    assert!(catalog.records()[1].features.is_monospace());
    assert_eq!(catalog.records()[1].category, FontCategory::Monospace);
}

#[tokio::test]
async fn test_checkpoint_written_every_n_successes() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let mut source = FakeSource::new(&config.checkpoint_path);
    for name in ["One", "Two", "Three", "Four"] {
        source = source.with_family(name, FontCategory::SansSerif, Some(TestFont::sans(name).to_ttf()));
    }

    let builder = CatalogBuilder::new(source, config.clone());
    builder.run().await.unwrap();

    // the checkpoint appears after the second success and is gone at the end
    let seen = builder.source().checkpoint_seen.lock().unwrap().clone();
    assert_eq!(seen, vec![false, false, true, true]);
    assert!(!config.checkpoint_path.exists());
}

#[tokio::test]
async fn test_resume_skips_checkpointed_families() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());

    let earlier = FakeSource::new(&config.checkpoint_path)
        .with_family("One", FontCategory::SansSerif, Some(TestFont::sans("One").to_ttf()));
    let first_run = CatalogBuilder::new(earlier, config.clone()).run().await.unwrap();
    let one = ReferenceCatalog::load(&config.output_path).unwrap().records()[0].clone();
    assert_eq!(first_run.processed, 1);

    Checkpoint { processed: vec!["One".to_string()], records: vec![one.clone()], failed: 1 }
        .save(&config.checkpoint_path)
        .unwrap();

    let source = FakeSource::new(&config.checkpoint_path)
        .with_family("One", FontCategory::SansSerif, Some(TestFont::sans("One").to_ttf()))
        .with_family("Two", FontCategory::Serif, Some(TestFont::sans("Two").to_ttf()));
    let builder = CatalogBuilder::new(source, config.clone());
    let report = builder.run().await.unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.processed, 1);
    assert_eq!(report.total_records, 2);
    assert_eq!(builder.source().downloads(), vec!["https://fonts.test/Two.ttf".to_string()]);

    let catalog = ReferenceCatalog::load(&config.output_path).unwrap();
    assert_eq!(catalog.records()[0], one);
    assert_eq!(catalog.records()[1].family, "Two");
}

#[tokio::test]
async fn test_limit_and_corrupt_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    std::fs::write(&config.checkpoint_path, b"{ half a checkpoint").unwrap();

    let source = FakeSource::new(&config.checkpoint_path)
        .with_family("One", FontCategory::SansSerif, Some(TestFont::sans("One").to_ttf()))
        .with_family("Two", FontCategory::SansSerif, Some(TestFont::sans("Two").to_ttf()))
        .with_family("Three", FontCategory::SansSerif, Some(TestFont::sans("Three").to_ttf()));
    let report = CatalogBuilder::new(source, config.clone())
        .with_limit(Some(2))
        .run()
        .await
        .unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.total_records, 2);
    assert!(!config.checkpoint_path.exists());
}
