//! Offline, resumable builder for the reference catalog.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use font_acquisition::{CatalogEntry, CatalogSource};
use font_core::{BuilderConfig, FontError, FontRecord, FontResult};
use font_web_db::{save_records, write_atomic};

/// Progress persisted between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Families whose record is already in `records`
    pub processed: Vec<String>,
    pub records: Vec<FontRecord>,
    /// Failures so far, across runs
    pub failed: usize,
}

impl Checkpoint {
    /// `None` when there is no checkpoint file
    pub fn load(path: &Path) -> FontResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(path)?;
        Ok(Some(serde_json::from_slice(&data)?))
    }

    pub fn save(&self, path: &Path) -> FontResult<()> {
        let data = serde_json::to_vec(self)?;
        write_atomic(path, &data)
    }
}

/// Outcome of one builder run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Families extracted during this run
    pub processed: usize,
    /// Families already done by an earlier run
    pub skipped: usize,
    /// Download or decode failures during this run
    pub failed: usize,
    /// Records in the written catalog
    pub total_records: usize,
    pub output: PathBuf,
}

pub struct CatalogBuilder<S> {
    source: S,
    config: BuilderConfig,
    limit: Option<usize>,
    show_progress: bool,
}

impl<S: CatalogSource> CatalogBuilder<S> {
    pub fn new(source: S, config: BuilderConfig) -> Self {
        Self { source, config, limit: None, show_progress: false }
    }

    /// Only consider the first `limit` families of the listing
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Process every listed family not yet in the checkpoint, then write the
    /// final catalog and remove the checkpoint.
    ///
    /// Per-family download or decode failures are counted and skipped; only a
    /// failed listing or an I/O error on the output aborts the run.
    pub async fn run(&self) -> FontResult<BuildReport> {
        let checkpoint_path = self.config.checkpoint_path.as_path();
        let mut checkpoint = match Checkpoint::load(checkpoint_path) {
            Ok(Some(checkpoint)) => {
                info!(
                    done = checkpoint.processed.len(),
                    path = %checkpoint_path.display(),
                    "resuming from checkpoint"
                );
                checkpoint
            }
            Ok(None) => Checkpoint::default(),
            Err(e) => {
                warn!(error = %e, "unreadable checkpoint, starting over");
                Checkpoint::default()
            }
        };

        let mut entries = self.source.list_families().await?;
        if let Some(limit) = self.limit {
            entries.truncate(limit);
        }
        info!(source = self.source.name(), families = entries.len(), "building reference catalog");

        let mut done: HashSet<String> = checkpoint.processed.iter().cloned().collect();
        let delay = Duration::from_millis(self.config.download_delay_ms);
        let checkpoint_every = self.config.checkpoint_every.max(1);
        let progress = self.progress_bar(entries.len() as u64);

        let mut report = BuildReport {
            processed: 0,
            skipped: 0,
            failed: 0,
            total_records: 0,
            output: self.config.output_path.clone(),
        };
        let mut downloads = 0usize;

        for entry in &entries {
            progress.inc(1);
            if done.contains(&entry.family) {
                report.skipped += 1;
                continue;
            }

            if downloads > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            downloads += 1;
            progress.set_message(entry.family.clone());

            match self.build_record(entry).await {
                Ok(record) => {
                    done.insert(entry.family.clone());
                    checkpoint.processed.push(entry.family.clone());
                    checkpoint.records.push(record);
                    report.processed += 1;

                    if report.processed % checkpoint_every == 0 {
                        checkpoint.save(checkpoint_path)?;
                        debug!(done = checkpoint.processed.len(), "checkpoint written");
                    }
                }
                Err(e) => {
                    warn!(family = %entry.family, error = %e, "skipping family");
                    checkpoint.failed += 1;
                    report.failed += 1;
                }
            }
        }
        progress.finish_and_clear();

        save_records(&self.config.output_path, &checkpoint.records)?;
        if checkpoint_path.exists() {
            fs::remove_file(checkpoint_path)?;
        }

        report.total_records = checkpoint.records.len();
        info!(
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed,
            records = report.total_records,
            output = %report.output.display(),
            "reference catalog written"
        );
        Ok(report)
    }

    async fn build_record(&self, entry: &CatalogEntry) -> FontResult<FontRecord> {
        let bytes = self.source.download(&entry.file_url).await?;
        let font = font_parser::decode(&bytes)
            .ok_or_else(|| FontError::Parse(format!("{} did not decode", entry.file_url)))?;
        let view = font.view()?;

        Ok(FontRecord {
            family: entry.family.clone(),
            category: entry.category,
            features: font_similarity::extract(&view),
        })
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}
