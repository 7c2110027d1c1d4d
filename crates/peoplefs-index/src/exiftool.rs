//! Person tag extraction through the `exiftool` binary.
//!
//! Files are handed to exiftool in batches and the JSON report is parsed into
//! [`FileTags`]. Only two fields matter:
//!
//! - `RegionPersonDisplayName` (Microsoft People Tagging)
//! - `RegionName` (MWG regions, written by Lightroom, digiKam, Picasa...)
//!
//! Either may hold a single name or a list of names.

use async_trait::async_trait;
use peoplefs_core::{ExtractError, FileTags, MetadataExtractor, TagValue};
use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

/// Files passed to a single exiftool invocation.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Exit status exiftool uses when some files produced no output.
const EXIT_PARTIAL: i32 = 1;

/// One entry of `exiftool -json` output.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExiftoolRecord {
    source_file: PathBuf,
    #[serde(default)]
    region_person_display_name: Option<TagValue>,
    #[serde(default)]
    region_name: Option<TagValue>,
}

impl From<ExiftoolRecord> for FileTags {
    fn from(record: ExiftoolRecord) -> Self {
        let people = record
            .region_person_display_name
            .into_iter()
            .chain(record.region_name)
            .flat_map(TagValue::into_names)
            .collect();
        FileTags::new(record.source_file, people)
    }
}

/// Extractor backed by the `exiftool` command line tool.
pub struct ExiftoolExtractor {
    program: PathBuf,
    batch_size: usize,
}

impl ExiftoolExtractor {
    /// Create an extractor running `program` (usually just `"exiftool"`).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set how many files go into one exiftool run.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn run_batch(&self, files: &[PathBuf]) -> Result<Vec<FileTags>, ExtractError> {
        let output = Command::new(&self.program)
            .args(["-json", "-charset", "filename=UTF8"])
            .args(["-RegionPersonDisplayName", "-RegionName", "--"])
            .args(files)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExtractError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("exiftool stderr: {}", stderr.trim());
        }

        match output.status.code() {
            Some(0) => parse_output(&output.stdout),
            Some(EXIT_PARTIAL) => {
                if output.stdout.iter().all(u8::is_ascii_whitespace) {
                    warn!(
                        "exiftool reported no metadata for a batch of {} files",
                        files.len()
                    );
                    Ok(Vec::new())
                } else {
                    parse_output(&output.stdout)
                }
            }
            _ => Err(ExtractError::Failed(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            ))),
        }
    }
}

#[async_trait]
impl MetadataExtractor for ExiftoolExtractor {
    fn name(&self) -> &str {
        "exiftool"
    }

    async fn extract(&self, files: &[PathBuf]) -> Result<Vec<FileTags>, ExtractError> {
        let mut tags = Vec::with_capacity(files.len());
        for batch in files.chunks(self.batch_size) {
            debug!("Running exiftool on {} files", batch.len());
            tags.extend(self.run_batch(batch).await?);
        }
        Ok(tags)
    }
}

/// Parse the JSON array printed by `exiftool -json`.
fn parse_output(stdout: &[u8]) -> Result<Vec<FileTags>, ExtractError> {
    let records: Vec<ExiftoolRecord> = serde_json::from_slice(stdout)?;
    Ok(records.into_iter().map(FileTags::from).collect())
}
