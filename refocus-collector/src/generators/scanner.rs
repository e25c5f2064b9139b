//! Generator directory scanner
//!
//! Reads every file of the generators directory, pairing each decoded
//! generator with its file modification time. Content and metadata of all
//! files are read concurrently; the result is only produced once every read
//! has completed.
//!
//! Failure policy:
//! - content that is not JSON is logged and the file is skipped
//! - JSON that is not a named object fails the whole scan
//! - a file gone between listing and reading is logged and skipped
//! - other I/O errors fail the whole scan

use super::Generator;
use crate::error::{CollectorError, ValidationError};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, warn};

/// A generator read from disk
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedGenerator {
    pub file: PathBuf,
    pub generator: Generator,
    pub modified: DateTime<Utc>,
}

impl ScannedGenerator {
    pub fn name(&self) -> &str {
        &self.generator.name
    }
}

/// Valid generators of one scan, unique by name, in directory-listing order
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    entries: Vec<ScannedGenerator>,
    by_name: HashMap<String, usize>,
}

impl ScanResult {
    /// Add an entry; a name seen before is replaced in place (last file wins)
    fn push(&mut self, entry: ScannedGenerator) {
        match self.by_name.get(entry.name()) {
            Some(&index) => {
                warn!(
                    "Generator '{}' defined in both {} and {}, keeping the latter",
                    entry.name(),
                    self.entries[index].file.display(),
                    entry.file.display()
                );
                self.entries[index] = entry;
            }
            None => {
                self.by_name.insert(entry.name().to_string(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ScannedGenerator> {
        self.by_name.get(name).map(|&index| &self.entries[index])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScannedGenerator> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ScannedGenerator> for ScanResult {
    fn from_iter<I: IntoIterator<Item = ScannedGenerator>>(iter: I) -> Self {
        let mut result = Self::default();
        for entry in iter {
            result.push(entry);
        }
        result
    }
}

/// Scan `dir` and decode every generator file in it.
///
/// A directory that does not exist yields an empty result, which makes every
/// stored generator a deletion on the next classification.
pub async fn scan_dir(dir: &Path) -> Result<ScanResult, CollectorError> {
    let files = match list_files(dir).await {
        Ok(files) => files,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Generators directory {} does not exist", dir.display());
            return Ok(ScanResult::default());
        }
        Err(e) => return Err(CollectorError::io(dir, e)),
    };

    debug!("Reading {} generator files from {}", files.len(), dir.display());

    let reads = join_all(files.into_iter().map(read_file)).await;

    let mut result = ScanResult::default();
    for read in reads {
        let Some((file, contents, modified)) = read? else {
            continue;
        };

        let value = match serde_json::from_slice::<Value>(&contents) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to parse generator file {}: {}", file.display(), e);
                continue;
            }
        };

        let generator = Generator::decode(value).map_err(|source| ValidationError::Generator {
            file: file.clone(),
            source,
        })?;

        result.push(ScannedGenerator {
            file,
            generator,
            modified,
        });
    }

    Ok(result)
}

async fn list_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            debug!("Skipping directory {}", entry.path().display());
            continue;
        }
        files.push(entry.path());
    }

    Ok(files)
}

/// `None` when the file vanished between listing and reading (atomic saves,
/// editor swap files, dangling links)
async fn read_file(
    file: PathBuf,
) -> Result<Option<(PathBuf, Vec<u8>, DateTime<Utc>)>, CollectorError> {
    let (contents, metadata) = match tokio::try_join!(fs::read(&file), fs::metadata(&file)) {
        Ok(read) => read,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Generator file {} disappeared, skipping", file.display());
            return Ok(None);
        }
        Err(e) => return Err(CollectorError::io(&file, e)),
    };

    let modified = metadata
        .modified()
        .map_err(|e| CollectorError::io(&file, e))?;

    Ok(Some((file, contents, DateTime::<Utc>::from(modified))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use serde_json::json;

    fn write(dir: &Path, file: &str, contents: &str) {
        std::fs::write(dir.join(file), contents).unwrap();
    }

    #[tokio::test]
    async fn test_scan_reads_all_generators() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "cpu.json", r#"{"name": "cpu", "interval": 30}"#);
        write(dir.path(), "mem.json", r#"{"name": "mem"}"#);
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let result = scan_dir(dir.path()).await.unwrap();

        assert_eq!(result.len(), 2);
        let cpu = result.get("cpu").unwrap();
        assert_eq!(cpu.generator.payload["interval"], json!(30));
        assert_eq!(cpu.file, dir.path().join("cpu.json"));
        assert!(cpu.modified <= Utc::now());
        assert!(result.contains("mem"));
    }

    #[tokio::test]
    async fn test_unparseable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.json", r#"{"name": "good"}"#);
        write(dir.path(), "broken.json", r#"{"name": "broken""#);

        let result = scan_dir(dir.path()).await.unwrap();

        assert_eq!(result.len(), 1);
        assert!(result.contains("good"));
    }

    #[tokio::test]
    async fn test_array_generator_fails_scan() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.json", r#"{"name": "good"}"#);
        write(dir.path(), "list.json", r#"[{"name": "a"}]"#);

        let err = scan_dir(dir.path()).await.unwrap_err();

        match err {
            CollectorError::Validation(ValidationError::Generator { file, source }) => {
                assert_eq!(file, dir.path().join("list.json"));
                assert_eq!(source, DecodeError::Array);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unnamed_generator_fails_scan() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "anon.json", r#"{"interval": 10}"#);

        let err = scan_dir(dir.path()).await.unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("anon.json"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_link_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "ok.json", r#"{"name": "ok"}"#);
        std::os::unix::fs::symlink(
            dir.path().join("moved-away.json"),
            dir.path().join(".ok.json.swp"),
        )
        .unwrap();

        let result = scan_dir(dir.path()).await.unwrap();

        assert_eq!(result.len(), 1);
        assert!(result.contains("ok"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let result = scan_dir(&dir.path().join("absent")).await.unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_duplicate_names_keep_last() {
        let now = Utc::now();
        let result: ScanResult = vec![
            ScannedGenerator {
                file: PathBuf::from("a.json"),
                generator: Generator::new("dup").with_field("v", json!(1)),
                modified: now,
            },
            ScannedGenerator {
                file: PathBuf::from("b.json"),
                generator: Generator::new("other"),
                modified: now,
            },
            ScannedGenerator {
                file: PathBuf::from("c.json"),
                generator: Generator::new("dup").with_field("v", json!(2)),
                modified: now,
            },
        ]
        .into_iter()
        .collect();

        assert_eq!(result.len(), 2);
        let dup = result.get("dup").unwrap();
        assert_eq!(dup.file, PathBuf::from("c.json"));
        assert_eq!(dup.generator.payload["v"], json!(2));
        let order: Vec<_> = result.iter().map(|e| e.name().to_string()).collect();
        assert_eq!(order, vec!["dup", "other"]);
    }
}
