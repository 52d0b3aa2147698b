//! Content-hash index of local checkpoint files.
//!
//! Jobs name their checkpoint by SHA-256. [`ChecksumIndex`] maps those
//! hashes to paths under the checkpoint directory, relative and with
//! `/` separators, which is the name ComfyUI expects.
//!
//! The index is persisted as `{"hashes": [[hash, relative_path], ...]}`.
//! A file already present (by relative path) is never hashed again, and
//! the file is rewritten after every new entry so an interrupted run
//! keeps what it already hashed.
//!
//! A checkpoint that cannot be read is logged and skipped; the rest of
//! the tree is still indexed. Symlinked directories are not followed.
//!
//! Two files with the same content hash are not deduplicated:
//! [`ChecksumIndex::resolve`] returns the first entry in index order,
//! which is the order files were first indexed.

use std::fs;
use std::path::{Path, PathBuf};

use cfa_core::hashing::sha256_file;
use serde::{Deserialize, Serialize};

/// File extension of model weights.
pub const CHECKPOINT_EXTENSION: &str = "safetensors";

/// Suffix replacing `.safetensors` for the metadata sidecar.
const SIDECAR_SUFFIX: &str = ".metadata.json";

/// One indexed checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct ChecksumEntry {
    pub hash: String,
    /// Path relative to the checkpoint root, `/`-separated.
    pub local_name: String,
}

impl From<(String, String)> for ChecksumEntry {
    fn from((hash, local_name): (String, String)) -> Self {
        Self { hash, local_name }
    }
}

impl From<ChecksumEntry> for (String, String) {
    fn from(entry: ChecksumEntry) -> Self {
        (entry.hash, entry.local_name)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    #[serde(default)]
    hashes: Vec<ChecksumEntry>,
}

/// What an [`ChecksumIndex::ensure_indexed`] pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Files hashed from their contents.
    pub hashed: usize,
    /// Files whose hash came from a metadata sidecar.
    pub from_sidecar: usize,
    /// Files already in the index.
    pub reused: usize,
    /// Files that could not be read and were left out.
    pub skipped: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ChecksumIndexError {
    #[error("Checkpoint directory {} does not exist", .0.display())]
    MissingRoot(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode checksum index: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Hash to checkpoint-name index backed by a JSON file.
#[derive(Debug, Clone)]
pub struct ChecksumIndex {
    path: PathBuf,
    entries: Vec<ChecksumEntry>,
}

impl ChecksumIndex {
    /// Load the index persisted at `path`.
    ///
    /// A missing or unreadable file yields an empty index; it is
    /// rewritten on the next new entry.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(raw) => match serde_json::from_slice::<IndexFile>(&raw) {
                Ok(file) => file.hashes,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Checksum index is malformed, starting from empty",
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Checksum index unreadable, starting from empty",
                );
                Vec::new()
            }
        };

        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[ChecksumEntry] {
        &self.entries
    }

    /// Every indexed hash, in index order (what the worker advertises).
    pub fn hashes(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.hash.clone()).collect()
    }

    /// Local checkpoint name for `hash`; first match wins.
    pub fn resolve(&self, hash: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.hash.eq_ignore_ascii_case(hash))
            .map(|e| e.local_name.as_str())
    }

    /// Index every `*.safetensors` file under `root` not already present.
    ///
    /// Blocking; large files take a while to hash. Run it off the async
    /// executor.
    pub fn ensure_indexed(&mut self, root: &Path) -> Result<IndexReport, ChecksumIndexError> {
        if !root.is_dir() {
            return Err(ChecksumIndexError::MissingRoot(root.to_path_buf()));
        }

        let mut files = Vec::new();
        collect_checkpoints(root, &mut files);
        files.sort();

        let mut report = IndexReport::default();
        for file in files {
            let local_name = relative_name(root, &file);
            if self.entries.iter().any(|e| e.local_name == local_name) {
                report.reused += 1;
                continue;
            }

            let hash = match sidecar_hash(&file) {
                Some(hash) => {
                    report.from_sidecar += 1;
                    hash
                }
                None => {
                    tracing::info!(checkpoint = %local_name, "Hashing checkpoint");
                    match sha256_file(&file) {
                        Ok(hash) => {
                            report.hashed += 1;
                            hash
                        }
                        Err(e) => {
                            tracing::warn!(
                                checkpoint = %local_name,
                                error = %e,
                                "Cannot read checkpoint, skipping",
                            );
                            report.skipped += 1;
                            continue;
                        }
                    }
                }
            };

            tracing::debug!(checkpoint = %local_name, hash = %hash, "Indexed checkpoint");
            self.entries.push(ChecksumEntry { hash, local_name });
            self.persist()?;
        }

        tracing::info!(
            root = %root.display(),
            total = self.entries.len(),
            hashed = report.hashed,
            from_sidecar = report.from_sidecar,
            reused = report.reused,
            skipped = report.skipped,
            "Checkpoint index up to date",
        );
        Ok(report)
    }

    /// Write the index through a temp file and rename.
    fn persist(&self) -> Result<(), ChecksumIndexError> {
        let body = serde_json::to_vec_pretty(&IndexFile {
            hashes: self.entries.clone(),
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ChecksumIndexError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|source| ChecksumIndexError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| ChecksumIndexError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// `file_type()` does not follow symlinks, so a link back up the tree
/// cannot recurse forever. Symlinked checkpoint files are still collected.
fn collect_checkpoints(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Cannot list directory, skipping");
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Cannot read directory entry");
                continue;
            }
        };
        let path = entry.path();
        match entry.file_type() {
            Ok(kind) if kind.is_dir() => collect_checkpoints(&path, out),
            Ok(_) if path.extension().and_then(|e| e.to_str()) == Some(CHECKPOINT_EXTENSION) => {
                out.push(path)
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot stat entry");
            }
        }
    }
}

/// `root/pony/model.safetensors` -> `pony/model.safetensors`.
fn relative_name(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// The `sha256` declared by `<name>.metadata.json` next to `file`, if any.
fn sidecar_hash(file: &Path) -> Option<String> {
    let name = file.file_name()?.to_str()?;
    let stem = name.strip_suffix(&format!(".{CHECKPOINT_EXTENSION}"))?;
    let sidecar = file.with_file_name(format!("{stem}{SIDECAR_SUFFIX}"));

    let raw = fs::read(&sidecar).ok()?;
    match serde_json::from_slice::<serde_json::Value>(&raw) {
        Ok(meta) => meta
            .get("sha256")
            .and_then(|v| v.as_str())
            .filter(|h| !h.is_empty())
            .map(str::to_string),
        Err(e) => {
            tracing::warn!(sidecar = %sidecar.display(), error = %e, "Ignoring malformed metadata sidecar");
            None
        }
    }
}
