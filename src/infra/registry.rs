// ============================================================
// Layer 6 — Filesystem Model Registry
// ============================================================
// Persists trained bundles, one directory each:
//
//   models/
//     model_20261018_153000_123456/
//       classifier.json
//       scaler.json
//       metadata/metadata.json
//     model_20261018_153000_123456_1/   ← same-microsecond save
//     default/                          ← pre-seeded fallback
//     .tmp-model_…                      ← save in progress
//
// Visibility: a save writes everything into a dot-prefixed
// temporary directory, then renames it into place. Readers
// skip dot-prefixed entries, so a bundle appears all at once
// or not at all. Concurrent saves never share a directory:
// the rename fails if the target exists, and the save retries
// with the next numeric suffix.
//
// Why write metadata last?
//   `list` treats metadata/metadata.json as the marker of a
//   finished bundle. Writing it last, inside the temporary
//   directory, means a crash mid-save leaves only a dot-
//   prefixed directory that every reader ignores.
//
// Why UTC identifiers?
//   `list` orders bundles by comparing ids as strings. That
//   only matches creation order when every id is stamped in
//   the same, monotonic clock.
//
// Reference: Rust Book §9 (Error Handling)
//            std::fs::rename, time crate documentation

use rand::Rng;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};
use time::{format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime};

use crate::data::scaler::ScalerState;
use crate::domain::bundle::{
    BundleDraft, BundleEntry, BundleId, BundleMetadata, EntryMetadata, LoadedBundle, SavedBundle,
};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::traits::ModelRegistry;
use crate::infra::config::AppConfig;
use crate::ml::model::BoostedEnsemble;

pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const SCALER_FILE:     &str = "scaler.json";
pub const METADATA_DIR:    &str = "metadata";
pub const METADATA_FILE:   &str = "metadata.json";

const MAX_NAME_ATTEMPTS: usize = 100;

pub struct FsModelRegistry {
    root:        PathBuf,
    default_dir: PathBuf,
}

impl FsModelRegistry {
    pub fn new(cfg: &AppConfig) -> Self {
        Self {
            root:        cfg.models_dir.clone(),
            default_dir: cfg.default_model_dir.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bundle_dir(&self, id: &BundleId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Read classifier + scaler (+ metadata when present) from `dir`.
    /// Returns `None` when either required artifact is missing.
    fn read_bundle(&self, dir: &Path, id: Option<BundleId>) -> PipelineResult<Option<LoadedBundle>> {
        let classifier_path = dir.join(CLASSIFIER_FILE);
        let scaler_path     = dir.join(SCALER_FILE);
        if !classifier_path.is_file() || !scaler_path.is_file() {
            return Ok(None);
        }

        let classifier: BoostedEnsemble = read_json(&classifier_path)?;
        classifier.validate()?;
        let scaler: ScalerState = read_json(&scaler_path)?;

        let metadata_path = dir.join(METADATA_DIR).join(METADATA_FILE);
        let feature_columns = if metadata_path.is_file() {
            match read_json::<BundleMetadata>(&metadata_path) {
                Ok(meta) => meta.feature_columns,
                Err(e) => {
                    tracing::warn!("Ignoring unreadable metadata for '{}': {}", dir.display(), e);
                    None
                }
            }
        } else {
            None
        };

        tracing::info!("Loaded bundle from '{}'", dir.display());
        Ok(Some(LoadedBundle { id, classifier, scaler, feature_columns }))
    }

    fn write_artifacts(&self, tmp: &Path, draft: &BundleDraft) -> PipelineResult<()> {
        fs::create_dir_all(tmp.join(METADATA_DIR))
            .map_err(|e| io_error("create bundle directory", tmp, e))?;
        write_json(&tmp.join(CLASSIFIER_FILE), &draft.classifier)?;
        write_json(&tmp.join(SCALER_FILE), &draft.scaler)?;
        Ok(())
    }

    /// Claim a final directory name and move `tmp` onto it.
    fn publish(
        &self,
        tmp:      &Path,
        base_id:  &str,
        draft:    &BundleDraft,
        stamp:    &Timestamp,
    ) -> PipelineResult<SavedBundle> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let id = if attempt == 0 {
                BundleId::new_unchecked(base_id)
            } else {
                BundleId::new_unchecked(format!("{base_id}_{attempt}"))
            };
            let final_dir = self.bundle_dir(&id);
            if final_dir.exists() {
                continue;
            }

            let model_path    = final_dir.join(CLASSIFIER_FILE);
            let scaler_path   = final_dir.join(SCALER_FILE);
            let metadata_path = final_dir.join(METADATA_DIR).join(METADATA_FILE);
            let metadata = BundleMetadata {
                model_name: draft
                    .name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| format!("lightgbm_model_{}", stamp.compact)),
                model_path:         model_path.display().to_string(),
                scaler_path:        scaler_path.display().to_string(),
                created_at:         stamp.compact.clone(),
                created_at_rfc3339: Some(stamp.rfc3339.clone()),
                feature_columns:    Some(draft.feature_columns.clone()),
                params:             draft.params.clone(),
                metrics:            draft.metrics.clone(),
                train_rows:         draft.train_rows,
                test_rows:          draft.test_rows,
            };
            // Metadata last: its presence marks a complete bundle
            write_json(&tmp.join(METADATA_DIR).join(METADATA_FILE), &metadata)?;

            match fs::rename(tmp, &final_dir) {
                Ok(()) => {
                    sync_dir(&self.root)?;
                    tracing::info!("Saved bundle '{}' to '{}'", id, final_dir.display());
                    return Ok(SavedBundle {
                        id,
                        model_path:    metadata.model_path.clone(),
                        scaler_path:   metadata.scaler_path.clone(),
                        metadata_path: metadata_path.display().to_string(),
                        metadata,
                    });
                }
                // Someone else claimed this name between the check and the rename
                Err(_) if final_dir.exists() => continue,
                Err(e) => return Err(io_error("publish bundle", &final_dir, e)),
            }
        }
        Err(PipelineError::Internal(format!(
            "no free bundle name after {MAX_NAME_ATTEMPTS} attempts for '{base_id}'"
        )))
    }
}

impl ModelRegistry for FsModelRegistry {
    fn save(&self, draft: &BundleDraft) -> PipelineResult<SavedBundle> {
        fs::create_dir_all(&self.root)
            .map_err(|e| io_error("create models directory", &self.root, e))?;

        let stamp   = Timestamp::now()?;
        let base_id = format!("model_{}_{}", stamp.compact, stamp.micros);
        let nonce: u32 = rand::thread_rng().gen();
        let tmp = self.root.join(format!(".tmp-{base_id}-{nonce:08x}"));

        let result = self
            .write_artifacts(&tmp, draft)
            .and_then(|_| self.publish(&tmp, &base_id, draft, &stamp));

        if result.is_err() && tmp.exists() {
            if let Err(e) = fs::remove_dir_all(&tmp) {
                tracing::warn!("Could not clean up '{}': {}", tmp.display(), e);
            }
        }
        result
    }

    fn list(&self) -> PipelineResult<Vec<BundleEntry>> {
        if !self.root.is_dir() {
            tracing::debug!("Models directory '{}' does not exist", self.root.display());
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|e| io_error("read", &self.root, e))? {
            let entry = entry.map_err(|e| io_error("read", &self.root, e))?;
            let Ok(name) = entry.file_name().into_string() else { continue };
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            if entry.path().join(METADATA_DIR).join(METADATA_FILE).is_file() {
                names.push(name);
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));

        let entries = names
            .into_iter()
            .map(|name| {
                let id  = BundleId::new_unchecked(name);
                let dir = self.bundle_dir(&id);
                let metadata = match read_json::<BundleMetadata>(&dir.join(METADATA_DIR).join(METADATA_FILE)) {
                    Ok(meta) => EntryMetadata::Loaded(Box::new(meta)),
                    Err(e) => {
                        tracing::warn!("Bundle '{}' has unreadable metadata: {}", id, e);
                        EntryMetadata::Error { error: format!("Failed to load metadata: {e}") }
                    }
                };
                BundleEntry {
                    model_path: dir.join(CLASSIFIER_FILE).display().to_string(),
                    model_name: id,
                    metadata,
                }
            })
            .collect();
        Ok(entries)
    }

    fn load(&self, id: &BundleId) -> PipelineResult<LoadedBundle> {
        let dir = self.bundle_dir(id);
        self.read_bundle(&dir, Some(id.clone()))?
            .ok_or_else(|| PipelineError::BundleNotFound(id.to_string()))
    }

    fn load_default(&self) -> PipelineResult<LoadedBundle> {
        self.read_bundle(&self.default_dir, None)?
            .ok_or(PipelineError::DefaultModelMissing)
    }
}

// ─── Timestamps ───────────────────────────────────────────────────────────────
struct Timestamp {
    /// `YYYYmmdd_HHMMSS`
    compact: String,
    /// Sub-second part, six digits
    micros:  String,
    rfc3339: String,
}

impl Timestamp {
    fn now() -> PipelineResult<Self> {
        // UTC only: local offsets repeat an hour at DST fall-back and
        // are unavailable to multi-threaded processes
        let now = OffsetDateTime::now_utc();
        let fmt_err = |e: time::error::Format| PipelineError::Internal(format!("timestamp: {e}"));
        Ok(Self {
            compact: now
                .format(format_description!("[year][month][day]_[hour][minute][second]"))
                .map_err(fmt_err)?,
            micros: now
                .format(format_description!("[subsecond digits:6]"))
                .map_err(fmt_err)?,
            rfc3339: now.format(&Rfc3339).map_err(fmt_err)?,
        })
    }
}

// ─── JSON helpers ─────────────────────────────────────────────────────────────
fn write_json<T: Serialize>(path: &Path, value: &T) -> PipelineResult<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| PipelineError::Internal(format!("serialise '{}': {e}", path.display())))?;
    let mut file = File::create(path).map_err(|e| io_error("create", path, e))?;
    file.write_all(&bytes).map_err(|e| io_error("write", path, e))?;
    file.sync_all().map_err(|e| io_error("sync", path, e))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> PipelineResult<T> {
    let bytes = fs::read(path).map_err(|e| io_error("read", path, e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| PipelineError::Internal(format!("parse '{}': {e}", path.display())))
}

/// Flush a directory entry so a completed rename survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> PipelineResult<()> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| io_error("sync", dir, e))
}

/// Directories cannot be opened for syncing here; rename is already durable.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> PipelineResult<()> {
    Ok(())
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> PipelineError {
    PipelineError::Internal(format!("{action} '{}': {err}", path.display()))
}
