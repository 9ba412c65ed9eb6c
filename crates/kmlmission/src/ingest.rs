//! Mission ingestion workflow.
//!
//! An upload moves through
//! `received → validated-extension → content-read → decoded → persisted`,
//! failing out of any step before `persisted`. The staged upload file is
//! owned by a [`StagedUpload`] guard from the moment it is received, so it is
//! deleted exactly once whichever way the upload ends.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::IngestConfig;
use crate::error::{Error, Result};
use crate::kml::KmlDecoder;
use crate::mission::{Mission, NewMission, Polygon};
use crate::storage::MissionStore;

/// Name given to missions uploaded without one.
pub const DEFAULT_MISSION_NAME: &str = "Imported KML Mission";

/// Required file extension, compared case-insensitively.
const KML_EXTENSION: &str = ".kml";

/// A file received from a client and staged on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// The file name the client declared.
    pub original_name: String,
    /// Where the content was staged. The workflow deletes this file.
    pub path: PathBuf,
}

impl UploadedFile {
    /// Describe an already-staged upload.
    #[must_use]
    pub fn new(original_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            original_name: original_name.into(),
            path: path.into(),
        }
    }
}

/// Owns a staged upload file and deletes it when released or dropped.
#[derive(Debug)]
pub struct StagedUpload {
    path: Option<PathBuf>,
}

impl StagedUpload {
    /// Take ownership of the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Path of the staged file, or `None` once released.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the staged content.
    ///
    /// # Errors
    ///
    /// Returns an error if the file was already released or cannot be read.
    pub fn read(&self) -> Result<Vec<u8>> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| Error::internal("staged upload already released"))?;
        Ok(std::fs::read(path)?)
    }

    /// Stop owning the file and hand back its path without deleting it.
    #[must_use]
    pub fn keep(mut self) -> Option<PathBuf> {
        self.path.take()
    }

    /// Delete the staged file now. Later calls, and the drop, do nothing.
    pub fn release(&mut self) {
        if let Some(path) = self.path.take() {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Released staged upload {}", path.display()),
                Err(e) => warn!("Failed to remove staged upload {}: {}", path.display(), e),
            }
        }
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        self.release();
    }
}

/// Copy a local file into `staging_dir` under a fresh timestamped name.
///
/// The staged copy keeps the source extension; the returned
/// [`UploadedFile`] carries the source file name as its declared name.
///
/// # Errors
///
/// Returns an error if the staging directory cannot be created or the copy
/// fails. A failed copy leaves nothing in `staging_dir`.
pub fn stage_upload(source: &Path, staging_dir: &Path) -> Result<UploadedFile> {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);

    let original_name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidFileType {
            filename: source.display().to_string(),
        })?;

    std::fs::create_dir_all(staging_dir).map_err(|e| Error::DirectoryCreate {
        path: staging_dir.to_path_buf(),
        source: e,
    })?;

    let extension = source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let staged_name = format!(
        "{}-{}-{}{}",
        Utc::now().timestamp_millis(),
        std::process::id(),
        SEQUENCE.fetch_add(1, Ordering::Relaxed),
        extension
    );
    let path = staging_dir.join(staged_name);

    // A copy that fails midway must not leave a partial file behind
    let staged = StagedUpload::new(&path);
    std::fs::copy(source, &path)?;
    debug!("Staged {} at {}", source.display(), path.display());
    let path = staged
        .keep()
        .ok_or_else(|| Error::internal("staged upload released during copy"))?;
    Ok(UploadedFile::new(original_name, path))
}

/// Check whether a declared file name ends in `.kml`, ignoring case.
#[must_use]
pub fn has_kml_extension(filename: &str) -> bool {
    filename.to_lowercase().ends_with(KML_EXTENSION)
}

/// Response status marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// The request succeeded.
    Ok,
    /// The request failed.
    Error,
}

/// Successful upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResponse {
    /// Identifier assigned by the store.
    pub mission_id: i64,
    /// Always [`ResponseStatus::Ok`].
    pub status: ResponseStatus,
    /// The decoded boundary.
    pub polygon: Polygon,
}

impl From<Mission> for UploadResponse {
    fn from(mission: Mission) -> Self {
        Self {
            mission_id: mission.id,
            status: ResponseStatus::Ok,
            polygon: mission.polygon,
        }
    }
}

/// Successful mission lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionResponse {
    /// Mission identifier.
    pub mission_id: i64,
    /// Stored boundary.
    pub polygon: Polygon,
}

impl From<Mission> for MissionResponse {
    fn from(mission: Mission) -> Self {
        Self {
            mission_id: mission.id,
            polygon: mission.polygon,
        }
    }
}

/// Failed upload or lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    /// Always [`ResponseStatus::Error`].
    pub status: ResponseStatus,
    /// User-facing message.
    pub message: String,
    /// HTTP-style status code.
    #[serde(skip)]
    pub status_code: u16,
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: err.user_message(),
            status_code: err.status_code(),
        }
    }
}

/// Runs uploads and lookups against a [`MissionStore`].
#[derive(Debug)]
pub struct MissionIngestor<S> {
    store: S,
    decoder: KmlDecoder,
    default_name: String,
}

impl<S: MissionStore> MissionIngestor<S> {
    /// Create an ingestor with the lenient decoder and default mission name.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            decoder: KmlDecoder::new(),
            default_name: DEFAULT_MISSION_NAME.to_string(),
        }
    }

    /// Create an ingestor configured from the `[ingest]` section.
    #[must_use]
    pub fn from_config(store: S, config: &IngestConfig) -> Self {
        Self {
            store,
            decoder: KmlDecoder::with_policy(config.coordinate_policy),
            default_name: config.default_mission_name.clone(),
        }
    }

    /// Replace the decoder.
    #[must_use]
    pub fn with_decoder(mut self, decoder: KmlDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Replace the name used when an upload has none.
    #[must_use]
    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ingest an uploaded KML file as a new mission.
    ///
    /// A blank or absent `name` falls back to the default mission name. The
    /// staged file is deleted before this returns, on success or failure.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingUpload`] if `file` is `None`.
    /// - [`Error::InvalidFileType`] if the declared name is not `*.kml`.
    /// - Decode errors from [`KmlDecoder::decode`].
    /// - Store errors from [`MissionStore::create`].
    pub fn upload(&self, file: Option<UploadedFile>, name: Option<&str>) -> Result<UploadResponse> {
        let Some(file) = file else {
            warn!("Upload rejected: no file attached");
            return Err(Error::MissingUpload);
        };
        let mut staged = StagedUpload::new(file.path);
        debug!("Upload received: {}", file.original_name);

        if !has_kml_extension(&file.original_name) {
            warn!("Upload rejected: '{}' is not a KML file", file.original_name);
            return Err(Error::InvalidFileType {
                filename: file.original_name,
            });
        }
        debug!("Extension validated for {}", file.original_name);

        let content = staged.read()?;
        staged.release();
        debug!("Read {} bytes from {}", content.len(), file.original_name);

        let polygon = self.decoder.decode(&content).map_err(|e| {
            warn!("Upload rejected: {} ({})", file.original_name, e);
            e
        })?;
        debug!("Decoded polygon with {} vertices", polygon.len());

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(self.default_name.as_str());
        let mission = self
            .store
            .create(NewMission::new(name, polygon).with_source(&content))?;
        debug!("Persisted mission {}", mission.id);

        Ok(UploadResponse::from(mission))
    }

    /// Fetch a stored mission's boundary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissionNotFound`] if no mission has this identifier,
    /// or a store error if the lookup fails.
    pub fn get_mission(&self, id: i64) -> Result<MissionResponse> {
        self.store
            .find_by_id(id)?
            .map(MissionResponse::from)
            .ok_or(Error::MissionNotFound { id })
    }
}
