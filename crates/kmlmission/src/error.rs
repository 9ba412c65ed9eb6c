//! Error types for kmlmission.
//!
//! Every fallible operation in the crate returns [`Error`]. Callers that need
//! to build a response (status code, user-facing message) should go through
//! [`Error::kind`], which collapses the detailed variants onto the small set
//! of conditions the outside world is allowed to observe.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for kmlmission operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Upload Errors ===
    /// No file was attached to the upload.
    #[error("no file was uploaded")]
    MissingUpload,

    /// The uploaded file does not carry a `.kml` extension.
    #[error("file '{filename}' is not a KML document")]
    InvalidFileType {
        /// The name the client declared for the file.
        filename: String,
    },

    // === Decode Errors ===
    /// The document is not well-formed XML (or not valid UTF-8).
    #[error("unparsable document: {message}")]
    UnparsableDocument {
        /// Description of the parse failure.
        message: String,
    },

    /// No outer polygon boundary with at least one vertex was found.
    #[error("polygon not found in KML document")]
    PolygonNotFound,

    /// A coordinate token was rejected under the strict coordinate policy.
    #[error("malformed coordinate token '{token}'")]
    MalformedCoordinate {
        /// The offending token, verbatim.
        token: String,
    },

    // === Mission Errors ===
    /// No mission exists with the requested identifier.
    #[error("mission {id} not found")]
    MissionNotFound {
        /// The identifier that was looked up.
        id: i64,
    },

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A stored mission row could not be decoded.
    #[error("mission {id} has a corrupt record: {message}")]
    CorruptRecord {
        /// Identifier of the offending row.
        id: i64,
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for kmlmission operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        Self::UnparsableDocument {
            message: err.to_string(),
        }
    }
}

/// Externally observable failure classes.
///
/// Several [`Error`] variants share a kind; for example a malformed
/// coordinate token and a missing `Polygon` element both surface as
/// [`ErrorKind::PolygonNotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No file was attached.
    MissingUpload,
    /// Wrong file extension.
    InvalidFileType,
    /// Document is not well-formed.
    UnparsableDocument,
    /// No usable polygon boundary in the document.
    PolygonNotFound,
    /// Unknown mission identifier.
    MissionNotFound,
    /// Persistence or lookup backend failed.
    StoreFailure,
    /// Anything else.
    Unclassified,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingUpload => write!(f, "missing_upload"),
            Self::InvalidFileType => write!(f, "invalid_file_type"),
            Self::UnparsableDocument => write!(f, "unparsable_document"),
            Self::PolygonNotFound => write!(f, "polygon_not_found"),
            Self::MissionNotFound => write!(f, "mission_not_found"),
            Self::StoreFailure => write!(f, "store_failure"),
            Self::Unclassified => write!(f, "unclassified"),
        }
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an unparsable-document error.
    #[must_use]
    pub fn unparsable(message: impl Into<String>) -> Self {
        Self::UnparsableDocument {
            message: message.into(),
        }
    }

    /// Classify this error into its externally observable kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingUpload => ErrorKind::MissingUpload,
            Self::InvalidFileType { .. } => ErrorKind::InvalidFileType,
            Self::UnparsableDocument { .. } => ErrorKind::UnparsableDocument,
            Self::PolygonNotFound | Self::MalformedCoordinate { .. } => {
                ErrorKind::PolygonNotFound
            }
            Self::MissionNotFound { .. } => ErrorKind::MissionNotFound,
            Self::DatabaseOpen { .. }
            | Self::DatabaseQuery(_)
            | Self::DatabaseMigration { .. }
            | Self::CorruptRecord { .. } => ErrorKind::StoreFailure,
            Self::ConfigLoad(_)
            | Self::ConfigValidation { .. }
            | Self::Io(_)
            | Self::DirectoryCreate { .. }
            | Self::Json(_)
            | Self::Internal(_) => ErrorKind::Unclassified,
        }
    }

    /// Check if the caller's input is at fault (non-retriable).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MissingUpload
                | ErrorKind::InvalidFileType
                | ErrorKind::UnparsableDocument
                | ErrorKind::PolygonNotFound
                | ErrorKind::MissionNotFound
        )
    }

    /// HTTP-style status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::MissingUpload
            | ErrorKind::InvalidFileType
            | ErrorKind::UnparsableDocument
            | ErrorKind::PolygonNotFound => 400,
            ErrorKind::MissionNotFound => 404,
            ErrorKind::StoreFailure | ErrorKind::Unclassified => 500,
        }
    }

    /// Short message suitable for returning to a client.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::MissingUpload => "File missing".to_string(),
            ErrorKind::InvalidFileType => "File is not KML".to_string(),
            ErrorKind::UnparsableDocument => "Unparsable KML document".to_string(),
            ErrorKind::PolygonNotFound => "Polygon not found".to_string(),
            ErrorKind::MissionNotFound => "Mission not found".to_string(),
            ErrorKind::StoreFailure | ErrorKind::Unclassified => self.to_string(),
        }
    }
}
