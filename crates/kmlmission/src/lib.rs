//! `kmlmission` - Mission geometry ingestion from KML documents
//!
//! This library decodes the first polygon boundary of an uploaded KML
//! document into an ordered vertex list, persists it as a mission, and
//! serves it back by identifier.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod kml;
pub mod logging;
pub mod mission;
pub mod storage;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use ingest::{
    ErrorResponse, MissionIngestor, MissionResponse, StagedUpload, UploadResponse, UploadedFile,
};
pub use kml::{CoordinatePolicy, KmlDecoder};
pub use logging::init_logging;
pub use mission::{Mission, NewMission, Polygon, Vertex};
pub use storage::{MissionStore, MissionSummary, SqliteMissionStore};
