//! Parsing of KML `<coordinates>` text.
//!
//! KML writes one vertex per whitespace-separated token, each token being
//! `lon,lat[,alt]`. Longitude comes first.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::mission::Vertex;

/// How malformed coordinate tokens are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatePolicy {
    /// Skip malformed tokens and keep going.
    #[default]
    Lenient,
    /// Fail on the first malformed token.
    Strict,
}

/// Why a single token could not become a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenFault {
    /// Fewer than two comma-separated fields.
    TooFewFields,
    /// A field is not a finite number.
    NotANumber,
}

impl std::fmt::Display for TokenFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewFields => write!(f, "fewer than two fields"),
            Self::NotANumber => write!(f, "non-numeric field"),
        }
    }
}

/// Parse a coordinates blob into vertices, in source order.
///
/// Empty or all-whitespace input yields an empty vector; the caller decides
/// whether that is an error.
///
/// # Errors
///
/// Only under [`CoordinatePolicy::Strict`]: returns
/// [`Error::MalformedCoordinate`] for the first token that cannot be parsed.
pub fn parse_coordinates(text: &str, policy: CoordinatePolicy) -> Result<Vec<Vertex>> {
    let mut vertices = Vec::new();
    for token in text.split_whitespace() {
        match parse_token(token) {
            Ok(vertex) => vertices.push(vertex),
            Err(fault) => match policy {
                CoordinatePolicy::Lenient => {
                    warn!("Skipping coordinate token '{}': {}", token, fault);
                }
                CoordinatePolicy::Strict => {
                    return Err(Error::MalformedCoordinate {
                        token: token.to_string(),
                    });
                }
            },
        }
    }
    Ok(vertices)
}

fn parse_token(token: &str) -> std::result::Result<Vertex, TokenFault> {
    let mut fields = token.split(',');
    let (Some(lon), Some(lat)) = (fields.next(), fields.next()) else {
        return Err(TokenFault::TooFewFields);
    };

    let lon = parse_field(lon)?;
    let lat = parse_field(lat)?;
    let alt = match fields.next() {
        Some(alt) if !alt.is_empty() => parse_field(alt)?,
        _ => 0.0,
    };

    Ok(Vertex { lat, lon, alt })
}

fn parse_field(field: &str) -> std::result::Result<f64, TokenFault> {
    match field.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(TokenFault::NotANumber),
    }
}
