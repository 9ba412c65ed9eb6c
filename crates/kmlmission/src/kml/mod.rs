//! KML decoding.
//!
//! Turns raw KML bytes into a validated [`Polygon`]:
//!
//! 1. **Tree**: the document is parsed into a generic [`Node`] tree.
//! 2. **Locate**: the first `Polygon/outerBoundaryIs/LinearRing/coordinates`
//!    text is found, at any depth.
//! 3. **Parse**: the text is split into `lon,lat[,alt]` vertices.
//!
//! A missing boundary and a boundary with no usable vertices both end in
//! [`Error::PolygonNotFound`].
//!
//! # Example
//!
//! ```
//! use kmlmission::kml::KmlDecoder;
//!
//! let kml = br#"<kml><Placemark><Polygon><outerBoundaryIs><LinearRing>
//!     <coordinates>77.09027,28.98544,150.5 77.091,28.986</coordinates>
//! </LinearRing></outerBoundaryIs></Polygon></Placemark></kml>"#;
//!
//! let polygon = KmlDecoder::new().decode(kml).unwrap();
//! assert_eq!(polygon.len(), 2);
//! assert_eq!(polygon.vertices()[0].lon, 77.09027);
//! ```

mod coordinates;
mod locator;
mod tree;

pub use coordinates::{parse_coordinates, CoordinatePolicy};
pub use locator::locate_outer_boundary;
pub use tree::{parse_tree, Node, MAX_DEPTH};

use tracing::debug;

use crate::error::{Error, Result};
use crate::mission::Polygon;

/// Decoder for KML boundary documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct KmlDecoder {
    policy: CoordinatePolicy,
}

impl KmlDecoder {
    /// Create a decoder with the lenient coordinate policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with the given coordinate policy.
    #[must_use]
    pub fn with_policy(policy: CoordinatePolicy) -> Self {
        Self { policy }
    }

    /// The coordinate policy in use.
    #[must_use]
    pub fn policy(&self) -> CoordinatePolicy {
        self.policy
    }

    /// Decode raw document bytes into a polygon.
    ///
    /// # Errors
    ///
    /// - [`Error::UnparsableDocument`] if the bytes are not UTF-8 or not
    ///   well-formed XML.
    /// - [`Error::PolygonNotFound`] if no outer boundary exists or it yields
    ///   no vertices.
    /// - [`Error::MalformedCoordinate`] under the strict policy.
    pub fn decode(&self, document: &[u8]) -> Result<Polygon> {
        let text = std::str::from_utf8(document)
            .map_err(|e| Error::unparsable(format!("document is not valid UTF-8: {e}")))?;
        self.decode_str(text)
    }

    /// Decode document text into a polygon.
    ///
    /// # Errors
    ///
    /// Same as [`KmlDecoder::decode`].
    pub fn decode_str(&self, text: &str) -> Result<Polygon> {
        let tree = parse_tree(text)?;

        let Some(coordinates) = locate_outer_boundary(&tree) else {
            debug!("No polygon outer boundary in document");
            return Err(Error::PolygonNotFound);
        };

        let vertices = parse_coordinates(coordinates, self.policy)?;
        debug!("Decoded {} vertices", vertices.len());
        Polygon::new(vertices)
    }
}
