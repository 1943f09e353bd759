//! Error types for configuration, GeoJSON decoding and layer operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a renderer. These are fatal: a renderer
/// is never constructed from an invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Viewport width was zero, negative or not a number.
    #[error("Viewport width must be positive, got {0}")]
    NonPositiveWidth(f64),

    /// A boundary or option value was NaN or infinite.
    #[error("Value for `{field}` must be finite")]
    NonFiniteValue { field: &'static str },

    /// North edge is not above the south edge.
    #[error("North boundary ({north}) must be greater than south boundary ({south})")]
    InvertedLatitude { north: f64, south: f64 },

    /// East edge is not right of the west edge.
    #[error("East boundary ({east}) must be greater than west boundary ({west})")]
    InvertedLongitude { east: f64, west: f64 },

    /// Aspect adjustment factor was zero or negative.
    #[error("Aspect adjustment must be positive, got {0}")]
    NonPositiveAspect(f64),

    /// Point marker radius was zero or negative.
    #[error("Point radius must be positive, got {0}")]
    NonPositiveRadius(f64),

    /// The inputs are valid on their own but the derived scale or
    /// viewport height is zero or not finite.
    #[error(
        "Degenerate projection: {deg_per_px_lon} deg/px longitude, \
         {deg_per_px_lat} deg/px latitude, height {height_px} px"
    )]
    DegenerateScale {
        deg_per_px_lon: f64,
        deg_per_px_lat: f64,
        height_px: f64,
    },

    /// No boundary box was supplied and none could be derived.
    #[error("No boundary box given and none could be derived from the data")]
    MissingBoundaries,

    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for a config.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors for a single GeoJSON node. The offending subtree is skipped and
/// its siblings keep rendering.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// The object has no string `type` member.
    #[error("missing `type` member")]
    MissingType,

    /// The `type` member names nothing we know how to draw.
    #[error("unrecognized type `{0}`")]
    UnknownType(String),

    /// A member required by the type is absent.
    #[error("missing `{0}` member")]
    MissingField(&'static str),

    /// A position had fewer than two elements.
    #[error("position needs at least 2 elements, got {arity}")]
    BadPosition { arity: usize },

    /// A position element was not a finite number.
    #[error("position element is not a finite number")]
    NonNumericCoordinate,

    /// Coordinates were not arrays where arrays were expected.
    #[error("expected {0}")]
    BadNesting(&'static str),

    /// Nesting went deeper than the configured limit.
    #[error("nesting exceeds depth limit of {limit}")]
    TooDeep { limit: usize },
}

/// A subtree that was left out of the rendering, with where and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedNode {
    /// Slash-separated path into the source document, e.g. `/features/1/geometry`.
    pub path: String,
    pub error: GeometryError,
}

impl std::fmt::Display for SkippedNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{}: {}", path, self.error)
    }
}

/// Errors for operations addressing a layer by handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    #[error("no layer with handle `{0}`")]
    UnknownLayer(String),
}
