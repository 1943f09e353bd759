//! Renderer configuration.
//!
//! A configuration can be built in code or loaded from a JSON file. It is
//! validated up front so an invalid boundary box or viewport never reaches
//! the projection.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Geographic rectangle, in degrees, mapped onto the full viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundaries {
    pub north: f64,
    pub south: f64,
    pub west: f64,
    pub east: f64,
}

impl Boundaries {
    pub fn new(north: f64, south: f64, west: f64, east: f64) -> Self {
        Self {
            north,
            south,
            west,
            east,
        }
    }

    /// Checks that all edges are finite and the box is not inverted or empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("north", self.north),
            ("south", self.south),
            ("west", self.west),
            ("east", self.east),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteValue { field });
            }
        }
        if self.north <= self.south {
            return Err(ConfigError::InvertedLatitude {
                north: self.north,
                south: self.south,
            });
        }
        if self.east <= self.west {
            return Err(ConfigError::InvertedLongitude {
                east: self.east,
                west: self.west,
            });
        }
        Ok(())
    }

    /// Longitude span in degrees.
    pub fn width_deg(&self) -> f64 {
        self.east - self.west
    }

    /// Latitude span in degrees.
    pub fn height_deg(&self) -> f64 {
        self.north - self.south
    }
}

/// How polygon rings are turned into a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolygonMode {
    /// One path with a closed sub-path per ring, filled with the even-odd
    /// rule so holes stay empty.
    #[default]
    EvenOdd,
    /// One closed shape whose point list is every ring concatenated in
    /// order. Holes are not cut out.
    Concatenated,
}

/// Options that shape how geometries are drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Multiplier applied to the longitude scale to get the latitude scale.
    pub aspect_adjustment: f64,
    /// Radius of point markers in pixels.
    pub point_radius: f64,
    pub polygon_mode: PolygonMode,
    /// When false, polygons are always drawn regardless of whether any
    /// vertex falls inside the viewport.
    pub cull_polygons: bool,
    /// Maximum nesting of collections inside collections.
    pub max_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            aspect_adjustment: 1.0,
            point_radius: 2.0,
            polygon_mode: PolygonMode::EvenOdd,
            cull_polygons: true,
            max_depth: 32,
        }
    }
}

impl RenderOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.aspect_adjustment.is_finite() {
            return Err(ConfigError::NonFiniteValue {
                field: "aspect_adjustment",
            });
        }
        if self.aspect_adjustment <= 0.0 {
            return Err(ConfigError::NonPositiveAspect(self.aspect_adjustment));
        }
        if !self.point_radius.is_finite() {
            return Err(ConfigError::NonFiniteValue {
                field: "point_radius",
            });
        }
        if self.point_radius <= 0.0 {
            return Err(ConfigError::NonPositiveRadius(self.point_radius));
        }
        Ok(())
    }
}

/// Everything needed to construct a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Viewport width in pixels. The height is derived from the boundaries.
    pub width: f64,
    pub boundaries: Boundaries,
    #[serde(default)]
    pub options: RenderOptions,
}

impl RendererConfig {
    pub fn new(width: f64, boundaries: Boundaries) -> Self {
        Self {
            width,
            boundaries,
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(ConfigError::NonPositiveWidth(self.width));
        }
        self.boundaries.validate()?;
        self.options.validate()
    }

    /// Parses and validates a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded renderer config from {}", path.display());
        Ok(config)
    }
}
