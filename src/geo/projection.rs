//! Map projection and coordinate transformation.
//!
//! Converts geographic coordinates (lon/lat) to pixel coordinates on the
//! drawing surface using a fixed linear scale derived from the boundary box
//! and the viewport width.

use crate::config::Boundaries;
use crate::error::ConfigError;
use geo_types::Coord;

/// A position on the drawing surface, in pixels. Y grows downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPos {
    pub x: f64,
    pub y: f64,
}

impl ScreenPos {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Linear projection from a boundary box onto a viewport.
///
/// All scale factors are computed once in [`MapProjection::new`] and never
/// change afterwards; a different viewport needs a new projection.
#[derive(Debug, Clone, PartialEq)]
pub struct MapProjection {
    bounds: Boundaries,
    /// Degrees of longitude covered by one pixel
    deg_per_px_lon: f64,
    /// Degrees of latitude covered by one pixel
    deg_per_px_lat: f64,
    width_px: f64,
    height_px: f64,
}

impl MapProjection {
    /// Creates a projection for a viewport `width_px` wide.
    ///
    /// The latitude scale is the longitude scale times `aspect_adjustment`,
    /// and the viewport height follows from it.
    pub fn new(
        width_px: f64,
        bounds: Boundaries,
        aspect_adjustment: f64,
    ) -> Result<Self, ConfigError> {
        if !width_px.is_finite() || width_px <= 0.0 {
            return Err(ConfigError::NonPositiveWidth(width_px));
        }
        if !aspect_adjustment.is_finite() {
            return Err(ConfigError::NonFiniteValue {
                field: "aspect_adjustment",
            });
        }
        if aspect_adjustment <= 0.0 {
            return Err(ConfigError::NonPositiveAspect(aspect_adjustment));
        }
        bounds.validate()?;

        let deg_per_px_lon = bounds.width_deg() / width_px;
        let deg_per_px_lat = deg_per_px_lon * aspect_adjustment;
        let height_px = bounds.height_deg() / deg_per_px_lat;
        let usable = |v: f64| v.is_finite() && v > 0.0;
        if !(usable(deg_per_px_lon) && usable(deg_per_px_lat) && usable(height_px)) {
            return Err(ConfigError::DegenerateScale {
                deg_per_px_lon,
                deg_per_px_lat,
                height_px,
            });
        }

        Ok(Self {
            bounds,
            deg_per_px_lon,
            deg_per_px_lat,
            width_px,
            height_px,
        })
    }

    /// Converts geographic coordinates (lon, lat) to a screen position.
    pub fn project(&self, coord: Coord<f64>) -> ScreenPos {
        let x = (coord.x - self.bounds.west) / self.deg_per_px_lon;
        // Flip Y since screen Y increases downward
        let y = self.height_px - (coord.y - self.bounds.south) / self.deg_per_px_lat;
        ScreenPos { x, y }
    }

    /// Projects every coordinate of a line or ring, preserving order.
    pub fn project_all(&self, coords: &[Coord<f64>]) -> Vec<ScreenPos> {
        coords.iter().map(|c| self.project(*c)).collect()
    }

    /// Checks if a screen position lies inside the viewport, edges included.
    pub fn is_visible(&self, pos: ScreenPos) -> bool {
        (0.0..=self.width_px).contains(&pos.x) && (0.0..=self.height_px).contains(&pos.y)
    }

    /// True if at least one of the points is inside the viewport.
    ///
    /// Shapes are drawn whole or not at all, so this is the only
    /// visibility test: there is no clipping.
    pub fn any_in_bounds(&self, points: &[ScreenPos]) -> bool {
        points.iter().any(|p| self.is_visible(*p))
    }

    pub fn bounds(&self) -> &Boundaries {
        &self.bounds
    }

    pub fn width(&self) -> f64 {
        self.width_px
    }

    /// Viewport height derived from the latitude span.
    pub fn height(&self) -> f64 {
        self.height_px
    }

    /// Returns (width, height) in pixels.
    pub fn viewport_size(&self) -> (f64, f64) {
        (self.width_px, self.height_px)
    }

    /// Degrees per pixel as (longitude, latitude).
    pub fn scale(&self) -> (f64, f64) {
        (self.deg_per_px_lon, self.deg_per_px_lat)
    }
}
