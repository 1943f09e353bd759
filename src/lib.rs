#![warn(clippy::all)]

//! geolayers - renders GeoJSON into named, reorderable layers of vector shapes.
//!
//! Geographic coordinates are mapped onto a pixel viewport with a fixed
//! linear scale, and every geometry becomes a shape on a [`DrawingSurface`]
//! (an in-memory SVG tree by default).
//!
//! ```no_run
//! use geolayers::{Boundaries, GeoLayerSet, RendererConfig};
//!
//! let config = RendererConfig::new(800.0, Boundaries::new(50.0, 24.0, -125.0, -66.0));
//! let mut layers = GeoLayerSet::new(&config)?;
//! let states: serde_json::Value =
//!     serde_json::from_str(r#"{"type": "Point", "coordinates": [-98, 39]}"#)?;
//! layers.add_layer("states", &states).sort_layers_by(["states"]);
//! println!("{}", layers.surface().to_svg_string());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod geo;
pub mod surface;

pub use config::{Boundaries, PolygonMode, RenderOptions, RendererConfig};
pub use error::{ConfigError, GeometryError, LayerError, SkippedNode};
pub use geo::{GeoLayer, GeoLayerSet, GeoNode, GeometryCompiler, LayerRenderer, MapProjection};
pub use surface::{DrawingSurface, ShapeKind, SvgDocument};
