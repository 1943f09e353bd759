//! Geographic layer system.
//!
//! This module turns GeoJSON documents into layers of vector shapes:
//! coordinates are projected onto the viewport, each geometry becomes its
//! matching shape, and the shapes of one document live in one named group.

mod document;
mod layer;
mod projection;
mod properties;
mod renderer;

pub use document::{Decoded, Feature, GeoNode, Geometry, IntoDocument, Line};
pub use layer::{GeoLayer, GeoLayerSet};
pub use projection::{MapProjection, ScreenPos};
pub use properties::{style_tags, Properties, PropertyValue, PROPERTIES_ATTRIBUTE};
pub use renderer::{
    path_data, point_list, render_geometry, render_node, GeometryCompiler, LayerCanvas,
    LayerRenderer, RenderReport,
};
