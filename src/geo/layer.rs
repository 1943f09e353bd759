//! Geographic layer store.
//!
//! Each layer is a named group on the drawing surface holding the shapes
//! compiled from one GeoJSON document. Layers can be added, rebuilt,
//! removed and restacked by handle.

use super::document::{Decoded, GeoNode, IntoDocument};
use super::projection::MapProjection;
use super::properties::collapse_whitespace;
use super::renderer::{GeometryCompiler, LayerCanvas, LayerRenderer, RenderReport};
use crate::config::{RenderOptions, RendererConfig};
use crate::error::{ConfigError, LayerError};
use crate::surface::{DrawingSurface, ShapeKind, SvgDocument};
use std::collections::HashMap;

/// A rendered layer.
#[derive(Debug, Clone)]
pub struct GeoLayer<N> {
    handle: String,
    /// Decoded document the layer was built from
    source: Option<GeoNode>,
    /// Group on the surface holding the layer's shapes
    root: N,
    report: RenderReport,
}

impl<N: Copy> GeoLayer<N> {
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// The document backing this layer; `None` if the top-level object
    /// could not be decoded.
    pub fn source(&self) -> Option<&GeoNode> {
        self.source.as_ref()
    }

    pub fn root(&self) -> N {
        self.root
    }

    /// Report from the latest build of this layer.
    pub fn report(&self) -> &RenderReport {
        &self.report
    }
}

/// All layers of one drawing surface, together with the projection they
/// are drawn with.
pub struct GeoLayerSet<S: DrawingSurface = SvgDocument> {
    surface: S,
    projection: MapProjection,
    options: RenderOptions,
    layers: HashMap<String, GeoLayer<S::Node>>,
    /// Handles in back-to-front order, applied by [`GeoLayerSet::sort_layers`]
    layer_order: Vec<String>,
}

impl GeoLayerSet<SvgDocument> {
    /// Creates a layer set drawing into a new SVG document sized to the
    /// projected viewport.
    pub fn new(config: &RendererConfig) -> Result<Self, ConfigError> {
        let mut set = Self::with_surface(SvgDocument::new(), config)?;
        let (width, height) = set.projection.viewport_size();
        set.surface.set_size(width, height);
        Ok(set)
    }
}

impl<S: DrawingSurface> GeoLayerSet<S> {
    /// Creates a layer set drawing into an existing surface.
    pub fn with_surface(surface: S, config: &RendererConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let projection = MapProjection::new(
            config.width,
            config.boundaries,
            config.options.aspect_adjustment,
        )?;
        log::debug!(
            "Viewport {}x{} px, scale {:?} deg/px",
            projection.width(),
            projection.height(),
            projection.scale()
        );
        Ok(Self {
            surface,
            projection,
            options: config.options.clone(),
            layers: HashMap::new(),
            layer_order: Vec::new(),
        })
    }

    /// Adds a layer drawn by the geometry compiler.
    ///
    /// An existing layer with the same handle is replaced: its group is
    /// taken off the surface and the new group is appended on top.
    pub fn add_layer(&mut self, handle: &str, data: impl IntoDocument) -> &mut Self {
        self.add_layer_with(handle, data, &GeometryCompiler)
    }

    /// Adds a layer drawn by a custom renderer.
    pub fn add_layer_with<R>(
        &mut self,
        handle: &str,
        data: impl IntoDocument,
        renderer: &R,
    ) -> &mut Self
    where
        R: LayerRenderer<S> + ?Sized,
    {
        let decoded = data.into_document(self.options.max_depth);

        if let Some(previous) = self.layers.remove(handle) {
            log::debug!("Replacing layer `{}`", handle);
            self.surface.remove(previous.root);
        }

        let root = self.layer_group(handle);
        let surface_root = self.surface.root();
        self.surface.append_child(surface_root, root);

        let (source, report) = self.build(handle, decoded, root, renderer);
        self.layers.insert(
            handle.to_string(),
            GeoLayer {
                handle: handle.to_string(),
                source,
                root,
                report,
            },
        );
        self
    }

    /// Removes a layer, logging a warning if there is none by that handle.
    pub fn remove_layer(&mut self, handle: &str) -> &mut Self {
        if let Err(e) = self.try_remove_layer(handle) {
            log::warn!("Cannot remove layer: {}", e);
        }
        self
    }

    /// Removes a layer and its shapes from the surface.
    pub fn try_remove_layer(&mut self, handle: &str) -> Result<&mut Self, LayerError> {
        let layer = self
            .layers
            .remove(handle)
            .ok_or_else(|| LayerError::UnknownLayer(handle.to_string()))?;
        self.surface.remove(layer.root);
        log::debug!("Removed layer `{}`", handle);
        Ok(self)
    }

    /// Rebuilds a layer from new data with the geometry compiler.
    pub fn update_layer(&mut self, handle: &str, data: impl IntoDocument) -> &mut Self {
        self.update_layer_with(handle, data, &GeometryCompiler)
    }

    /// Rebuilds a layer from new data with a custom renderer.
    ///
    /// The new shapes are built in a detached group first, which then takes
    /// the old group's place in the stack. An unknown handle is added as a
    /// new layer.
    pub fn update_layer_with<R>(
        &mut self,
        handle: &str,
        data: impl IntoDocument,
        renderer: &R,
    ) -> &mut Self
    where
        R: LayerRenderer<S> + ?Sized,
    {
        let Some(root) = self.layers.get(handle).map(|layer| layer.root) else {
            return self.add_layer_with(handle, data, renderer);
        };
        let decoded = data.into_document(self.options.max_depth);

        let staging = self.layer_group(handle);
        let (source, report) = self.build(handle, decoded, staging, renderer);
        self.surface.replace(root, staging);

        if let Some(layer) = self.layers.get_mut(handle) {
            layer.source = source;
            layer.root = staging;
            layer.report = report;
        }
        self
    }

    /// Replaces the stored layer order, then applies it.
    pub fn sort_layers_by<I, T>(&mut self, order: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.layer_order = order.into_iter().map(Into::into).collect();
        self.sort_layers()
    }

    /// Restacks layer groups so live layers in the stored order come last,
    /// back to front in that order. Handles without a layer are skipped;
    /// layers missing from the order keep their position.
    pub fn sort_layers(&mut self) -> &mut Self {
        let surface_root = self.surface.root();
        for handle in &self.layer_order {
            match self.layers.get(handle) {
                Some(layer) => self.surface.append_child(surface_root, layer.root),
                None => log::debug!("Layer order names unknown handle `{}`", handle),
            }
        }
        self
    }

    /// Detached group tagged with the layer handle.
    fn layer_group(&mut self, handle: &str) -> S::Node {
        let group = self.surface.create(ShapeKind::Group);
        self.surface.add_class(group, &collapse_whitespace(handle));
        group
    }

    fn build<R>(
        &mut self,
        handle: &str,
        decoded: Decoded,
        target: S::Node,
        renderer: &R,
    ) -> (Option<GeoNode>, RenderReport)
    where
        R: LayerRenderer<S> + ?Sized,
    {
        let mut canvas = LayerCanvas::new(&mut self.surface, &self.projection, &self.options);
        if let Some(node) = &decoded.node {
            renderer.render(node, target, &mut canvas);
        }
        let mut report = canvas.finish();

        for skipped in &decoded.skipped {
            log::warn!("Layer `{}`: skipped {}", handle, skipped);
        }
        report.skipped = decoded.skipped;
        log::debug!(
            "Layer `{}`: {} shapes, {} culled, {} skipped",
            handle,
            report.shapes,
            report.culled,
            report.skipped.len()
        );
        (decoded.node, report)
    }

    pub fn layer(&self, handle: &str) -> Option<&GeoLayer<S::Node>> {
        self.layers.get(handle)
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.layers.contains_key(handle)
    }

    /// Handles of all live layers, sorted.
    pub fn handles(&self) -> Vec<&str> {
        let mut handles: Vec<&str> = self.layers.keys().map(String::as_str).collect();
        handles.sort_unstable();
        handles
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer_order(&self) -> &[String] {
        &self.layer_order
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn projection(&self) -> &MapProjection {
        &self.projection
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn into_surface(self) -> S {
        self.surface
    }
}
