//! Geographic layer rendering.
//!
//! Compiles GeoJSON documents into drawable nodes on a [`DrawingSurface`].

use super::document::{Feature, GeoNode, Geometry, Line};
use super::projection::{MapProjection, ScreenPos};
use super::properties::{style_tags, Properties, PROPERTIES_ATTRIBUTE};
use crate::config::{PolygonMode, RenderOptions};
use crate::error::SkippedNode;
use crate::surface::{DrawingSurface, ShapeKind};
use geo_types::Coord;
use std::fmt::Write as _;

/// Outcome of building one layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    /// Non-group shapes emitted.
    pub shapes: usize,
    /// Shapes dropped because no vertex fell inside the viewport.
    pub culled: usize,
    /// Malformed subtrees left out while decoding.
    pub skipped: Vec<SkippedNode>,
}

/// What a [`LayerRenderer`] draws with: the surface, the projection and the
/// active options.
pub struct LayerCanvas<'a, S: DrawingSurface> {
    pub surface: &'a mut S,
    pub projection: &'a MapProjection,
    pub options: &'a RenderOptions,
    shapes: usize,
    culled: usize,
}

impl<'a, S: DrawingSurface> LayerCanvas<'a, S> {
    pub fn new(
        surface: &'a mut S,
        projection: &'a MapProjection,
        options: &'a RenderOptions,
    ) -> Self {
        Self {
            surface,
            projection,
            options,
            shapes: 0,
            culled: 0,
        }
    }

    pub fn project(&self, coord: Coord<f64>) -> ScreenPos {
        self.projection.project(coord)
    }

    /// Creates a node of `kind` as the last child of `parent`.
    pub fn shape(&mut self, kind: ShapeKind, parent: S::Node) -> S::Node {
        let node = self.surface.create(kind);
        self.surface.append_child(parent, node);
        if kind != ShapeKind::Group {
            self.shapes += 1;
        }
        node
    }

    /// Records a shape that was not drawn because it lies outside the viewport.
    pub fn cull(&mut self) {
        self.culled += 1;
    }

    /// Tags `node` with one class per truthy property and stores the full
    /// mapping as a data attribute.
    pub fn attach_properties(&mut self, node: S::Node, properties: &Properties) {
        for tag in style_tags(properties) {
            self.surface.add_class(node, &tag);
        }
        if let Some(payload) = properties.payload() {
            self.surface.set_attribute(node, PROPERTIES_ATTRIBUTE, &payload);
        }
    }

    /// Shape and cull counts so far.
    pub fn finish(self) -> RenderReport {
        RenderReport {
            shapes: self.shapes,
            culled: self.culled,
            skipped: Vec::new(),
        }
    }
}

/// Turns a layer's document into nodes under the layer's root group.
///
/// [`GeometryCompiler`] is the standard implementation; any closure with a
/// matching signature works as a custom renderer.
pub trait LayerRenderer<S: DrawingSurface> {
    fn render(&self, data: &GeoNode, root: S::Node, canvas: &mut LayerCanvas<'_, S>);
}

impl<S, F> LayerRenderer<S> for F
where
    S: DrawingSurface,
    F: Fn(&GeoNode, S::Node, &mut LayerCanvas<'_, S>),
{
    fn render(&self, data: &GeoNode, root: S::Node, canvas: &mut LayerCanvas<'_, S>) {
        self(data, root, canvas)
    }
}

/// Draws each geometry type as its matching shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryCompiler;

impl<S: DrawingSurface> LayerRenderer<S> for GeometryCompiler {
    fn render(&self, data: &GeoNode, root: S::Node, canvas: &mut LayerCanvas<'_, S>) {
        render_node(canvas, data, root);
    }
}

/// Renders a document of any kind into `parent`.
pub fn render_node<S: DrawingSurface>(
    canvas: &mut LayerCanvas<'_, S>,
    node: &GeoNode,
    parent: S::Node,
) {
    match node {
        GeoNode::Geometry(geometry) => {
            render_geometry(canvas, geometry, parent, &Properties::new())
        }
        GeoNode::Feature(feature) => render_feature(canvas, feature, parent),
        GeoNode::FeatureCollection(features) => {
            for feature in features {
                render_feature(canvas, feature, parent);
            }
        }
    }
}

/// Renders a feature's geometry with that feature's own properties.
fn render_feature<S: DrawingSurface>(
    canvas: &mut LayerCanvas<'_, S>,
    feature: &Feature,
    parent: S::Node,
) {
    if let Some(geometry) = &feature.geometry {
        render_geometry(canvas, geometry, parent, &feature.properties);
    }
}

/// Renders a single geometry. Multi-part geometries become a group that
/// carries the properties; their parts carry none.
pub fn render_geometry<S: DrawingSurface>(
    canvas: &mut LayerCanvas<'_, S>,
    geometry: &Geometry,
    parent: S::Node,
    properties: &Properties,
) {
    let none = Properties::new();
    match geometry {
        Geometry::Point(coord) => render_point(canvas, *coord, parent, properties),
        Geometry::MultiPoint(coords) => {
            let group = canvas.shape(ShapeKind::Group, parent);
            canvas.attach_properties(group, properties);
            for coord in coords {
                render_point(canvas, *coord, group, &none);
            }
        }
        Geometry::LineString(coords) => render_line_string(canvas, coords, parent, properties),
        Geometry::MultiLineString(lines) => {
            let group = canvas.shape(ShapeKind::Group, parent);
            canvas.attach_properties(group, properties);
            for coords in lines {
                render_line_string(canvas, coords, group, &none);
            }
        }
        Geometry::Polygon(rings) => render_polygon(canvas, rings, parent, properties),
        Geometry::MultiPolygon(polygons) => {
            let group = canvas.shape(ShapeKind::Group, parent);
            canvas.attach_properties(group, properties);
            for rings in polygons {
                render_polygon(canvas, rings, group, &none);
            }
        }
        Geometry::GeometryCollection(geometries) => {
            let group = canvas.shape(ShapeKind::Group, parent);
            canvas.attach_properties(group, properties);
            for g in geometries {
                render_geometry(canvas, g, group, &none);
            }
        }
    }
}

/// Renders a point marker, or nothing if the point is off screen.
fn render_point<S: DrawingSurface>(
    canvas: &mut LayerCanvas<'_, S>,
    coord: Coord<f64>,
    parent: S::Node,
    properties: &Properties,
) {
    let pos = canvas.project(coord);
    if !canvas.projection.is_visible(pos) {
        canvas.cull();
        return;
    }

    let radius = canvas.options.point_radius;
    let node = canvas.shape(ShapeKind::PointMarker, parent);
    canvas.surface.set_attribute(node, "cx", &pos.x.to_string());
    canvas.surface.set_attribute(node, "cy", &pos.y.to_string());
    canvas.surface.set_attribute(node, "r", &radius.to_string());
    canvas.attach_properties(node, properties);
}

/// Renders an open path through every coordinate, if any of them is on screen.
fn render_line_string<S: DrawingSurface>(
    canvas: &mut LayerCanvas<'_, S>,
    coords: &[Coord<f64>],
    parent: S::Node,
    properties: &Properties,
) {
    let points = canvas.projection.project_all(coords);
    if !canvas.projection.any_in_bounds(&points) {
        canvas.cull();
        return;
    }

    let node = canvas.shape(ShapeKind::Path, parent);
    canvas.surface.set_attribute(node, "d", &path_data(&points, false));
    canvas.attach_properties(node, properties);
}

/// Renders a polygon's rings as one shape, per the configured polygon mode.
fn render_polygon<S: DrawingSurface>(
    canvas: &mut LayerCanvas<'_, S>,
    rings: &[Line],
    parent: S::Node,
    properties: &Properties,
) {
    let projected: Vec<Vec<ScreenPos>> = rings
        .iter()
        .map(|ring| canvas.projection.project_all(ring))
        .filter(|ring| !ring.is_empty())
        .collect();
    if projected.is_empty() {
        return;
    }

    if canvas.options.cull_polygons
        && !projected
            .iter()
            .any(|ring| canvas.projection.any_in_bounds(ring))
    {
        canvas.cull();
        return;
    }

    let node = match canvas.options.polygon_mode {
        PolygonMode::EvenOdd => {
            let node = canvas.shape(ShapeKind::Path, parent);
            let d: String = projected.iter().map(|ring| path_data(ring, true)).collect();
            canvas.surface.set_attribute(node, "d", &d);
            canvas.surface.set_attribute(node, "fill-rule", "evenodd");
            node
        }
        PolygonMode::Concatenated => {
            let node = canvas.shape(ShapeKind::ClosedShape, parent);
            let all: Vec<ScreenPos> = projected.into_iter().flatten().collect();
            canvas.surface.set_attribute(node, "points", &point_list(&all));
            node
        }
    };
    canvas.attach_properties(node, properties);
}

/// SVG path data through `points` with straight segments, e.g. `M0,100L100,0`.
pub fn path_data(points: &[ScreenPos], close: bool) -> String {
    let mut d = String::new();
    for (i, p) in points.iter().enumerate() {
        let command = if i == 0 { 'M' } else { 'L' };
        let _ = write!(d, "{}{},{}", command, p.x, p.y);
    }
    if close && !points.is_empty() {
        d.push('Z');
    }
    d
}

/// SVG polygon point list, e.g. `0,100 100,0`.
pub fn point_list(points: &[ScreenPos]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Boundaries;
    use crate::surface::{NodeId, SvgDocument};
    use serde_json::json;

    fn unit_projection() -> MapProjection {
        MapProjection::new(100.0, Boundaries::new(1.0, 0.0, 0.0, 1.0), 1.0).unwrap()
    }

    fn compile_with(
        value: serde_json::Value,
        options: &RenderOptions,
    ) -> (SvgDocument, NodeId, RenderReport) {
        let projection = unit_projection();
        let mut doc = SvgDocument::new();
        let root = doc.root();
        let decoded = GeoNode::from_json(&value, options.max_depth);
        let mut canvas = LayerCanvas::new(&mut doc, &projection, options);
        if let Some(node) = &decoded.node {
            GeometryCompiler.render(node, root, &mut canvas);
        }
        let mut report = canvas.finish();
        report.skipped = decoded.skipped;
        (doc, root, report)
    }

    fn compile(value: serde_json::Value) -> (SvgDocument, NodeId, RenderReport) {
        compile_with(value, &RenderOptions::default())
    }

    #[test]
    fn test_point_in_bounds() {
        let (doc, root, report) = compile(json!({"type": "Point", "coordinates": [0.5, 0.5]}));
        let children = doc.children(root);
        assert_eq!(children.len(), 1);
        assert_eq!(doc.kind(children[0]), Some(ShapeKind::PointMarker));
        assert_eq!(doc.attribute(children[0], "cx"), Some("50"));
        assert_eq!(doc.attribute(children[0], "cy"), Some("50"));
        assert_eq!(doc.attribute(children[0], "r"), Some("2"));
        assert_eq!(report.shapes, 1);
    }

    #[test]
    fn test_point_out_of_bounds_draws_nothing() {
        let (doc, root, report) = compile(json!({"type": "Point", "coordinates": [2, 2]}));
        assert_eq!(doc.descendant_count(root), 0);
        assert_eq!(report.shapes, 0);
        assert_eq!(report.culled, 1);
    }

    #[test]
    fn test_line_string_path() {
        let line = json!({"type": "LineString", "coordinates": [[0, 0], [1, 1]]});
        let (doc, root, _) = compile(line);
        let children = doc.children(root);
        assert_eq!(children.len(), 1);
        assert_eq!(doc.kind(children[0]), Some(ShapeKind::Path));
        assert_eq!(doc.attribute(children[0], "d"), Some("M0,100L100,0"));
    }

    #[test]
    fn test_line_string_partially_visible_is_drawn_whole() {
        let line = json!({"type": "LineString", "coordinates": [[-1, -1], [0.5, 0.5], [3, 3]]});
        let (doc, root, _) = compile(line);
        let children = doc.children(root);
        assert_eq!(doc.attribute(children[0], "d"), Some("M-100,200L50,50L300,-200"));
    }

    #[test]
    fn test_line_string_fully_outside_is_culled() {
        let line = json!({"type": "LineString", "coordinates": [[2, 2], [3, 3]]});
        let (doc, root, report) = compile(line);
        assert!(doc.children(root).is_empty());
        assert_eq!(report.culled, 1);
    }

    #[test]
    fn test_multi_point_group_carries_properties() {
        let (doc, root, report) = compile(json!({
            "type": "Feature",
            "properties": {"kind": "well"},
            "geometry": {"type": "MultiPoint", "coordinates": [[0.1, 0.1], [5, 5], [0.9, 0.9]]}
        }));
        let groups = doc.children(root);
        assert_eq!(groups.len(), 1);
        assert_eq!(doc.kind(groups[0]), Some(ShapeKind::Group));
        assert_eq!(doc.classes(groups[0]), ["kind--well"]);
        assert_eq!(doc.attribute(groups[0], PROPERTIES_ATTRIBUTE), Some(r#"{"kind":"well"}"#));

        let points = doc.children(groups[0]);
        assert_eq!(points.len(), 2);
        for p in points {
            assert!(doc.classes(p).is_empty());
            assert_eq!(doc.attribute(p, PROPERTIES_ATTRIBUTE), None);
        }
        assert_eq!(report.shapes, 2);
        assert_eq!(report.culled, 1);
    }

    #[test]
    fn test_multi_line_string_and_collection_groups() {
        let (doc, root, _) = compile(json!({
            "type": "GeometryCollection",
            "geometries": [
                {"type": "MultiLineString", "coordinates": [[[0, 0], [1, 1]], [[0, 1], [1, 0]]]},
                {"type": "Point", "coordinates": [0.5, 0.5]}
            ]
        }));
        let outer = doc.children(root);
        assert_eq!(outer.len(), 1);
        let members = doc.children(outer[0]);
        assert_eq!(members.len(), 2);
        assert_eq!(doc.kind(members[0]), Some(ShapeKind::Group));
        assert_eq!(doc.children(members[0]).len(), 2);
        assert_eq!(doc.kind(members[1]), Some(ShapeKind::PointMarker));
    }

    #[test]
    fn test_polygon_even_odd_keeps_rings_separate() {
        let (doc, root, _) = compile(json!({
            "type": "Polygon",
            "coordinates": [
                [[0, 0], [1, 0], [1, 1], [0, 0]],
                [[0.5, 0.25], [0.75, 0.25], [0.75, 0.5], [0.5, 0.25]]
            ]
        }));
        let shape = doc.children(root)[0];
        assert_eq!(doc.kind(shape), Some(ShapeKind::Path));
        assert_eq!(doc.attribute(shape, "fill-rule"), Some("evenodd"));
        assert_eq!(
            doc.attribute(shape, "d"),
            Some("M0,100L100,100L100,0L0,100ZM50,75L75,75L75,50L50,75Z")
        );
    }

    #[test]
    fn test_polygon_concatenated_mode() {
        let options = RenderOptions {
            polygon_mode: PolygonMode::Concatenated,
            ..Default::default()
        };
        let (doc, root, _) = compile_with(
            json!({
                "type": "Polygon",
                "coordinates": [[[0, 0], [1, 0], [1, 1]], [[0.5, 0.5], [0.75, 0.5], [0.75, 0.75]]]
            }),
            &options,
        );
        let shape = doc.children(root)[0];
        assert_eq!(doc.kind(shape), Some(ShapeKind::ClosedShape));
        assert_eq!(
            doc.attribute(shape, "points"),
            Some("0,100 100,100 100,0 50,50 75,50 75,25")
        );
    }

    #[test]
    fn test_polygon_culling_is_configurable() {
        let far_away = json!({
            "type": "Polygon",
            "coordinates": [[[5, 5], [6, 5], [6, 6], [5, 5]]]
        });

        let (doc, root, report) = compile(far_away.clone());
        assert!(doc.children(root).is_empty());
        assert_eq!(report.culled, 1);

        let options = RenderOptions {
            cull_polygons: false,
            ..Default::default()
        };
        let (doc, root, report) = compile_with(far_away, &options);
        assert_eq!(doc.children(root).len(), 1);
        assert_eq!(report.shapes, 1);
    }

    #[test]
    fn test_multi_polygon_group() {
        let (doc, root, report) = compile(json!({
            "type": "Feature",
            "properties": {"name": "Two Islands"},
            "geometry": {"type": "MultiPolygon", "coordinates": [
                [[[0, 0], [0.2, 0], [0.2, 0.2], [0, 0]]],
                [[[0.5, 0.5], [0.7, 0.5], [0.7, 0.7], [0.5, 0.5]]]
            ]}
        }));
        let group = doc.children(root)[0];
        assert_eq!(doc.classes(group), ["name--Two-Islands"]);
        assert_eq!(doc.children(group).len(), 2);
        assert_eq!(report.shapes, 2);
    }

    #[test]
    fn test_feature_properties_do_not_leak_into_siblings() {
        let (doc, root, _) = compile(json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"a": 1},
                 "geometry": {"type": "Point", "coordinates": [0.2, 0.2]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [0.4, 0.4]}}
            ]
        }));
        let shapes = doc.children(root);
        assert_eq!(doc.classes(shapes[0]), ["a--1"]);
        assert!(doc.classes(shapes[1]).is_empty());
        assert_eq!(doc.attribute(shapes[1], PROPERTIES_ATTRIBUTE), None);
    }

    #[test]
    fn test_malformed_feature_is_skipped_and_siblings_render() {
        let (doc, root, report) = compile(json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [0.5, 0.5]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Blob", "coordinates": [0.5, 0.5]}}
            ]
        }));
        assert_eq!(doc.descendant_count(root), 1);
        assert_eq!(report.shapes, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, "/features/1/geometry");
    }

    #[test]
    fn test_compiling_twice_is_identical() {
        let data = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"kind": "river"},
                 "geometry": {"type": "LineString", "coordinates": [[0, 0], [0.5, 0.7], [1, 1]]}},
                {"type": "Feature", "properties": {"kind": "lake"},
                 "geometry": {"type": "Polygon",
                              "coordinates": [[[0.1, 0.1], [0.3, 0.1], [0.3, 0.3], [0.1, 0.1]]]}}
            ]
        });
        let (first, _, first_report) = compile(data.clone());
        let (second, _, second_report) = compile(data);
        assert_eq!(first.to_svg_string(), second.to_svg_string());
        assert_eq!(first_report, second_report);
    }

    fn custom_marker(node: &GeoNode, parent: NodeId, canvas: &mut LayerCanvas<'_, SvgDocument>) {
        if let GeoNode::Geometry(Geometry::Point(c)) = node {
            let pos = canvas.project(*c);
            let marker = canvas.shape(ShapeKind::PointMarker, parent);
            canvas.surface.set_attribute(marker, "cx", &pos.x.to_string());
            canvas.surface.add_class(marker, "custom");
        }
    }

    #[test]
    fn test_function_as_renderer() {
        let projection = unit_projection();
        let options = RenderOptions::default();
        let mut doc = SvgDocument::new();
        let root = doc.root();
        let data = GeoNode::Geometry(Geometry::Point(Coord { x: 0.5, y: 0.5 }));

        let mut canvas = LayerCanvas::new(&mut doc, &projection, &options);
        LayerRenderer::<SvgDocument>::render(&custom_marker, &data, root, &mut canvas);
        assert_eq!(canvas.finish().shapes, 1);

        let marker = doc.children(root)[0];
        assert_eq!(doc.classes(marker), ["custom"]);
        assert_eq!(doc.attribute(marker, "r"), None);
    }
}
