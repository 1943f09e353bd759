//! geolayers CLI - renders GeoJSON files into a layered SVG document.

use clap::{Parser, ValueEnum};
use geolayers::geo::Decoded;
use geolayers::{Boundaries, ConfigError, GeoLayerSet, GeoNode, PolygonMode, RendererConfig};
use std::path::{Path, PathBuf};
use std::process;
use thiserror::Error;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolygonModeArg {
    /// One path per polygon, holes cut out with the even-odd rule
    EvenOdd,
    /// One closed shape per polygon with all rings concatenated
    Concatenated,
}

impl From<PolygonModeArg> for PolygonMode {
    fn from(arg: PolygonModeArg) -> Self {
        match arg {
            PolygonModeArg::EvenOdd => PolygonMode::EvenOdd,
            PolygonModeArg::Concatenated => PolygonMode::Concatenated,
        }
    }
}

#[derive(Parser)]
#[command(name = "geolayers")]
#[command(about = "Render GeoJSON files as layers of an SVG map", long_about = None)]
struct Args {
    /// Layers to draw, back to front, as `handle=path` or just `path`
    #[arg(required = true)]
    layers: Vec<String>,

    /// JSON renderer config (width, boundaries, options)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Viewport width in pixels (overrides the config)
    #[arg(long)]
    width: Option<f64>,

    /// North edge in degrees
    #[arg(long, allow_hyphen_values = true, requires_all = ["south", "west", "east"])]
    north: Option<f64>,

    /// South edge in degrees
    #[arg(long, allow_hyphen_values = true, requires_all = ["north", "west", "east"])]
    south: Option<f64>,

    /// West edge in degrees
    #[arg(long, allow_hyphen_values = true, requires_all = ["north", "south", "east"])]
    west: Option<f64>,

    /// East edge in degrees
    #[arg(long, allow_hyphen_values = true, requires_all = ["north", "south", "west"])]
    east: Option<f64>,

    /// Latitude scale relative to longitude scale
    #[arg(long)]
    aspect: Option<f64>,

    /// Point marker radius in pixels
    #[arg(long)]
    point_radius: Option<f64>,

    /// How polygon holes are drawn
    #[arg(long, value_enum)]
    polygon_mode: Option<PolygonModeArg>,

    /// Draw polygons even when no vertex is inside the viewport
    #[arg(long)]
    no_cull_polygons: bool,

    /// Final stacking order of layer handles, back to front (comma separated)
    #[arg(long, value_delimiter = ',')]
    order: Vec<String>,

    /// Output SVG file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("A viewport width is required (--width or a config file)")]
    MissingWidth,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CliError {
    fn exit(&self) -> ! {
        eprintln!("Error: {}", self);
        process::exit(1)
    }
}

/// One positional layer argument, loaded and decoded.
struct LayerInput {
    handle: String,
    path: PathBuf,
    decoded: Decoded,
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        e.exit();
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let file_config = args.config.as_deref().map(RendererConfig::load).transpose()?;

    let mut options = file_config
        .as_ref()
        .map(|c| c.options.clone())
        .unwrap_or_default();
    if let Some(aspect) = args.aspect {
        options.aspect_adjustment = aspect;
    }
    if let Some(radius) = args.point_radius {
        options.point_radius = radius;
    }
    if let Some(mode) = args.polygon_mode {
        options.polygon_mode = mode.into();
    }
    if args.no_cull_polygons {
        options.cull_polygons = false;
    }

    let inputs = args
        .layers
        .iter()
        .map(|arg| load_layer(arg, options.max_depth))
        .collect::<Result<Vec<_>, _>>()?;

    let width = args
        .width
        .or(file_config.as_ref().map(|c| c.width))
        .ok_or(CliError::MissingWidth)?;

    let boundaries = match (args.north, args.south, args.west, args.east) {
        (Some(north), Some(south), Some(west), Some(east)) => {
            Boundaries::new(north, south, west, east)
        }
        _ => match &file_config {
            Some(config) => config.boundaries,
            None => data_extent(&inputs).ok_or(ConfigError::MissingBoundaries)?,
        },
    };

    let config = RendererConfig::new(width, boundaries).with_options(options);
    let mut layers = GeoLayerSet::new(&config)?;

    for input in inputs {
        layers.add_layer(&input.handle, input.decoded);
        if let Some(layer) = layers.layer(&input.handle) {
            log::info!(
                "Layer `{}` from {}: {} shapes, {} culled",
                input.handle,
                input.path.display(),
                layer.report().shapes,
                layer.report().culled
            );
            for node in &layer.report().skipped {
                eprintln!("{}: skipped {}", input.path.display(), node);
            }
        }
    }

    if !args.order.is_empty() {
        layers.sort_layers_by(args.order);
    }

    let svg = layers.surface().to_svg_string();
    match args.output {
        Some(path) => {
            std::fs::write(&path, svg).map_err(|source| CliError::Write {
                path: path.clone(),
                source,
            })?;
            log::info!("Wrote {}", path.display());
        }
        None => print!("{}", svg),
    }
    Ok(())
}

/// Parses `handle=path`, falling back to the file stem as the handle.
fn split_layer_arg(arg: &str) -> (String, PathBuf) {
    match arg.split_once('=') {
        Some((handle, path)) if !handle.is_empty() => (handle.to_string(), PathBuf::from(path)),
        _ => {
            let path = PathBuf::from(arg);
            let handle = Path::new(arg)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| arg.to_string());
            (handle, path)
        }
    }
}

fn load_layer(arg: &str, max_depth: usize) -> Result<LayerInput, CliError> {
    let (handle, path) = split_layer_arg(arg);
    let text = std::fs::read_to_string(&path).map_err(|source| CliError::Read {
        path: path.clone(),
        source,
    })?;
    let decoded = GeoNode::parse(&text, max_depth).map_err(|source| CliError::Parse {
        path: path.clone(),
        source,
    })?;
    Ok(LayerInput {
        handle,
        path,
        decoded,
    })
}

/// Union of every layer's extent, widened where it has no span.
fn data_extent(inputs: &[LayerInput]) -> Option<Boundaries> {
    let mut extent = inputs
        .iter()
        .filter_map(|input| input.decoded.node.as_ref().and_then(GeoNode::extent))
        .reduce(|a, b| Boundaries {
            north: a.north.max(b.north),
            south: a.south.min(b.south),
            west: a.west.min(b.west),
            east: a.east.max(b.east),
        })?;

    if extent.north == extent.south {
        extent.north += 0.5;
        extent.south -= 0.5;
    }
    if extent.east == extent.west {
        extent.east += 0.5;
        extent.west -= 0.5;
    }
    log::info!("Using data extent {:?}", extent);
    Some(extent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_layer_arg() {
        assert_eq!(
            split_layer_arg("roads=data/roads.geojson"),
            ("roads".to_string(), PathBuf::from("data/roads.geojson"))
        );
        assert_eq!(
            split_layer_arg("data/rivers.geojson"),
            ("rivers".to_string(), PathBuf::from("data/rivers.geojson"))
        );
    }

    #[test]
    fn test_data_extent_widens_single_point() {
        let decoded = GeoNode::parse(r#"{"type": "Point", "coordinates": [10, 20]}"#, 32).unwrap();
        let inputs = vec![LayerInput {
            handle: "p".to_string(),
            path: PathBuf::from("p.geojson"),
            decoded,
        }];
        let extent = data_extent(&inputs).unwrap();
        assert_eq!(extent, Boundaries::new(20.5, 19.5, 9.5, 10.5));
        assert!(extent.validate().is_ok());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "geolayers",
            "--width",
            "640",
            "--north",
            "1",
            "--south",
            "-1",
            "--west",
            "-2",
            "--east",
            "2",
            "--order",
            "b,a",
            "a=a.json",
            "b=b.json",
        ])
        .unwrap();
        assert_eq!(args.width, Some(640.0));
        assert_eq!(args.south, Some(-1.0));
        assert_eq!(args.order, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(args.layers.len(), 2);

        assert!(Args::try_parse_from(["geolayers", "--north", "1", "a.json"]).is_err());
    }
}
