use anyhow::Context;
use clap::{Arg, App, AppSettings, ArgMatches, SubCommand};
use env_logger::Env;
use log::{debug, info, warn};


mod bounding_box;
mod camera;
mod config;
mod error;
mod geojson_writer;
mod geometry;
mod ingest;
mod labels;
mod layers;
mod mst;
mod projection;
mod render;
mod scene;

use camera::{CameraView, Controls, MapControls, TopDownLock};
use config::ViewerConfig;
use geojson_writer::GeoJsonWriter;
use ingest::{Ingestor, Source};
use layers::Network;
use scene::{SceneUpdate, load_scene};


fn main() -> anyhow::Result<()> {

    let source_arg = |name: &'static str, help: &'static str| {
        Arg::with_name(name)
            .long(name)
            .value_name("FILE|URL")
            .help(help)
            .takes_value(true)
    };

    let matches = App::new("towerscape - transmitter towers over a projected map")
        .version("0.1")
        .author("Johannes Hofmann <mail@b-r-u.org>")
        .about("Project GeoJSON transmitter layers, connect each network by a minimum spanning tree and frame a map camera.")
        .setting(AppSettings::ArgRequiredElseHelp)
        .arg(Arg::with_name("verbose")
             .long("verbose")
             .short("v")
             .help("Print debug messages")
             .global(true)
        )
        .arg(Arg::with_name("config")
             .long("config")
             .value_name("FILE")
             .help("Sets a JSON config file")
             .takes_value(true)
             .global(true)
        )
        .subcommand(SubCommand::with_name("bbox")
            .about("Print the padded bounding box of a GeoJSON layer.")
            .arg(source_arg("input", "Sets the input GeoJSON layer").required(true))
            .arg(Arg::with_name("fov")
                 .long("fov")
                 .value_name("DEGREES")
                 .help("Sets the field of view used for the framing distance")
                 .takes_value(true)
                 .validator(is_field_of_view)
            )
        )
        .subcommand(SubCommand::with_name("mst")
            .about("Connect the towers of a point layer by a minimum spanning tree and export edges and towers.")
            .arg(source_arg("input", "Sets the input GeoJSON point layer").required(true))
            .arg(Arg::with_name("output")
                 .long("output")
                 .value_name("FILE")
                 .help("Sets the output GeoJSON file to store the tree edges and the labeled towers")
                 .takes_value(true)
                 .required(true)
            )
            .arg(Arg::with_name("network")
                 .long("network")
                 .value_name("fm|cell")
                 .help("Sets the network name stored with each edge")
                 .takes_value(true)
                 .default_value("fm")
                 .possible_values(&["fm", "cell"])
            )
        )
        .subcommand(SubCommand::with_name("view")
            .about("Load all layers, frame the camera and optionally render a preview.")
            .arg(source_arg("contours", "Sets the contour line layer"))
            .arg(source_arg("cell-towers", "Sets the cellular tower layer"))
            .arg(source_arg("fm-towers", "Sets the FM tower layer"))
            .arg(source_arg("fm-polygons", "Sets the FM propagation polygon layer"))
            .arg(Arg::with_name("fov")
                 .long("fov")
                 .value_name("DEGREES")
                 .help("Sets the camera field of view")
                 .takes_value(true)
                 .validator(is_field_of_view)
            )
            .arg(Arg::with_name("viewport-width")
                 .long("viewport-width")
                 .value_name("PX")
                 .help("Derives the field of view from the viewport width")
                 .takes_value(true)
                 .conflicts_with("fov")
                 .validator(is_positive::<f64>)
            )
            .arg(Arg::with_name("hide")
                 .long("hide")
                 .value_name("LAYER")
                 .help("Hides a layer by name, e.g. \"cell MST lines\"")
                 .takes_value(true)
                 .multiple(true)
                 .number_of_values(1)
            )
            .arg(Arg::with_name("lock")
                 .long("lock")
                 .help("Locks the camera top-down above the data")
            )
            .arg(Arg::with_name("keys")
                 .long("keys")
                 .value_name("KEYS")
                 .help("Replays key presses (l toggles the lock, w/a/s/d pan while locked)")
                 .takes_value(true)
            )
            .arg(Arg::with_name("png")
                 .long("png")
                 .value_name("FILE")
                 .help("Renders a top-down preview to a PNG file")
                 .takes_value(true)
            )
            .arg(Arg::with_name("width")
                 .long("width")
                 .value_name("PX")
                 .takes_value(true)
                 .default_value("1024")
                 .validator(is_positive::<i32>)
            )
            .arg(Arg::with_name("height")
                 .long("height")
                 .value_name("PX")
                 .takes_value(true)
                 .default_value("768")
                 .validator(is_positive::<i32>)
            )
        )
        .get_matches();

    let level = if matches.is_present("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let config = match matches.value_of("config") {
        Some(path) => ViewerConfig::from_path(path)?,
        None => ViewerConfig::default(),
    };

    match matches.subcommand() {
        ("bbox", Some(m)) => bbox(m, &config),
        ("mst", Some(m)) => mst(m, &config),
        ("view", Some(m)) => view(m, config),
        _ => Ok(()),
    }
}


fn is_positive<T: std::str::FromStr + PartialOrd + Default>(s: String) -> Result<(), String> {
    match s.parse::<T>() {
        Ok(n) if n > T::default() => Ok(()),
        Ok(_) => Err(format!("need a number greater than zero")),
        Err(_) => Err(format!("need a number")),
    }
}

fn is_field_of_view(s: String) -> Result<(), String> {
    match s.parse::<f64>() {
        Ok(fov) => camera::check_fov(fov).map(|_| ()).map_err(|e| e.to_string()),
        Err(_) => Err(format!("need a number")),
    }
}

fn number_of<T: std::str::FromStr>(m: &ArgMatches, name: &str) -> Option<T> {
    m.value_of(name).and_then(|s| s.parse::<T>().ok())
}

fn bbox(m: &ArgMatches, config: &ViewerConfig) -> anyhow::Result<()> {
    let projector = config.projector()?;
    let ingestor = Ingestor::new(config.fetch_timeout())?;
    let source = Source::parse(m.value_of("input").unwrap_or_default());
    let fov = number_of::<f64>(m, "fov").unwrap_or(config.fov_degrees);

    let fc = ingestor.fetch(&source)?;
    let bounds = bounding_box::compute_bounding_box(&fc, &projector)
        .with_context(|| format!("Failed to compute bounding box of {}", source))?;

    println!("min: ({:.6}, {:.6})", bounds.min.x, bounds.min.y);
    println!("max: ({:.6}, {:.6})", bounds.max.x, bounds.max.y);
    println!("center: ({:.6}, {:.6})", bounds.center().x, bounds.center().y);
    println!("framing distance at {}°: {:.6}", fov, camera::framing_distance(&bounds, fov)?);
    Ok(())
}

fn mst(m: &ArgMatches, config: &ViewerConfig) -> anyhow::Result<()> {
    let projector = config.projector()?;
    let ingestor = Ingestor::new(config.fetch_timeout())?;
    let source = Source::parse(m.value_of("input").unwrap_or_default());
    let output = m.value_of("output").unwrap_or_default();
    let network = m.value_of("network").and_then(Network::from_name).unwrap_or(Network::Fm);

    let fc = ingestor.fetch(&source)?;
    let layer = layers::build_towers(&fc, &projector, network, &config.layer_settings());
    let total: f64 = layer.edges.iter().map(|e| e.length()).sum();
    info!("{} towers, {} edges, total length {:.6}", layer.markers.len(), layer.edges.len(), total);

    let mut writer = GeoJsonWriter::from_path(output)
        .with_context(|| format!("Failed to create {}", output))?;
    writer.add_edges(&layer.edges, network.name())?;
    writer.add_towers(&layer.markers, network.name())?;
    writer.finish()?;
    Ok(())
}

fn view(m: &ArgMatches, mut config: ViewerConfig) -> anyhow::Result<()> {
    let layer_args = &mut config.layers;
    for (arg, slot) in vec![
        ("contours", &mut layer_args.contours),
        ("cell-towers", &mut layer_args.cell_towers),
        ("fm-towers", &mut layer_args.fm_towers),
        ("fm-polygons", &mut layer_args.fm_polygons),
    ] {
        if let Some(value) = m.value_of(arg) {
            *slot = Some(value.to_string());
        }
    }
    if let Some(fov) = number_of::<f64>(m, "fov") {
        config.fov_degrees = fov;
    }
    if let Some(width) = number_of::<f64>(m, "viewport-width") {
        config.fov_degrees = camera::fov_for_viewport_width(width);
    }

    let projector = config.projector()?;
    info!("Using {} ({})", projector.identifier(), projector.definition());
    let ingestor = Ingestor::new(config.fetch_timeout())?;
    let stride = config.polygon_stride(&mut rand::thread_rng());

    let mut scene = load_scene(
        &config.layers.to_sources(),
        &ingestor,
        &projector,
        &config.layer_settings(),
        stride,
    );

    if let Some(names) = m.values_of("hide") {
        for name in names {
            let update = SceneUpdate::SetVisibility { layer: name.to_string(), visible: false };
            if let Err(err) = scene.apply(update) {
                warn!("{}", err);
            }
        }
    }

    for (id, layer) in scene.layers() {
        info!(
            "{:<32} {:>6} items{}",
            id.name(),
            layer.content.len(),
            if layer.visible { "" } else { " (hidden)" },
        );
    }

    let bounds = match scene.bounding_box() {
        Some(bounds) => *bounds,
        None => {
            warn!("No contour layer loaded, the camera stays at its default position");
            return Ok(());
        },
    };

    let mut controls = MapControls::new(CameraView {
        fov: config.fov_degrees,
        max_distance: config.max_distance.unwrap_or(std::f64::INFINITY),
        ..CameraView::default()
    });
    camera::frame_and_constrain(&mut controls, bounds)
        .context("Failed to frame the camera")?;

    let mut lock = TopDownLock::default();
    if m.is_present("lock") {
        lock.set(true, Some(&bounds), &mut controls)?;
    }
    if let Some(keys) = m.value_of("keys") {
        for key in keys.chars() {
            if !camera::handle_key(key, &mut lock, Some(&bounds), &mut controls)? {
                warn!("Ignoring key {:?}", key);
            }
        }
    }

    let v = controls.view();
    info!(
        "Camera at ({:.4}, {:.4}, {:.4}) looking at ({:.4}, {:.4}, {:.4}), {:?}",
        v.position.x, v.position.y, v.position.z,
        v.target.x, v.target.y, v.target.z,
        lock.state(),
    );
    debug!(
        "Camera up ({}, {}, {}), rotate: {}, pan: {}",
        v.up.x, v.up.y, v.up.z, v.enable_rotate, v.enable_pan,
    );

    if let Some(png) = m.value_of("png") {
        let width = number_of::<i32>(m, "width").unwrap_or(1024);
        let height = number_of::<i32>(m, "height").unwrap_or(768);
        let frame = lock.snapshot().unwrap_or(bounds);
        render::write_png(&scene, frame, png, width, height)
            .with_context(|| format!("Failed to write {}", png))?;
        info!("Wrote preview to {}", png);
    }

    Ok(())
}
