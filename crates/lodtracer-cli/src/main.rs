mod executor;
mod output;
mod progress;
mod renderer;
mod tile;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use lodtracer::{
    loader::{obj::default_obj_material, ObjLoaderExt},
    math::transform::Transform,
    scene::SceneBuilder,
    utils::timer::timed_scope_log,
};
use renderer::{ExecutionMode, Renderer};
use utils::{AvailableLodMode, AvailablePrimaryHit, AvailableScene, Color, Dimensions};

#[derive(Parser, Debug)]
pub struct Args {
    #[arg(long, value_enum, default_value_t)]
    /// Scene selector
    scene: AvailableScene,

    #[arg(long)]
    /// OBJ file added to the scene, with its MTL materials when present
    obj: Option<PathBuf>,

    #[arg(short, long, default_value = "800x600")]
    /// Screen dimension in format `width`x`height`
    dimensions: Dimensions,

    #[arg(short, long, value_enum, default_value_t)]
    /// Texture level of detail estimator
    lod_mode: AvailableLodMode,

    #[arg(long, default_value_t = 3)]
    max_bounces: u32,

    #[arg(long, value_enum, default_value_t)]
    /// Where the first hit comes from: the rasterized G-buffer, or a traced ray
    primary: AvailablePrimaryHit,

    #[arg(long, default_value_t = 1)]
    /// Number of frames to average
    frames: u32,

    #[arg(long, default_value_t)]
    /// Frame index of the first frame, seeds the per pixel random streams
    frame_offset: u32,

    #[arg(long, default_value_t)]
    /// Random dimensions consumed before the first light pick
    prng_dimension: u32,

    #[arg(long)]
    no_analytic_lights: bool,

    #[arg(long)]
    no_emissive_lights: bool,

    #[arg(long)]
    /// Do not gather the environment at path ends
    no_env_light: bool,

    #[arg(long)]
    /// Show `--background` instead of the environment behind the scene
    no_env_background: bool,

    #[arg(long, default_value = "0")]
    /// Color of pixels the G-buffer did not cover, `r,g,b` or a single value
    background: Color,

    #[arg(long, default_value_t = 32)]
    tile_size: u32,

    #[arg(short, long, default_value = "multithreaded")]
    /// multithreaded, monothreaded, or a pixel range such as "0..8x4..6"
    execution_mode: ExecutionMode,

    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    log::info!("loading scene {:?}", args.scene);
    let scene = timed_scope_log("build scene", || -> Result<_> {
        let mut builder = SceneBuilder::new();
        args.scene.insert_into(&mut builder)?;
        if let Some(obj) = &args.obj {
            let material = builder.insert_material(default_obj_material())?;
            builder.load_obj(obj, Transform::IDENTITY, material)?;
        }
        let mut scene = builder.build();
        scene.camera = scene
            .camera
            .with_dimensions(args.dimensions.width, args.dimensions.height);
        Ok(scene)
    })
    .res?;
    log::info!(
        "{} instance(s), {} light(s), rendering at {}",
        scene.instance_count(),
        scene.lights().len(),
        args.dimensions
    );

    Renderer::from_args(&args)?.run(&scene)?;
    log::info!("done");
    Ok(())
}
