use std::ops::Range;

use anyhow::Result;
use itertools::Itertools;
use lodtracer::{
    gbuffer::{GBuffer, GBufferRaster},
    integrator::TracerConfig,
    scene::Scene,
    utils::{counter, timer::timed_scope_log},
};

use crate::{
    executor::{Executor, Threading},
    output::{FileOutput, FinalOutput},
    utils::parse_range,
    Args,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionMode {
    Multithreaded,
    Monothreaded,
    PixelRange { x: Range<u32>, y: Range<u32> },
}

impl std::str::FromStr for ExecutionMode {
    type Err = &'static str;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = Err("expected monothreaded, multithreaded or a pixel range `x`x`y`, eg 1x2 for the pixel (1, 2) or 0..8x4..6");
        match s.to_lowercase().as_str() {
            "multithreaded" => Ok(Self::Multithreaded),
            "monothreaded" => Ok(Self::Monothreaded),
            s => {
                let Some((x, y)) = s.split('x').map(parse_range).collect_tuple() else {
                    return err;
                };
                let (Some(x), Some(y)) = (x, y) else {
                    return err;
                };
                Ok(ExecutionMode::PixelRange { x, y })
            }
        }
    }
}

/// Frame indices `offset..offset + count`
pub fn frame_range(offset: u32, count: u32) -> Result<Range<u32>> {
    let end = offset.checked_add(count).ok_or_else(|| {
        anyhow::anyhow!("--frame-offset {offset} plus --frames {count} overflows the frame index")
    })?;
    Ok(offset..end)
}

pub struct Renderer {
    pub config: TracerConfig,
    pub frames: Range<u32>,
    pub tile_size: u32,
    pub execution_mode: ExecutionMode,
    pub final_outputs: Vec<Box<dyn FinalOutput>>,
}

impl Renderer {
    pub fn from_args(args: &Args) -> Result<Self> {
        log::info!("building renderer");
        let config = TracerConfig {
            max_bounces: args.max_bounces,
            use_analytic_lights: !args.no_analytic_lights,
            use_emissive_lights: !args.no_emissive_lights,
            use_env_light: !args.no_env_light,
            use_env_background: !args.no_env_background,
            lod_mode: args.lod_mode.into(),
            primary_hit: args.primary.into(),
            prng_dimension: args.prng_dimension,
            background_color: args.background.0,
            ..Default::default()
        };
        log::info!(
            "lod mode: {}, primary hits: {}, max bounces: {}",
            config.lod_mode,
            config.primary_hit,
            config.max_bounces
        );

        Ok(Self {
            config,
            frames: frame_range(args.frame_offset, args.frames)?,
            tile_size: args.tile_size,
            execution_mode: args.execution_mode.clone(),
            final_outputs: vec![Box::new(FileOutput::new(&args.output_dir))],
        })
    }

    pub fn run(self, scene: &Scene) -> Result<()> {
        let gbuffer: GBuffer =
            timed_scope_log("rasterize gbuffer", || GBufferRaster::default().render(scene)).res;

        let executor = Executor {
            scene,
            config: self.config,
            frames: self.frames,
            tile_size: self.tile_size,
        };
        let (width, height) = (gbuffer.width(), gbuffer.height());
        let output_buffers = timed_scope_log("trace frames", || match self.execution_mode {
            ExecutionMode::Multithreaded => {
                log::info!("execution mode: multithreaded");
                executor.run(&gbuffer, 0..width, 0..height, Threading::Multithreaded)
            }
            ExecutionMode::Monothreaded => {
                log::info!("execution mode: monothreaded");
                executor.run(&gbuffer, 0..width, 0..height, Threading::Monothreaded)
            }
            ExecutionMode::PixelRange { x, y } => {
                log::info!("execution mode: pixels {x:?}x{y:?}");
                executor.run(&gbuffer, x, y, Threading::Monothreaded)
            }
        })
        .res?;

        for final_output in self.final_outputs {
            final_output.commit(&output_buffers)?;
        }

        counter::report_counters();
        Ok(())
    }
}
