use std::{
    io::Write,
    ops::Range,
    sync::mpsc::{channel, Receiver},
};

use glam::{UVec2, Vec3, Vec4};
use image::{ImageBuffer, Rgb32FImage};
use lodtracer::{
    gbuffer::GBuffer,
    integrator::{TexLodPathTracer, TracerConfig},
    scene::Scene,
};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{
    progress::Progress,
    tile::{Tile, Tiler},
};

enum Message {
    Tile(TileMsg),
    Stop,
}

pub struct TileMsg {
    pub tile: Tile,
    pub colors: Vec<Vec4>,
}

pub type Luma32FImage = ImageBuffer<image::Luma<f32>, Vec<f32>>;

/// Images handed to the final outputs: the frame averaged color and two G-buffer views.
pub struct OutputBuffers {
    pub color: Rgb32FImage,
    /// Normals remapped to [0, 1]
    pub normal: Rgb32FImage,
    /// Distance to the camera, 0 where nothing was hit
    pub depth: Luma32FImage,
}

impl OutputBuffers {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            color: ImageBuffer::new(width, height),
            normal: ImageBuffer::new(width, height),
            depth: ImageBuffer::new(width, height),
        }
    }

    fn fill_from_gbuffer(&mut self, gbuffer: &GBuffer, camera_position: Vec3) {
        for (x, y, normal) in self.normal.enumerate_pixels_mut() {
            let texel = gbuffer.texel(UVec2::new(x, y));
            if texel.is_valid() {
                *normal = image::Rgb((texel.normal_w * 0.5 + 0.5).to_array());
            }
        }
        for (x, y, depth) in self.depth.enumerate_pixels_mut() {
            let texel = gbuffer.texel(UVec2::new(x, y));
            if texel.is_valid() {
                *depth = image::Luma([(texel.pos_w.truncate() - camera_position).length()]);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threading {
    Multithreaded,
    Monothreaded,
}

pub struct Executor<'a> {
    pub scene: &'a Scene,
    pub config: TracerConfig,
    /// Each frame is traced with its own `frame_count` and the results are averaged
    pub frames: Range<u32>,
    pub tile_size: u32,
}

impl Executor<'_> {
    pub fn run(
        &self,
        gbuffer: &GBuffer,
        x: Range<u32>,
        y: Range<u32>,
        threading: Threading,
    ) -> anyhow::Result<OutputBuffers> {
        let UVec2 {
            x: width,
            y: height,
        } = gbuffer.dimensions();
        let tiler = Tiler::new(
            x.start..x.end.min(width),
            y.start..y.end.min(height),
            self.tile_size,
        );
        let frame_count = self.frames.len();
        let progress = Progress::new(tiler.pixel_count() * frame_count);
        let mut sums = vec![Vec3::ZERO; (width * height) as usize];

        let generation_result = rayon::scope(|s| {
            let (tx, rx) = channel();

            log::info!(
                "tracing {frame_count} frame(s) over {} tile(s)",
                tiler.tile_count()
            );
            s.spawn(|_| {
                let rx: Receiver<Message> = rx; // Force move without moving anything else
                let mut last_progress_update = std::time::Instant::now();
                for msg in rx.iter() {
                    match msg {
                        Message::Tile(msg) => {
                            for (pixel, color) in msg.tile.pixels().zip(msg.colors) {
                                sums[(pixel.y * width + pixel.x) as usize] += color.truncate();
                            }
                        }
                        Message::Stop => break,
                    }

                    if last_progress_update.elapsed() >= std::time::Duration::from_millis(300) {
                        print!("\r{progress}");
                        let _ = std::io::stdout().flush();
                        last_progress_update = std::time::Instant::now();
                    }
                }
                println!("\r{progress}");
            });

            for frame in self.frames.clone() {
                let tracer = TexLodPathTracer::new(
                    self.scene,
                    TracerConfig {
                        frame_count: frame,
                        ..self.config
                    },
                );
                let render_tile = |tile: Tile| {
                    log::trace!("working on tile {tile:?} of frame {frame}");
                    let colors = tile
                        .pixels()
                        .map(|pixel| tracer.trace_pixel(pixel, gbuffer).color)
                        .collect();
                    progress.add(tile.len());
                    Message::Tile(TileMsg { tile, colors })
                };

                match threading {
                    Threading::Multithreaded => tiler
                        .into_par_iter()
                        .map(render_tile)
                        .try_for_each_init(|| tx.clone(), |tx, msg| tx.send(msg)),
                    Threading::Monothreaded => tiler
                        .into_iter()
                        .map(render_tile)
                        .try_for_each(|msg| tx.send(msg)),
                }
                .map_err(|_| anyhow::anyhow!("output thread hung up"))?;
            }
            tx.send(Message::Stop)
                .map_err(|_| anyhow::anyhow!("output thread hung up"))
        });

        match &generation_result {
            Ok(_) => log::info!("image fully generated"),
            Err(err) => log::error!("image generation interrupted: {err}"),
        };
        generation_result?;

        let mut output_buffers = OutputBuffers::new(width, height);
        let inv_frames = 1.0 / frame_count.max(1) as f32;
        for (x, y, color) in output_buffers.color.enumerate_pixels_mut() {
            *color = image::Rgb((sums[(y * width + x) as usize] * inv_frames).to_array());
        }
        output_buffers.fill_from_gbuffer(gbuffer, self.scene.camera.position);
        Ok(output_buffers)
    }
}

#[cfg(test)]
mod tests {
    use glam::{UVec2, Vec3};
    use lodtracer::{
        camera::Camera,
        color::Rgb,
        gbuffer::GBufferRaster,
        integrator::{TexLodPathTracer, TracerConfig},
        light::EnvMap,
        scene::{Scene, SceneBuilder},
    };

    use super::{Executor, Threading};

    fn sky_scene() -> Scene {
        let mut builder = SceneBuilder::new();
        builder.set_env_map(EnvMap::Constant(Rgb(Vec3::new(0.2, 0.4, 0.6))));
        builder.set_camera(Camera::look_at(
            Vec3::ZERO,
            -Vec3::Z,
            Vec3::Y,
            1.0,
            10,
            6,
        ));
        builder.build()
    }

    #[test]
    fn background_everywhere() {
        let scene = sky_scene();
        let gbuffer = GBufferRaster::default().render(&scene);
        let executor = Executor {
            scene: &scene,
            config: TracerConfig::default(),
            frames: 0..3,
            tile_size: 4,
        };
        for threading in [Threading::Multithreaded, Threading::Monothreaded] {
            let output = executor.run(&gbuffer, 0..10, 0..6, threading).unwrap();
            for pixel in output.color.pixels() {
                assert!((pixel.0[0] - 0.2).abs() < 1e-6);
                assert!((pixel.0[2] - 0.6).abs() < 1e-6);
            }
            assert!(output.depth.pixels().all(|d| d.0[0] == 0.0));
        }
    }

    #[test]
    fn matches_tracer() {
        let mut builder = SceneBuilder::new();
        lodtracer::scene::examples::MirrorFloorScene::insert_into(&mut builder).unwrap();
        let mut scene = builder.build();
        scene.camera = scene.camera.with_dimensions(12, 9);
        let gbuffer = GBufferRaster::default().render(&scene);
        let config = TracerConfig {
            frame_count: 5,
            ..Default::default()
        };

        let executor = Executor {
            scene: &scene,
            config,
            frames: 5..6,
            tile_size: 5,
        };
        let output = executor
            .run(&gbuffer, 0..12, 0..9, Threading::Multithreaded)
            .unwrap();
        let expected = TexLodPathTracer::new(&scene, config)
            .render(&gbuffer)
            .unwrap();
        for (i, color) in expected.iter().enumerate() {
            let pixel = UVec2::new(i as u32 % 12, i as u32 / 12);
            let got = output.color.get_pixel(pixel.x, pixel.y).0;
            assert_eq!(got, color.truncate().to_array());
        }
    }

    #[test]
    fn pixel_range_only() {
        let scene = sky_scene();
        let gbuffer = GBufferRaster::default().render(&scene);
        let executor = Executor {
            scene: &scene,
            config: TracerConfig::default(),
            frames: 0..1,
            tile_size: 32,
        };
        let output = executor
            .run(&gbuffer, 2..3, 1..2, Threading::Monothreaded)
            .unwrap();
        assert!(output.color.get_pixel(2, 1).0[1] > 0.0);
        assert_eq!(output.color.get_pixel(3, 1).0, [0.0; 3]);
    }
}
