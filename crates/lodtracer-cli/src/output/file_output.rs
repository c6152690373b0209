use std::path::PathBuf;

use anyhow::{Context, Result};
use image::{buffer::ConvertBuffer, ImageBuffer, RgbImage};
use lodtracer::color::Rgb;

use super::FinalOutput;
use crate::executor::OutputBuffers;

/// Writes `color.exr`, `color.png`, `normal.png` and `depth.exr` into `outdir`.
pub struct FileOutput {
    pub outdir: PathBuf,
}

impl FileOutput {
    pub fn new(outdir: impl Into<PathBuf>) -> Self {
        Self {
            outdir: outdir.into(),
        }
    }
}

fn to_srgb_image(image: &image::Rgb32FImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        image::Rgb(Rgb(glam::Vec3::new(r, g, b)).to_srgb_bytes())
    })
}

impl FinalOutput for FileOutput {
    fn commit(&self, output_buffers: &OutputBuffers) -> Result<()> {
        let convert_luma = ConvertBuffer::<ImageBuffer<image::Rgb<f32>, Vec<f32>>>::convert;
        std::fs::create_dir_all(&self.outdir)
            .with_context(|| format!("creating {}", self.outdir.display()))?;

        log::info!("saving images to {}", self.outdir.display());
        let save = |name: &str, result: image::ImageResult<()>| {
            result.with_context(|| format!("saving {name}"))
        };
        save(
            "color.exr",
            output_buffers.color.save(self.outdir.join("color.exr")),
        )?;
        save(
            "color.png",
            to_srgb_image(&output_buffers.color).save(self.outdir.join("color.png")),
        )?;
        // Already in [0, 1], stored without the transfer curve
        let normal: RgbImage = output_buffers.normal.convert();
        save("normal.png", normal.save(self.outdir.join("normal.png")))?;
        save(
            "depth.exr",
            convert_luma(&output_buffers.depth).save(self.outdir.join("depth.exr")),
        )?;
        Ok(())
    }
}
