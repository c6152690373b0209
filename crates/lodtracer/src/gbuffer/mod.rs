//! Primary visibility buffer: per pixel surface attributes of the first hit.
//!
//! Channels are stored one `Vec` each, row major. Positions carry `w = 1` on covered pixels
//! and `w = 0` elsewhere.
pub mod raster;

pub use raster::GBufferRaster;

use glam::{UVec2, Vec2, Vec3, Vec4};

use crate::{
    lod::RayDiff,
    material::{GeometryParams, MaterialParams, ShadingData},
    scene::PackedHitInfo,
};

bitflags::bitflags! {
    /// Optional channels a G-buffer can provide
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GBufferChannels: u32 {
        const BITANGENT = 1 << 0;
        const VIEW = 1 << 1;
        const SURFACE_SPREAD_ANGLE = 1 << 2;
        const RAY_DIFFERENTIALS = 1 << 3;
        const VBUFFER = 1 << 4;
    }
}

/// All attributes of one pixel. Optional channels read as `None` when they are not bound.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GBufferTexel {
    pub pos_w: Vec4,
    pub normal_w: Vec3,
    pub tangent_w: Vec3,
    pub face_normal_w: Vec3,
    pub tex_c: Vec2,
    pub material: MaterialParams,

    pub bitangent_w: Option<Vec3>,
    pub view_w: Option<Vec3>,
    pub surface_spread_angle: Option<f32>,
    pub ray_diff: Option<RayDiff>,
    pub vbuffer: Option<PackedHitInfo>,
}

impl GBufferTexel {
    pub fn is_valid(&self) -> bool {
        self.pos_w.w != 0.0
    }
}

#[derive(Debug, Clone)]
pub struct GBuffer {
    width: u32,
    height: u32,

    pos_w: Vec<Vec4>,
    normal_w: Vec<Vec3>,
    tangent_w: Vec<Vec3>,
    face_normal_w: Vec<Vec3>,
    tex_c: Vec<Vec2>,
    mtl_diffuse_opacity: Vec<Vec4>,
    mtl_spec_rough: Vec<Vec4>,
    mtl_emissive: Vec<Vec4>,
    mtl_params: Vec<Vec4>,

    bitangent_w: Option<Vec<Vec3>>,
    view_w: Option<Vec<Vec3>>,
    surface_spread_angle: Option<Vec<f32>>,
    ray_diffs: Option<[Vec<Vec4>; 3]>,
    vbuffer: Option<Vec<PackedHitInfo>>,
}

impl GBuffer {
    /// An empty buffer (every pixel invalid) with the given optional channels bound
    pub fn new(width: u32, height: u32, channels: GBufferChannels) -> Self {
        let len = (width * height) as usize;
        let bound = |channel| channels.contains(channel);
        Self {
            width,
            height,
            pos_w: vec![Vec4::ZERO; len],
            normal_w: vec![Vec3::ZERO; len],
            tangent_w: vec![Vec3::ZERO; len],
            face_normal_w: vec![Vec3::ZERO; len],
            tex_c: vec![Vec2::ZERO; len],
            mtl_diffuse_opacity: vec![Vec4::ZERO; len],
            mtl_spec_rough: vec![Vec4::ZERO; len],
            mtl_emissive: vec![Vec4::ZERO; len],
            mtl_params: vec![Vec4::ZERO; len],
            bitangent_w: bound(GBufferChannels::BITANGENT).then(|| vec![Vec3::ZERO; len]),
            view_w: bound(GBufferChannels::VIEW).then(|| vec![Vec3::ZERO; len]),
            surface_spread_angle: bound(GBufferChannels::SURFACE_SPREAD_ANGLE)
                .then(|| vec![0.0; len]),
            ray_diffs: bound(GBufferChannels::RAY_DIFFERENTIALS)
                .then(|| [(); 3].map(|_| vec![Vec4::ZERO; len])),
            vbuffer: bound(GBufferChannels::VBUFFER).then(|| vec![PackedHitInfo::NONE; len]),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    /// Optional channels that are bound
    pub fn channels(&self) -> GBufferChannels {
        let mut channels = GBufferChannels::empty();
        channels.set(GBufferChannels::BITANGENT, self.bitangent_w.is_some());
        channels.set(GBufferChannels::VIEW, self.view_w.is_some());
        channels.set(
            GBufferChannels::SURFACE_SPREAD_ANGLE,
            self.surface_spread_angle.is_some(),
        );
        channels.set(GBufferChannels::RAY_DIFFERENTIALS, self.ray_diffs.is_some());
        channels.set(GBufferChannels::VBUFFER, self.vbuffer.is_some());
        channels
    }

    fn index(&self, pixel: UVec2) -> Option<usize> {
        (pixel.x < self.width && pixel.y < self.height)
            .then_some((pixel.y * self.width + pixel.x) as usize)
    }

    /// Out of bounds pixels read as invalid
    pub fn texel(&self, pixel: UVec2) -> GBufferTexel {
        let Some(i) = self.index(pixel) else {
            return GBufferTexel::default();
        };
        GBufferTexel {
            pos_w: self.pos_w[i],
            normal_w: self.normal_w[i],
            tangent_w: self.tangent_w[i],
            face_normal_w: self.face_normal_w[i],
            tex_c: self.tex_c[i],
            material: MaterialParams {
                diffuse_opacity: self.mtl_diffuse_opacity[i],
                specular_roughness: self.mtl_spec_rough[i],
                emissive: self.mtl_emissive[i],
                extra_params: self.mtl_params[i],
            },
            bitangent_w: self.bitangent_w.as_ref().map(|c| c[i]),
            view_w: self.view_w.as_ref().map(|c| c[i]),
            surface_spread_angle: self.surface_spread_angle.as_ref().map(|c| c[i]),
            ray_diff: self
                .ray_diffs
                .as_ref()
                .map(|[x, y, z]| RayDiff::unpack([x[i], y[i], z[i]])),
            vbuffer: self.vbuffer.as_ref().map(|c| c[i]),
        }
    }

    /// Write every bound channel. Optional values missing from `texel` are written as zeros.
    pub fn set_texel(&mut self, pixel: UVec2, texel: &GBufferTexel) {
        let Some(i) = self.index(pixel) else {
            return;
        };
        self.pos_w[i] = texel.pos_w;
        self.normal_w[i] = texel.normal_w;
        self.tangent_w[i] = texel.tangent_w;
        self.face_normal_w[i] = texel.face_normal_w;
        self.tex_c[i] = texel.tex_c;
        self.mtl_diffuse_opacity[i] = texel.material.diffuse_opacity;
        self.mtl_spec_rough[i] = texel.material.specular_roughness;
        self.mtl_emissive[i] = texel.material.emissive;
        self.mtl_params[i] = texel.material.extra_params;

        if let Some(channel) = &mut self.bitangent_w {
            channel[i] = texel.bitangent_w.unwrap_or_default();
        }
        if let Some(channel) = &mut self.view_w {
            channel[i] = texel.view_w.unwrap_or_default();
        }
        if let Some(channel) = &mut self.surface_spread_angle {
            channel[i] = texel.surface_spread_angle.unwrap_or_default();
        }
        if let Some(channels) = &mut self.ray_diffs {
            let packed = texel.ray_diff.unwrap_or_default().pack();
            for (channel, value) in channels.iter_mut().zip(packed) {
                channel[i] = value;
            }
        }
        if let Some(channel) = &mut self.vbuffer {
            channel[i] = texel.vbuffer.unwrap_or_default();
        }
    }

    pub fn set_surface_spread_angle(&mut self, pixel: UVec2, angle: f32) {
        if let (Some(i), Some(channel)) = (self.index(pixel), self.surface_spread_angle.as_mut()) {
            channel[i] = angle;
        }
    }

    pub fn positions(&self) -> &[Vec4] {
        &self.pos_w
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normal_w
    }
}

impl ShadingData {
    /// Shading data of a primary hit read back from the G-buffer. Without a view channel the
    /// view vector points to `camera_pos`; without a bitangent channel it is derived from the
    /// normal and tangent.
    pub fn from_gbuffer(texel: &GBufferTexel, camera_pos: Vec3) -> Self {
        let pos_w = texel.pos_w.truncate();
        let v = texel
            .view_w
            .unwrap_or_else(|| (camera_pos - pos_w).normalize_or_zero());

        let geometry = GeometryParams {
            pos_w,
            normal: texel.normal_w,
            tangent: texel.tangent_w,
            uv: texel.tex_c,
            face_normal: texel.face_normal_w,
        };
        let mut sd = ShadingData::new(&geometry, &texel.material, v);
        if let Some(bitangent) = texel.bitangent_w {
            sd.b = bitangent;
        }
        sd
    }
}
