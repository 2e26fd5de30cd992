//! The declarative scene consumed by the render graph.
//!
//! A [`SceneDescription`] is produced by the scene parser (on any thread) and
//! never modified afterwards. Passes run in declaration order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::{AddressMode, FilterMode, TextureFormat};
use crate::scene::CameraDecl;
use crate::shader::CompiledShader;

/// Where something was declared in the scene source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub path: PathBuf,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(path: impl Into<PathBuf>, line: u32) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

/// Size of a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceSize {
    Fixed { width: u32, height: u32 },
    /// Fraction of the framebuffer size
    Relative { scale_x: f32, scale_y: f32 },
}

impl Default for SurfaceSize {
    fn default() -> Self {
        SurfaceSize::Relative {
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

/// Where the pixels of a surface come from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SurfaceSource {
    /// Written by passes
    #[default]
    RenderTarget,
    /// Decoded from an image file on first use
    File(PathBuf),
    /// Updated from the CPU
    Procedural { width: u32, height: u32 },
}

/// A declared surface
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceDecl {
    pub format: TextureFormat,
    pub size: SurfaceSize,
    pub source: SurfaceSource,
    pub location: Option<SourceLocation>,
}

impl SurfaceDecl {
    pub fn target(format: TextureFormat) -> Self {
        Self {
            format,
            size: SurfaceSize::default(),
            source: SurfaceSource::RenderTarget,
            location: None,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            format: TextureFormat::Rgba8UnormSrgb,
            size: SurfaceSize::default(),
            source: SurfaceSource::File(path.into()),
            location: None,
        }
    }

    pub fn procedural(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            format,
            size: SurfaceSize::Fixed { width, height },
            source: SurfaceSource::Procedural { width, height },
            location: None,
        }
    }

    pub fn fixed(mut self, width: u32, height: u32) -> Self {
        self.size = SurfaceSize::Fixed { width, height };
        self
    }

    pub fn relative(mut self, scale_x: f32, scale_y: f32) -> Self {
        self.size = SurfaceSize::Relative { scale_x, scale_y };
        self
    }

    pub fn declared_at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_render_target(&self) -> bool {
        self.source == SurfaceSource::RenderTarget
    }
}

/// Mesh data prepared by the scene builder
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub path: PathBuf,
    /// Interleaved vertex bytes
    pub vertices: Vec<u8>,
    pub vertex_stride: u32,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> u32 {
        if self.vertex_stride == 0 {
            return 0;
        }
        (self.vertices.len() / self.vertex_stride as usize) as u32
    }
}

/// Geometry drawn by a draw declaration
#[derive(Debug, Clone, PartialEq)]
pub enum GeometrySource {
    /// Three vertices generated in the vertex shader
    FullscreenTriangle,
    Mesh(Arc<MeshData>),
}

/// One draw (or ray dispatch) of a pass
#[derive(Debug, Clone, PartialEq)]
pub struct DrawDecl {
    pub geometry: GeometrySource,
    /// Names of entries in [`SceneDescription::shaders`]
    pub shaders: Vec<String>,
    pub instances: u32,
    pub location: Option<SourceLocation>,
}

impl DrawDecl {
    pub fn fullscreen(shaders: &[&str]) -> Self {
        Self {
            geometry: GeometrySource::FullscreenTriangle,
            shaders: shaders.iter().map(|s| s.to_string()).collect(),
            instances: 1,
            location: None,
        }
    }

    pub fn mesh(mesh: Arc<MeshData>, shaders: &[&str]) -> Self {
        Self {
            geometry: GeometrySource::Mesh(mesh),
            shaders: shaders.iter().map(|s| s.to_string()).collect(),
            instances: 1,
            location: None,
        }
    }

    pub fn instances(mut self, instances: u32) -> Self {
        self.instances = instances;
        self
    }

    pub fn declared_at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

/// A surface sampled by a pass
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerRef {
    pub surface: String,
    /// Shader binding the surface is bound to; defaults to the surface name
    pub binding: Option<String>,
    pub filter: FilterMode,
    pub address_mode: AddressMode,
    pub location: Option<SourceLocation>,
}

impl SamplerRef {
    pub fn new(surface: &str) -> Self {
        Self {
            surface: surface.to_string(),
            binding: None,
            filter: FilterMode::default(),
            address_mode: AddressMode::default(),
            location: None,
        }
    }

    /// Name of the shader binding this reference feeds
    pub fn binding_name(&self) -> &str {
        self.binding.as_deref().unwrap_or(&self.surface)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassKind {
    #[default]
    Raster,
    RayTrace,
}

/// A declared pass
#[derive(Debug, Clone, PartialEq)]
pub struct PassDecl {
    pub name: String,
    pub kind: PassKind,
    pub targets: Vec<String>,
    pub depth: Option<String>,
    pub draws: Vec<DrawDecl>,
    pub samplers: Vec<SamplerRef>,
    pub camera: Option<CameraDecl>,
    pub clear_color: Option<[f32; 4]>,
    pub location: Option<SourceLocation>,
}

impl PassDecl {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: PassKind::Raster,
            targets: Vec::new(),
            depth: None,
            draws: Vec::new(),
            samplers: Vec::new(),
            camera: None,
            clear_color: None,
            location: None,
        }
    }

    pub fn ray_trace(mut self) -> Self {
        self.kind = PassKind::RayTrace;
        self
    }

    pub fn target(mut self, name: &str) -> Self {
        self.targets.push(name.to_string());
        self
    }

    pub fn depth(mut self, name: &str) -> Self {
        self.depth = Some(name.to_string());
        self
    }

    pub fn draw(mut self, draw: DrawDecl) -> Self {
        self.draws.push(draw);
        self
    }

    pub fn sample(mut self, sampler: SamplerRef) -> Self {
        self.samplers.push(sampler);
        self
    }

    /// Sample `surface` through the shader binding of the same name.
    pub fn sample_surface(self, surface: &str) -> Self {
        self.sample(SamplerRef::new(surface))
    }

    pub fn camera(mut self, camera: CameraDecl) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn clear(mut self, color: [f32; 4]) -> Self {
        self.clear_color = Some(color);
        self
    }

    pub fn declared_at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// A feedback pass samples one of its own targets.
    pub fn is_feedback(&self) -> bool {
        self.samplers
            .iter()
            .any(|s| self.targets.iter().any(|t| *t == s.surface))
    }
}

/// Immutable scene snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneDescription {
    /// Path of the scene source, used when a declaration has no location
    pub path: PathBuf,
    pub passes: Vec<PassDecl>,
    pub surfaces: BTreeMap<String, SurfaceDecl>,
    pub shaders: BTreeMap<String, Arc<CompiledShader>>,
}

impl SceneDescription {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_surface(mut self, name: &str, surface: SurfaceDecl) -> Self {
        self.surfaces.insert(name.to_string(), surface);
        self
    }

    pub fn with_shader(mut self, name: &str, shader: CompiledShader) -> Self {
        self.shaders.insert(name.to_string(), Arc::new(shader));
        self
    }

    pub fn with_pass(mut self, pass: PassDecl) -> Self {
        self.passes.push(pass);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn surface(&self, name: &str) -> Option<&SurfaceDecl> {
        self.surfaces.get(name)
    }

    pub fn shader(&self, name: &str) -> Option<&Arc<CompiledShader>> {
        self.shaders.get(name)
    }

    pub fn pass(&self, name: &str) -> Option<&PassDecl> {
        self.passes.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_detection() {
        let feedback = PassDecl::new("trail").target("accum").sample_surface("accum");
        let plain = PassDecl::new("blit").target("out").sample_surface("accum");
        assert!(feedback.is_feedback());
        assert!(!plain.is_feedback());
    }

    #[test]
    fn test_sampler_binding_name_defaults_to_surface() {
        let mut sampler = SamplerRef::new("noise");
        assert_eq!(sampler.binding_name(), "noise");
        sampler.binding = Some("u_noise".to_string());
        assert_eq!(sampler.binding_name(), "u_noise");
    }
}
