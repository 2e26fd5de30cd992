//! Shared setup for the scene graph integration tests.
//!
//! Everything runs on the headless backend, which counts every device call so
//! tests can assert exactly what was (re)built.

#![allow(dead_code)]

use std::time::Duration;

use hotgraph::backend::{BackendStats, HeadlessBackend, RecordedCommand, TextureFormat};
use hotgraph::binding::BindingKind;
use hotgraph::scene::{DrawDecl, PassDecl, SceneDescription, SurfaceDecl};
use hotgraph::shader::{CompiledShader, ShaderStages};
use hotgraph::{Message, RendererConfig, SceneRenderer};

pub const SCENE_PATH: &str = "scenes/test.scenegraph";
pub const VERTEX: &str = "shaders/fullscreen.vert";
pub const SOLID: &str = "shaders/solid.frag";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Vertex stage of the fullscreen triangle, no bindings
pub fn fullscreen_vertex() -> CompiledShader {
    CompiledShader::new(VERTEX, ShaderStages::VERTEX)
}

/// Fragment stage reading only the frame uniforms
pub fn solid_fragment() -> CompiledShader {
    CompiledShader::new(SOLID, ShaderStages::FRAGMENT).with_binding(
        0,
        0,
        BindingKind::UniformBuffer,
        "frame",
        Some(3),
    )
}

/// Fragment stage sampling `surface` at set 0, binding 1
pub fn sampling_fragment(path: &str, surface: &str) -> CompiledShader {
    solid_fragment_at(path).with_binding(
        0,
        1,
        BindingKind::CombinedImageSampler,
        surface,
        Some(4),
    )
}

fn solid_fragment_at(path: &str) -> CompiledShader {
    CompiledShader::new(path, ShaderStages::FRAGMENT).with_binding(
        0,
        0,
        BindingKind::UniformBuffer,
        "frame",
        Some(3),
    )
}

/// Scene with the shared shaders registered
pub fn base_scene() -> SceneDescription {
    SceneDescription::new(SCENE_PATH)
        .with_shader(VERTEX, fullscreen_vertex())
        .with_shader(SOLID, solid_fragment())
}

/// A pass drawing the solid shader into `target`
pub fn solid_pass(name: &str, target: &str) -> PassDecl {
    PassDecl::new(name)
        .target(target)
        .draw(DrawDecl::fullscreen(&[VERTEX, SOLID]))
}

/// Scenario A: one pass, one framebuffer-sized target, no samplers
pub fn single_pass_scene() -> SceneDescription {
    base_scene()
        .with_surface("color", SurfaceDecl::target(TextureFormat::Rgba8Unorm))
        .with_pass(solid_pass("main", "color"))
}

/// Test context wrapping a renderer on the headless backend
pub struct TestContext {
    pub renderer: SceneRenderer<HeadlessBackend>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(RendererConfig::default())
    }

    pub fn with_config(config: RendererConfig) -> Self {
        init_logging();
        Self {
            renderer: SceneRenderer::new(HeadlessBackend::new(), config),
        }
    }

    /// Config with a short fence timeout for hang tests
    pub fn with_fence_timeout(timeout: Duration) -> Self {
        Self::with_config(RendererConfig {
            fence_timeout: timeout,
            ..RendererConfig::default()
        })
    }

    pub fn load(&mut self, scene: SceneDescription) {
        self.renderer.load_scene(scene).expect("scene load failed");
    }

    /// Render `frames` frames at `size`, returning whether the last one drew.
    pub fn render(&mut self, size: (u32, u32), frames: usize) -> bool {
        let mut drawn = false;
        for _ in 0..frames {
            drawn = self.renderer.render_frame(size).expect("frame failed");
        }
        drawn
    }

    pub fn stats(&self) -> BackendStats {
        self.renderer.backend().stats()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.renderer.diagnostics().drain_all()
    }

    pub fn generation(&self, surface: &str) -> u64 {
        self.renderer
            .surface(surface)
            .map(|s| s.generation())
            .expect("unknown surface")
    }

    pub fn rendered(&self, surface: &str) -> bool {
        self.renderer
            .surface(surface)
            .map(|s| s.rendered())
            .unwrap_or(false)
    }

    /// Commands of the most recent submission
    pub fn last_commands(&self) -> Vec<RecordedCommand> {
        self.renderer
            .backend()
            .submissions()
            .last()
            .map(|s| s.commands.clone())
            .unwrap_or_default()
    }
}
