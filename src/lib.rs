//! hotgraph - a live-reloadable render graph
//!
//! Maps a declarative scene description (passes, their targets, the shaders and
//! geometry they draw, the surfaces they sample) onto long-lived GPU objects and
//! repairs only what changed when the description is hot-edited.
//!
//! # Features
//! - Per-surface generation counters drive framebuffer/pipeline invalidation
//! - Feedback passes read their previous frame's output through ping-pong slots
//! - Per-slot fences keep resources untouched while the device still uses them
//! - Broken passes report diagnostics while the rest of the graph keeps rendering
//! - Backend-agnostic: everything goes through [`backend::GpuBackend`]

use std::time::Duration;

pub mod backend;
pub mod binding;
pub mod cache;
pub mod diagnostics;
pub mod error;
pub mod render_graph;
pub mod scene;
pub mod shader;
pub mod surface;

pub use backend::{GpuBackend, HeadlessBackend};
pub use diagnostics::{DiagnosticsBridge, Message, Severity};
pub use error::{RenderError, Result};
pub use render_graph::{AudioBands, FrameInputs, SceneRenderer};
pub use scene::SceneDescription;

use backend::TextureFormat;

/// Configuration for a [`SceneRenderer`]
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Longest wait on a pass fence before the device is considered lost
    pub fence_timeout: Duration,
    /// Descriptor sets per pool before a new pool is created
    pub descriptor_sets_per_pool: u32,
    /// Capacity of the diagnostics queue
    pub diagnostics_capacity: usize,
    /// Capacity of the scene hand-off queue
    pub scene_queue_depth: usize,
    /// Format of targets the scene does not declare
    pub default_target_format: TextureFormat,
    /// Format of depth surfaces the scene does not declare
    pub default_depth_format: TextureFormat,
    /// Clear colour for passes without their own
    pub clear_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            fence_timeout: Duration::from_secs(10),
            descriptor_sets_per_pool: 64,
            diagnostics_capacity: 256,
            scene_queue_depth: 2,
            default_target_format: TextureFormat::Rgba16Float,
            default_depth_format: TextureFormat::Depth32Float,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}
