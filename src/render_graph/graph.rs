//! Scene graph orchestrator
//!
//! Owns the backend and everything built on it for the active scene. A new
//! scene replaces the old one wholesale after a device idle-wait; within a
//! scene, frames only repair what the surface generations say is stale.

use std::sync::Arc;
use std::time::Instant;

use rustc_hash::FxHashMap;

use crate::backend::*;
use crate::cache::DescriptorCache;
use crate::diagnostics::{DiagnosticsBridge, DiagnosticsSender, Message};
use crate::error::{RenderError, Result};
use crate::render_graph::{
    AudioBands, CompatBlock, FrameContext, FrameInputs, PassExecutor, PassOutcome, PassState,
    StructuralError,
};
use crate::scene::{SceneDescription, SceneReceiver, SurfaceDecl};
use crate::surface::{AllocationState, Surface, SurfaceError, SurfaceStore};
use crate::RendererConfig;

/// A pass output as shown by the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetView {
    pub name: String,
    /// Display handle, unchanged until the surface is reallocated. For a
    /// feedback surface this is its first image, rewritten every other frame.
    /// `None` if the surface has no images.
    pub view: Option<TextureViewHandle>,
    /// Whether the image holds output since it was allocated
    pub rendered: bool,
}

/// Renders a [`SceneDescription`] frame after frame on a [`GpuBackend`]
pub struct SceneRenderer<B: GpuBackend> {
    backend: B,
    config: RendererConfig,
    store: SurfaceStore,
    cache: DescriptorCache,
    diagnostics: DiagnosticsBridge,
    sender: DiagnosticsSender,
    audio: Arc<AudioBands>,
    scene: Option<Arc<SceneDescription>>,
    /// One executor per declared pass, in declaration order
    executors: Vec<PassExecutor>,
    by_name: FxHashMap<String, usize>,
    scene_valid: bool,
    frame_counter: u64,
    scene_start: Instant,
    last_frame: Option<Instant>,
    compat: CompatBlock,
}

impl<B: GpuBackend> SceneRenderer<B> {
    pub fn new(backend: B, config: RendererConfig) -> Self {
        log::info!("Creating scene renderer on {} backend", backend.name());
        let diagnostics = DiagnosticsBridge::new(config.diagnostics_capacity);
        let sender = diagnostics.sender();
        Self {
            backend,
            cache: DescriptorCache::new(config.descriptor_sets_per_pool),
            config,
            store: SurfaceStore::new(),
            diagnostics,
            sender,
            audio: Arc::new(AudioBands::new()),
            scene: None,
            executors: Vec::new(),
            by_name: FxHashMap::default(),
            scene_valid: false,
            frame_counter: 0,
            scene_start: Instant::now(),
            last_frame: None,
            compat: CompatBlock::default(),
        }
    }

    /// Replace the active scene.
    ///
    /// Waits for the device, tears down everything built for the previous
    /// scene and creates one executor per pass. The scene stays invalid until
    /// a frame gets every pass through.
    pub fn load_scene(&mut self, scene: impl Into<Arc<SceneDescription>>) -> Result<()> {
        let scene = scene.into();
        self.destroy_scene()?;

        for (name, decl) in &scene.surfaces {
            self.store.get_or_create(name, || decl.clone());
        }
        for (index, pass) in scene.passes.iter().enumerate() {
            let format = self.config.default_target_format;
            let mut ids: Vec<_> = pass
                .targets
                .iter()
                .map(|name| self.store.get_or_create(name, || SurfaceDecl::target(format)))
                .collect();
            if let Some(depth) = &pass.depth {
                let format = self.config.default_depth_format;
                ids.push(self.store.get_or_create(depth, || SurfaceDecl::target(format)));
            }
            if pass.is_feedback() {
                for id in ids {
                    self.store.mark_feedback(id);
                }
            }

            if self.by_name.contains_key(&pass.name) {
                log::warn!("Pass name '{}' declared more than once", pass.name);
            } else {
                self.by_name.insert(pass.name.clone(), index);
            }
            self.executors.push(PassExecutor::new(index, pass));
        }

        log::info!(
            "Loaded scene {} ({} passes, {} surfaces)",
            scene.path.display(),
            scene.passes.len(),
            self.store.len()
        );
        self.scene = Some(scene);
        self.scene_start = Instant::now();
        self.last_frame = None;
        Ok(())
    }

    /// Take the newest scene from the hand-off channel, if any.
    ///
    /// Returns whether a new scene was loaded.
    pub fn poll_scene_updates(&mut self, receiver: &SceneReceiver) -> Result<bool> {
        match receiver.latest() {
            Some(scene) => {
                self.load_scene(scene)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Render one frame at the given framebuffer size.
    ///
    /// Returns whether any pass submitted work. Structural problems are
    /// reported through [`diagnostics`](Self::diagnostics) and stop the
    /// remaining passes of this frame; only device loss is an error.
    pub fn render_frame(&mut self, framebuffer: (u32, u32)) -> Result<bool> {
        let Some(scene) = self.scene.clone() else {
            return Ok(false);
        };
        if scene.passes.is_empty() {
            return Ok(false);
        }

        if let Err(err) = self.size_surfaces(&scene, framebuffer) {
            self.scene_valid = false;
            return Err(err);
        }

        let now = Instant::now();
        let inputs = FrameInputs {
            time: now.duration_since(self.scene_start).as_secs_f32(),
            delta: self
                .last_frame
                .map_or(0.0, |last| now.duration_since(last).as_secs_f32()),
            frame_index: self.frame_counter,
            audio: self.audio.snapshot(),
            compat: self.compat,
        };
        self.last_frame = Some(now);

        let mut ctx = FrameContext {
            backend: &mut self.backend,
            store: &mut self.store,
            cache: &mut self.cache,
            diagnostics: &self.sender,
            scene: &scene,
            inputs: &inputs,
            config: &self.config,
        };
        let mut drawn = false;
        let mut all_passed = true;
        for executor in &mut self.executors {
            match executor.execute(&mut ctx) {
                Ok(PassOutcome::Submitted) => drawn = true,
                Ok(PassOutcome::Skipped) => {
                    all_passed = false;
                    break;
                }
                Err(err) => {
                    log::error!("Frame {} aborted: {}", self.frame_counter, err);
                    self.scene_valid = false;
                    return Err(err);
                }
            }
        }

        if all_passed != self.scene_valid {
            log::info!(
                "Scene {} is now {}",
                scene.path.display(),
                if all_passed { "valid" } else { "invalid" }
            );
        }
        self.scene_valid = all_passed;
        self.frame_counter += 1;
        Ok(drawn)
    }

    /// Bring every render target to its size for this framebuffer.
    ///
    /// Any reallocation happens after a device idle-wait and is followed by a
    /// bulk descriptor reset, since old sets may point at destroyed views.
    fn size_surfaces(&mut self, scene: &SceneDescription, framebuffer: (u32, u32)) -> Result<()> {
        let pending: Vec<_> = self
            .store
            .iter()
            .filter(|(_, surface)| surface.decl().is_render_target())
            .map(|(id, surface)| (id, self.store.resolve_size(id, framebuffer), surface.decl().format))
            .filter(|(id, size, format)| self.store.needs_allocation(*id, *size, *format))
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        self.backend.wait_idle()?;
        for executor in &mut self.executors {
            executor.wait_all(&mut self.backend, &self.config)?;
        }
        for (id, size, format) in pending {
            match self.store.ensure_allocated(&mut self.backend, id, size, format) {
                Ok(_) => {}
                Err(err) if err.is_fatal() => return Err(RenderError::DeviceLost(err.to_string())),
                Err(err) => {
                    let surface = self.store.get(id);
                    self.sender.report(surface_message(scene, surface, &err));
                }
            }
        }
        self.cache.reset_all(&mut self.backend);
        Ok(())
    }

    /// Tear down the active scene after waiting for the device.
    pub fn destroy_scene(&mut self) -> Result<()> {
        let idle = self.backend.wait_idle();
        if let Err(err) = &idle {
            log::error!("Device did not go idle before teardown: {}", err);
        }

        for executor in self.executors.drain(..) {
            executor.destroy(&mut self.backend);
        }
        self.by_name.clear();
        self.store.clear(&mut self.backend);
        self.cache.reset_all(&mut self.backend);
        self.scene_valid = false;
        if let Some(scene) = self.scene.take() {
            log::info!("Destroyed scene {}", scene.path.display());
        }
        idle.map_err(RenderError::from)
    }

    /// Whether the last frame got every pass through
    pub fn scene_valid(&self) -> bool {
        self.scene_valid
    }

    pub fn scene(&self) -> Option<&Arc<SceneDescription>> {
        self.scene.as_ref()
    }

    pub fn diagnostics(&self) -> &DiagnosticsBridge {
        &self.diagnostics
    }

    /// Band values for the audio thread to write into
    pub fn audio(&self) -> Arc<AudioBands> {
        Arc::clone(&self.audio)
    }

    pub fn set_compat_block(&mut self, compat: CompatBlock) {
        self.compat = compat;
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Frames rendered since the renderer was created
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    pub fn surface(&self, name: &str) -> Option<&Surface> {
        self.store.find(name).map(|id| self.store.get(id))
    }

    /// Upload CPU pixels into a procedural surface.
    pub fn write_surface(&mut self, name: &str, data: &[u8]) -> std::result::Result<(), SurfaceError> {
        let id = self.store.find(name).ok_or_else(|| SurfaceError::Failed {
            name: name.to_string(),
            reason: "unknown surface".to_string(),
        })?;
        self.store.write_procedural(&mut self.backend, id, data)
    }

    pub fn pass_state(&self, name: &str) -> Option<PassState> {
        self.executor(name).map(PassExecutor::state)
    }

    /// The error that skipped the pass in the latest frame it ran
    pub fn pass_error(&self, name: &str) -> Option<&StructuralError> {
        self.executor(name).and_then(PassExecutor::last_error)
    }

    fn executor(&self, name: &str) -> Option<&PassExecutor> {
        self.by_name.get(name).map(|index| &self.executors[*index])
    }

    /// Every pass target of the active scene, in declaration order.
    pub fn target_views(&self) -> Vec<TargetView> {
        let Some(scene) = &self.scene else {
            return Vec::new();
        };
        let mut views: Vec<TargetView> = Vec::new();
        for name in scene.passes.iter().flat_map(|pass| &pass.targets) {
            if views.iter().any(|view| &view.name == name) {
                continue;
            }
            let Some(surface) = self.surface(name) else {
                continue;
            };
            views.push(TargetView {
                name: name.clone(),
                view: surface.image(0).map(|image| image.view),
                rendered: surface.state() == AllocationState::Loaded && surface.rendered(),
            });
        }
        views
    }
}

impl<B: GpuBackend> Drop for SceneRenderer<B> {
    fn drop(&mut self) {
        if let Err(err) = self.destroy_scene() {
            log::warn!("Scene teardown on drop: {}", err);
        }
        self.cache.destroy(&mut self.backend);
    }
}

fn surface_message(scene: &SceneDescription, surface: &Surface, err: &SurfaceError) -> Message {
    let message = Message::error(err.to_string());
    match &surface.decl().location {
        Some(location) => message.at(&location.path, Some(location.line)),
        None => message.at(&scene.path, None),
    }
}
