//! Pass executor
//!
//! Runs one declared pass per frame through `Idle -> Preparing -> Recording ->
//! Submitted`. GPU objects are only rebuilt when the pass targets report an
//! invalidation; everything else is reused and only refreshed in place.
//!
//! Ping-pong: frame resources alternate between two slots with the frame
//! counter. A feedback pass (one that samples its own target) also alternates
//! the images it renders into, and samples the image written the frame
//! before.

use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::backend::*;
use crate::binding::{merge_bindings, BindingConflict, BindingKind, BindingSet};
use crate::cache::DescriptorCache;
use crate::diagnostics::{DiagnosticsSender, Message};
use crate::error::RenderError;
use crate::render_graph::{FrameInputs, FrameUniforms, PassFrameData, PassTargets};
use crate::scene::{GeometrySource, MeshData, PassDecl, PassKind, SceneDescription, SourceLocation};
use crate::shader::CompiledShader;
use crate::surface::{AllocationState, SurfaceId, SurfaceStore};
use crate::RendererConfig;

/// Errors that skip a pass for the current frame and invalidate the scene
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("pass '{pass}' declares no targets")]
    NoTargets { pass: String },
    #[error("pass '{pass}': target '{first}' is {first_size:?} but target '{other}' is {other_size:?}")]
    TargetSizeMismatch {
        pass: String,
        first: String,
        first_size: (u32, u32),
        other: String,
        other_size: (u32, u32),
    },
    #[error("pass '{pass}': target '{target}' is unavailable: {reason}")]
    TargetUnavailable {
        pass: String,
        target: String,
        reason: String,
    },
    #[error("pass '{pass}': sampler '{name}' does not name a declared surface")]
    UnknownSampler { pass: String, name: String },
    #[error("pass '{pass}': sampled surface '{name}' is unavailable: {reason}")]
    SamplerUnavailable {
        pass: String,
        name: String,
        reason: String,
    },
    #[error("pass '{pass}': shader '{name}' is not part of the scene")]
    UnknownShader {
        pass: String,
        name: String,
        location: Option<SourceLocation>,
    },
    #[error("pass '{pass}': {conflict}")]
    BindingConflict {
        pass: String,
        conflict: BindingConflict,
    },
    #[error("pass '{pass}': nothing to bind to {kind:?} binding '{name}'")]
    UnresolvedBinding {
        pass: String,
        name: String,
        kind: BindingKind,
        shader: PathBuf,
        line: Option<u32>,
    },
    #[error("pass '{pass}': {reason}")]
    Resource { pass: String, reason: String },
}

/// Executor state, see the module docs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Preparing,
    Recording,
    /// Waiting for the slot fence
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Submitted,
    Skipped,
}

/// Everything a pass needs from the orchestrator for one frame
pub(crate) struct FrameContext<'a, B: GpuBackend> {
    pub backend: &'a mut B,
    pub store: &'a mut SurfaceStore,
    pub cache: &'a mut DescriptorCache,
    pub diagnostics: &'a DiagnosticsSender,
    pub scene: &'a SceneDescription,
    pub inputs: &'a FrameInputs,
    pub config: &'a RendererConfig,
}

enum PassError {
    Structural(StructuralError),
    Fatal(RenderError),
}

impl PassError {
    fn backend(pass: &str, error: BackendError) -> Self {
        if error.is_fatal() {
            PassError::Fatal(RenderError::Backend(error))
        } else {
            PassError::Structural(StructuralError::Resource {
                pass: pass.to_string(),
                reason: error.to_string(),
            })
        }
    }
}

impl From<StructuralError> for PassError {
    fn from(error: StructuralError) -> Self {
        PassError::Structural(error)
    }
}

impl From<RenderError> for PassError {
    fn from(error: RenderError) -> Self {
        PassError::Fatal(error)
    }
}

#[derive(Debug, Clone, Copy)]
struct MeshBuffers {
    vertex: BufferHandle,
    index: Option<BufferHandle>,
    vertex_count: u32,
    index_count: u32,
}

/// Executes one pass of the scene
#[derive(Debug)]
pub struct PassExecutor {
    name: String,
    /// Index of the declaration in the scene
    index: usize,
    feedback: bool,
    state: PassState,
    targets: [PassTargets; 2],
    frames: [Option<PassFrameData>; 2],
    meshes: Vec<Option<MeshBuffers>>,
    /// Messages reported since the pass last succeeded
    reported: FxHashSet<String>,
    last_error: Option<StructuralError>,
}

impl PassExecutor {
    pub fn new(index: usize, pass: &PassDecl) -> Self {
        Self {
            name: pass.name.clone(),
            index,
            feedback: pass.is_feedback(),
            state: PassState::Idle,
            targets: [PassTargets::new(), PassTargets::new()],
            frames: [None, None],
            meshes: vec![None; pass.draws.len()],
            reported: FxHashSet::default(),
            last_error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    pub fn is_feedback(&self) -> bool {
        self.feedback
    }

    /// The error that skipped the most recent frame of this pass, if any
    pub fn last_error(&self) -> Option<&StructuralError> {
        self.last_error.as_ref()
    }

    /// Targets of a ping-pong slot
    pub fn targets(&self, slot: usize) -> &PassTargets {
        &self.targets[slot % 2]
    }

    /// Run the pass for the frame in `ctx`.
    ///
    /// Structural problems are reported and yield [`PassOutcome::Skipped`];
    /// only device loss is returned as an error.
    pub(crate) fn execute<B: GpuBackend>(
        &mut self,
        ctx: &mut FrameContext<'_, B>,
    ) -> Result<PassOutcome, RenderError> {
        let scene = ctx.scene;
        let pass = &scene.passes[self.index];
        let frame_slot = (ctx.inputs.frame_index % 2) as usize;
        let target_slot = if self.feedback { frame_slot } else { 0 };

        match self.run(ctx, pass, frame_slot, target_slot) {
            Ok(()) => {
                self.state = PassState::Submitted;
                self.last_error = None;
                // A later failure after recovery is a new event.
                self.reported.clear();
                Ok(PassOutcome::Submitted)
            }
            Err(PassError::Structural(error)) => {
                self.state = PassState::Idle;
                self.report(ctx, pass, error);
                Ok(PassOutcome::Skipped)
            }
            Err(PassError::Fatal(error)) => {
                self.state = PassState::Idle;
                Err(error)
            }
        }
    }

    fn run<B: GpuBackend>(
        &mut self,
        ctx: &mut FrameContext<'_, B>,
        pass: &PassDecl,
        frame_slot: usize,
        target_slot: usize,
    ) -> Result<(), PassError> {
        let backend_err = |e: BackendError| PassError::backend(&pass.name, e);

        // Idle -> Preparing once the slot's previous submission has retired
        if let Some(frame) = &mut self.frames[frame_slot] {
            frame.wait(ctx.backend, ctx.config.fence_timeout, &self.name)?;
        }
        self.state = PassState::Preparing;
        log::trace!(
            "Pass '{}' preparing (frame slot {}, target slot {})",
            self.name,
            frame_slot,
            target_slot
        );

        if pass.targets.is_empty() {
            return Err(StructuralError::NoTargets {
                pass: pass.name.clone(),
            }
            .into());
        }
        let sampled = self.resolve_samplers(ctx, pass)?;

        self.targets[target_slot].resolve(ctx.store, pass, target_slot)?;
        if self.targets[target_slot].needs_rebuild(ctx.store) {
            self.wait_all(ctx.backend, ctx.config)?;
            if self.targets[target_slot].is_built() {
                log::debug!("Pass '{}' targets changed, rebuilding", self.name);
            }
            self.targets[target_slot].destroy_objects(ctx.backend);
        }

        let shaders = draw_shaders(ctx.scene, pass)?;
        let merged = match merge_bindings(shaders.iter().flatten().map(Arc::as_ref)) {
            Ok(merged) => merged,
            Err(conflicts) => {
                let mut errors = conflicts.into_iter().map(|conflict| StructuralError::BindingConflict {
                    pass: pass.name.clone(),
                    conflict,
                });
                let first = errors.next();
                for extra in errors {
                    self.report(ctx, pass, extra);
                }
                return Err(first
                    .unwrap_or_else(|| StructuralError::Resource {
                        pass: pass.name.clone(),
                        reason: "binding merge failed".to_string(),
                    })
                    .into());
            }
        };

        let mut set_layouts = Vec::new();
        if let Some(max_set) = merged.max_set() {
            for set in 0..=max_set {
                let entries = merged.layout_entries(set);
                set_layouts.push(if entries.is_empty() {
                    None
                } else {
                    Some(ctx.cache.get_layout(ctx.backend, &entries).map_err(backend_err)?)
                });
            }
        }
        let pipeline_layout = ctx
            .cache
            .get_pipeline_layout(ctx.backend, &set_layouts)
            .map_err(backend_err)?;

        let uniform_buffer = match &mut self.frames[frame_slot] {
            Some(frame) => frame.uniform_buffer(),
            slot @ None => slot
                .insert(PassFrameData::create(ctx.backend, &self.name).map_err(backend_err)?)
                .uniform_buffer(),
        };
        let writes = self.descriptor_writes(ctx, pass, &merged, &sampled, uniform_buffer, target_slot)?;

        if let Err(error) = self.build_objects(ctx, pass, &shaders, pipeline_layout, target_slot) {
            // Don't leave half a pipeline set behind
            self.wait_all(ctx.backend, ctx.config)?;
            self.targets[target_slot].destroy_objects(ctx.backend);
            return Err(error);
        }
        self.upload_meshes(ctx.backend, pass).map_err(backend_err)?;

        let targets = &self.targets[target_slot];
        let Some(frame) = self.frames[frame_slot].as_mut() else {
            return Err(PassError::backend(
                &pass.name,
                BackendError::InvalidHandle("frame data".to_string()),
            ));
        };
        let uniforms = FrameUniforms::new(ctx.inputs, pass.camera.as_ref(), targets.size());
        frame.write_uniforms(ctx.backend, &uniforms).map_err(backend_err)?;

        let sets = frame
            .descriptor_sets(ctx.backend, ctx.cache, &set_layouts)
            .map_err(backend_err)?
            .to_vec();
        for (set, set_writes) in writes.iter().enumerate() {
            if let Some(Some(handle)) = sets.get(set) {
                if !set_writes.is_empty() {
                    ctx.backend.update_descriptor_set(*handle, set_writes);
                }
            }
        }

        // Preparing -> Recording
        self.state = PassState::Recording;
        let cmd = frame.command_buffer();
        ctx.backend.reset_command_buffer(cmd);
        ctx.backend.begin_command_buffer(cmd);
        let bind_point = match pass.kind {
            PassKind::Raster => PipelineBindPoint::Graphics,
            PassKind::RayTrace => PipelineBindPoint::RayTracing,
        };
        let (width, height) = targets.size();

        if let (Some(render_pass), Some(framebuffer)) = (targets.render_pass, targets.framebuffer) {
            ctx.backend.cmd_begin_render_pass(
                cmd,
                &RenderPassBegin {
                    render_pass,
                    framebuffer,
                    width,
                    height,
                    clear_color: pass.clear_color.unwrap_or(ctx.config.clear_color),
                    clear_depth: 1.0,
                },
            );
        }
        for (i, draw) in pass.draws.iter().enumerate() {
            let Some(pipeline) = targets.pipelines.get(i) else {
                continue;
            };
            ctx.backend.cmd_bind_pipeline(cmd, bind_point, *pipeline);
            for (set, handle) in sets.iter().enumerate() {
                if let Some(handle) = handle {
                    ctx.backend
                        .cmd_bind_descriptor_set(cmd, bind_point, pipeline_layout, set as u32, *handle);
                }
            }
            match (pass.kind, &draw.geometry, self.meshes.get(i).copied().flatten()) {
                (PassKind::RayTrace, _, _) => ctx.backend.cmd_trace_rays(cmd, width, height, 1),
                (PassKind::Raster, GeometrySource::FullscreenTriangle, _) => {
                    ctx.backend.cmd_draw(cmd, 0..3, 0..draw.instances)
                }
                (PassKind::Raster, GeometrySource::Mesh(_), Some(mesh)) => {
                    ctx.backend.cmd_bind_vertex_buffer(cmd, mesh.vertex);
                    match mesh.index {
                        Some(index) => {
                            ctx.backend.cmd_bind_index_buffer(cmd, index, IndexFormat::Uint32);
                            ctx.backend
                                .cmd_draw_indexed(cmd, 0..mesh.index_count, 0, 0..draw.instances);
                        }
                        None => ctx.backend.cmd_draw(cmd, 0..mesh.vertex_count, 0..draw.instances),
                    }
                }
                (PassKind::Raster, GeometrySource::Mesh(mesh), None) => {
                    log::warn!("Pass '{}': mesh {} not uploaded", self.name, mesh.path.display());
                }
            }
        }
        if targets.render_pass.is_some() {
            ctx.backend.cmd_end_render_pass(cmd);
        }
        for id in targets.colors() {
            if let Some(image) = ctx.store.get(*id).image(target_slot) {
                ctx.backend.cmd_transition_to_shader_read(cmd, image.texture);
            }
        }
        ctx.backend.end_command_buffer(cmd);

        // Recording -> Submitted
        frame.submit(ctx.backend).map_err(backend_err)?;
        let written: Vec<SurfaceId> = targets.surfaces().collect();
        for id in written {
            ctx.store.mark_rendered(id, target_slot);
        }
        log::trace!("Pass '{}' submitted", self.name);
        Ok(())
    }

    /// Every sampler reference must name a usable surface, whether or not a
    /// shader binds it. File-backed surfaces load here on first use.
    fn resolve_samplers<B: GpuBackend>(
        &mut self,
        ctx: &mut FrameContext<'_, B>,
        pass: &PassDecl,
    ) -> Result<Vec<SurfaceId>, PassError> {
        let mut sampled = Vec::with_capacity(pass.samplers.len());
        for sampler in &pass.samplers {
            let unavailable = |reason: String| StructuralError::SamplerUnavailable {
                pass: pass.name.clone(),
                name: sampler.surface.clone(),
                reason,
            };
            let Some(id) = ctx.store.find(&sampler.surface) else {
                return Err(StructuralError::UnknownSampler {
                    pass: pass.name.clone(),
                    name: sampler.surface.clone(),
                }
                .into());
            };
            if let Err(error) = ctx.store.ensure_loaded(ctx.backend, id) {
                if error.is_fatal() {
                    return Err(PassError::Fatal(RenderError::DeviceLost(error.to_string())));
                }
                return Err(unavailable(error.to_string()).into());
            }
            let surface = ctx.store.get(id);
            if surface.state() != AllocationState::Loaded {
                return Err(unavailable(
                    surface.failure().unwrap_or("not allocated").to_string(),
                )
                .into());
            }
            sampled.push(id);
        }
        Ok(sampled)
    }

    /// Descriptor writes per set index for every merged binding.
    fn descriptor_writes<B: GpuBackend>(
        &self,
        ctx: &mut FrameContext<'_, B>,
        pass: &PassDecl,
        merged: &BindingSet,
        sampled: &[SurfaceId],
        uniform_buffer: BufferHandle,
        target_slot: usize,
    ) -> Result<Vec<Vec<DescriptorWrite>>, PassError> {
        let backend_err = |e: BackendError| PassError::backend(&pass.name, e);
        let mut writes: Vec<Vec<DescriptorWrite>> =
            vec![Vec::new(); merged.max_set().map_or(0, |max| max as usize + 1)];

        for binding in merged.iter() {
            let unresolved = || StructuralError::UnresolvedBinding {
                pass: pass.name.clone(),
                name: binding.meta.name.clone(),
                kind: binding.kind,
                shader: binding.meta.shader.clone(),
                line: binding.meta.line,
            };
            // A sampler reference feeds the binding named after it, or named
            // after the surface it samples.
            let reference = pass
                .samplers
                .iter()
                .position(|s| s.binding_name() == binding.meta.name)
                .or_else(|| pass.samplers.iter().position(|s| s.surface == binding.meta.name));

            let resource = match binding.kind {
                BindingKind::UniformBuffer => DescriptorResource::UniformBuffer {
                    buffer: uniform_buffer,
                    offset: 0,
                    size: std::mem::size_of::<FrameUniforms>() as u64,
                },
                BindingKind::StorageBuffer => return Err(unresolved().into()),
                BindingKind::Sampler => {
                    let sampler = match reference {
                        Some(r) => {
                            let sref = &pass.samplers[r];
                            ctx.store
                                .request_sampled(ctx.backend, sampled[r], sref.filter, sref.address_mode)
                                .map_err(backend_err)?
                        }
                        None => ctx.store.default_sampler(ctx.backend).map_err(backend_err)?,
                    };
                    DescriptorResource::Sampler(sampler)
                }
                BindingKind::SampledImage | BindingKind::CombinedImageSampler | BindingKind::StorageImage => {
                    let view = match reference {
                        Some(r) => self.sampled_view(ctx.store, pass, sampled[r], target_slot),
                        // Ray tracing passes write their targets as storage images
                        None if binding.kind == BindingKind::StorageImage => self
                            .targets[target_slot]
                            .colors()
                            .iter()
                            .find(|id| ctx.store.get(**id).name() == binding.meta.name)
                            .and_then(|id| ctx.store.get(*id).image(target_slot))
                            .map(|image| image.view),
                        None => None,
                    };
                    let Some(view) = view else {
                        return Err(unresolved().into());
                    };
                    match binding.kind {
                        BindingKind::SampledImage => DescriptorResource::SampledImage(view),
                        BindingKind::StorageImage => DescriptorResource::StorageImage(view),
                        _ => {
                            let sampler = match reference {
                                Some(r) => {
                                    let sref = &pass.samplers[r];
                                    ctx.store
                                        .request_sampled(ctx.backend, sampled[r], sref.filter, sref.address_mode)
                                        .map_err(backend_err)?
                                }
                                None => ctx.store.default_sampler(ctx.backend).map_err(backend_err)?,
                            };
                            DescriptorResource::CombinedImageSampler { view, sampler }
                        }
                    }
                }
            };

            let set_writes = &mut writes[binding.set as usize];
            for element in 0..binding.count {
                set_writes.push(DescriptorWrite {
                    binding: binding.binding,
                    array_element: element,
                    resource,
                });
            }
        }
        Ok(writes)
    }

    /// View a pass should sample for `id` this frame.
    ///
    /// Reading its own target, a feedback pass gets the image written the
    /// frame before; anything else gets the most recently written image.
    fn sampled_view(
        &self,
        store: &SurfaceStore,
        pass: &PassDecl,
        id: SurfaceId,
        target_slot: usize,
    ) -> Option<TextureViewHandle> {
        let surface = store.get(id);
        let own_target = pass.targets.iter().any(|t| t == surface.name());
        let image = if self.feedback && own_target {
            1 - target_slot
        } else {
            surface.last_written()
        };
        surface.image(image).map(|image| image.view)
    }

    /// Build the render pass, framebuffer and pipelines that are missing.
    fn build_objects<B: GpuBackend>(
        &mut self,
        ctx: &mut FrameContext<'_, B>,
        pass: &PassDecl,
        shaders: &[Vec<Arc<CompiledShader>>],
        pipeline_layout: PipelineLayoutHandle,
        target_slot: usize,
    ) -> Result<(), PassError> {
        let backend_err = |e: BackendError| PassError::backend(&pass.name, e);
        let targets = &mut self.targets[target_slot];
        let store = &*ctx.store;
        let (width, height) = targets.size();

        if pass.kind == PassKind::Raster && targets.render_pass.is_none() {
            let clear = pass.clear_color.unwrap_or(ctx.config.clear_color);
            let attachment = |id: &SurfaceId, default: TextureFormat| AttachmentDescriptor {
                format: store.get(*id).format().unwrap_or(default),
                load_op: LoadOp::Clear(clear),
            };
            let desc = RenderPassDescriptor {
                label: Some(pass.name.clone()),
                color_attachments: targets
                    .colors()
                    .iter()
                    .map(|id| attachment(id, ctx.config.default_target_format))
                    .collect(),
                depth_attachment: targets
                    .depth()
                    .map(|id| attachment(&id, ctx.config.default_depth_format)),
            };
            targets.render_pass = Some(ctx.backend.create_render_pass(&desc).map_err(backend_err)?);
        }

        if let (Some(render_pass), None) = (targets.render_pass, targets.framebuffer) {
            let mut attachments = Vec::new();
            for id in targets.surfaces() {
                let surface = store.get(id);
                let image = surface.image(target_slot).ok_or_else(|| StructuralError::TargetUnavailable {
                    pass: pass.name.clone(),
                    target: surface.name().to_string(),
                    reason: "not allocated".to_string(),
                })?;
                attachments.push(image.view);
            }
            let framebuffer = ctx
                .backend
                .create_framebuffer(&FramebufferDescriptor {
                    label: Some(pass.name.clone()),
                    render_pass,
                    attachments,
                    width,
                    height,
                })
                .map_err(backend_err)?;
            targets.framebuffer = Some(framebuffer);
        }

        while targets.pipelines.len() < pass.draws.len() {
            let i = targets.pipelines.len();
            let draw = &pass.draws[i];
            let stages: Vec<&CompiledShader> = shaders[i].iter().map(Arc::as_ref).collect();
            let label = Some(format!("{} draw {}", pass.name, i));
            let pipeline = match (pass.kind, targets.render_pass) {
                (PassKind::RayTrace, _) => ctx.backend.create_ray_tracing_pipeline(&RayTracingPipelineDescriptor {
                    label,
                    shaders: stages,
                    layout: pipeline_layout,
                }),
                (PassKind::Raster, Some(render_pass)) => {
                    ctx.backend.create_graphics_pipeline(&GraphicsPipelineDescriptor {
                        label,
                        shaders: stages,
                        layout: pipeline_layout,
                        render_pass,
                        color_target_count: targets.colors().len() as u32,
                        depth_test: targets.depth().is_some(),
                        vertex_input: match &draw.geometry {
                            GeometrySource::FullscreenTriangle => VertexInput::None,
                            GeometrySource::Mesh(mesh) => VertexInput::Interleaved {
                                stride: mesh.vertex_stride,
                            },
                        },
                    })
                }
                (PassKind::Raster, None) => Err(BackendError::RenderPassCreationFailed(
                    "no render pass".to_string(),
                )),
            }
            .map_err(backend_err)?;
            targets.pipelines.push(pipeline);
        }

        if targets.pipelines.len() == pass.draws.len() {
            log::trace!("Pass '{}' objects ready", pass.name);
        }
        Ok(())
    }

    fn upload_meshes<B: GpuBackend>(&mut self, backend: &mut B, pass: &PassDecl) -> BackendResult<()> {
        for (i, draw) in pass.draws.iter().enumerate() {
            let GeometrySource::Mesh(mesh) = &draw.geometry else {
                continue;
            };
            if self.meshes.get(i).copied().flatten().is_some() {
                continue;
            }
            let buffers = upload_mesh(backend, mesh)?;
            if let Some(slot) = self.meshes.get_mut(i) {
                *slot = Some(buffers);
            }
        }
        Ok(())
    }

    /// Wait for every in-flight slot of this pass.
    pub fn wait_all<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        config: &RendererConfig,
    ) -> Result<(), RenderError> {
        for frame in self.frames.iter_mut().flatten() {
            frame.wait(backend, config.fence_timeout, &self.name)?;
        }
        if self.state == PassState::Submitted {
            self.state = PassState::Idle;
        }
        Ok(())
    }

    /// Destroy all GPU objects of the pass. The device must be idle.
    pub fn destroy<B: GpuBackend>(mut self, backend: &mut B) {
        for targets in &mut self.targets {
            targets.destroy_objects(backend);
        }
        for frame in self.frames.iter_mut().filter_map(Option::take) {
            frame.destroy(backend);
        }
        for mesh in self.meshes.drain(..).flatten() {
            backend.destroy_buffer(mesh.vertex);
            if let Some(index) = mesh.index {
                backend.destroy_buffer(index);
            }
        }
    }

    /// Report a structural error once until the pass succeeds again.
    fn report<B: GpuBackend>(
        &mut self,
        ctx: &FrameContext<'_, B>,
        pass: &PassDecl,
        error: StructuralError,
    ) {
        let message = structural_message(ctx.scene, pass, &error);
        if self.reported.insert(message.to_string()) {
            ctx.diagnostics.report(message);
        } else {
            log::trace!("Pass '{}' still failing: {}", self.name, error);
        }
        self.last_error = Some(error);
    }
}

/// Shaders of every draw, in draw order.
fn draw_shaders(
    scene: &SceneDescription,
    pass: &PassDecl,
) -> Result<Vec<Vec<Arc<CompiledShader>>>, StructuralError> {
    pass.draws
        .iter()
        .map(|draw| {
            draw.shaders
                .iter()
                .map(|name| {
                    scene.shader(name).cloned().ok_or_else(|| StructuralError::UnknownShader {
                        pass: pass.name.clone(),
                        name: name.clone(),
                        location: draw.location.clone(),
                    })
                })
                .collect()
        })
        .collect()
}

fn upload_mesh<B: GpuBackend>(backend: &mut B, mesh: &MeshData) -> BackendResult<MeshBuffers> {
    let label = mesh.path.display().to_string();
    let vertex = backend.create_buffer(&BufferDescriptor {
        label: Some(format!("{label} vertices")),
        size: mesh.vertices.len() as u64,
        usage: BufferUsage::VERTEX | BufferUsage::HOST_VISIBLE,
    })?;
    backend.write_buffer(vertex, 0, &mesh.vertices)?;

    let index = if mesh.indices.is_empty() {
        None
    } else {
        let bytes: &[u8] = bytemuck::cast_slice(&mesh.indices);
        let index = backend.create_buffer(&BufferDescriptor {
            label: Some(format!("{label} indices")),
            size: bytes.len() as u64,
            usage: BufferUsage::INDEX | BufferUsage::HOST_VISIBLE,
        })?;
        backend.write_buffer(index, 0, bytes)?;
        Some(index)
    };

    log::debug!("Uploaded mesh {} ({} vertices)", label, mesh.vertex_count());
    Ok(MeshBuffers {
        vertex,
        index,
        vertex_count: mesh.vertex_count(),
        index_count: mesh.indices.len() as u32,
    })
}

/// Attribute a structural error to the declaration that caused it.
fn structural_message(scene: &SceneDescription, pass: &PassDecl, error: &StructuralError) -> Message {
    let pass_location = || match &pass.location {
        Some(location) => (location.path.clone(), Some(location.line)),
        None => (scene.path.clone(), None),
    };
    let sampler_location = |name: &str| {
        pass.samplers
            .iter()
            .find(|s| s.surface == name)
            .and_then(|s| s.location.as_ref())
            .map(|location| (location.path.clone(), Some(location.line)))
    };

    let (path, line) = match error {
        StructuralError::UnresolvedBinding { shader, line, .. } => (shader.clone(), *line),
        StructuralError::BindingConflict { conflict, .. } => {
            let (_, _, meta) = &conflict.second;
            (meta.shader.clone(), meta.line)
        }
        StructuralError::UnknownSampler { name, .. }
        | StructuralError::SamplerUnavailable { name, .. } => {
            sampler_location(name).unwrap_or_else(pass_location)
        }
        StructuralError::UnknownShader {
            location: Some(location),
            ..
        } => (location.path.clone(), Some(location.line)),
        _ => pass_location(),
    };
    Message::error(error.to_string()).at(path, line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{DrawDecl, SamplerRef};

    #[test]
    fn test_sampler_error_points_at_reference() {
        let scene = SceneDescription::new("scene.scenegraph");
        let mut sampler = SamplerRef::new("missing");
        sampler.location = Some(SourceLocation::new("scene.scenegraph", 14));
        let pass = PassDecl::new("bad")
            .target("out")
            .sample(sampler)
            .declared_at(SourceLocation::new("scene.scenegraph", 10));

        let error = StructuralError::UnknownSampler {
            pass: "bad".to_string(),
            name: "missing".to_string(),
        };
        let message = structural_message(&scene, &pass, &error);
        assert_eq!(message.line, Some(14));
        assert!(message.text.contains("missing"));
    }

    #[test]
    fn test_unknown_shader_is_structural() {
        let scene = SceneDescription::new("scene.scenegraph");
        let pass = PassDecl::new("main")
            .target("out")
            .draw(DrawDecl::fullscreen(&["nope.frag"]));

        let err = draw_shaders(&scene, &pass).unwrap_err();
        assert!(matches!(err, StructuralError::UnknownShader { ref name, .. } if name == "nope.frag"));
    }
}
