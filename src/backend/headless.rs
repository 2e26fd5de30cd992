//! Headless GPU backend for testing and offline runs.
//!
//! This backend doesn't perform actual GPU operations. It hands out handles,
//! enforces the object lifetimes a real device would (descriptor pool capacity,
//! double destroys, fences), records every command buffer and counts every call
//! so tests can assert exactly which objects the render graph (re)built.

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::backend::traits::*;
use crate::backend::types::*;

/// Per-call counters, compared by value in tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub textures_created: u32,
    pub textures_destroyed: u32,
    pub views_created: u32,
    pub views_destroyed: u32,
    pub texture_uploads: u32,
    pub samplers_created: u32,
    pub buffers_created: u32,
    pub buffer_writes: u32,
    pub set_layouts_created: u32,
    pub pipeline_layouts_created: u32,
    pub descriptor_pools_created: u32,
    pub descriptor_pool_resets: u32,
    pub descriptor_sets_allocated: u32,
    pub descriptor_updates: u32,
    pub render_passes_created: u32,
    pub render_passes_destroyed: u32,
    pub framebuffers_created: u32,
    pub framebuffers_destroyed: u32,
    pub pipelines_created: u32,
    pub pipelines_destroyed: u32,
    pub command_pools_created: u32,
    pub command_buffers_allocated: u32,
    pub fences_created: u32,
    pub fence_waits: u32,
    pub submits: u32,
    pub wait_idles: u32,
    /// Destroy calls on handles that were never created or already destroyed.
    pub invalid_destroys: u32,
}

impl BackendStats {
    /// Every call that allocates a device object.
    pub fn allocations(&self) -> u32 {
        self.textures_created
            + self.views_created
            + self.samplers_created
            + self.buffers_created
            + self.set_layouts_created
            + self.pipeline_layouts_created
            + self.descriptor_pools_created
            + self.descriptor_sets_allocated
            + self.render_passes_created
            + self.framebuffers_created
            + self.pipelines_created
            + self.command_pools_created
            + self.command_buffers_allocated
            + self.fences_created
    }
}

/// A command captured while recording a command buffer
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    BeginRenderPass(RenderPassBegin),
    EndRenderPass,
    BindPipeline(PipelineBindPoint, PipelineHandle),
    BindDescriptorSet {
        index: u32,
        set: DescriptorSetHandle,
    },
    BindVertexBuffer(BufferHandle),
    BindIndexBuffer(BufferHandle, IndexFormat),
    Draw {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
    DrawIndexed {
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    },
    TraceRays {
        width: u32,
        height: u32,
        depth: u32,
    },
    TransitionToShaderRead(TextureHandle),
}

/// A submitted command buffer with the commands it carried at submit time
#[derive(Debug, Clone)]
pub struct Submission {
    pub command_buffer: CommandBufferHandle,
    pub fence: FenceHandle,
    pub commands: Vec<RecordedCommand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectKind {
    Texture,
    View,
    Sampler,
    Buffer,
    SetLayout,
    PipelineLayout,
    DescriptorPool,
    RenderPass,
    Framebuffer,
    Pipeline,
    CommandPool,
    Fence,
}

#[derive(Debug, Default)]
struct PoolState {
    max_sets: u32,
    allocated: Vec<DescriptorSetHandle>,
}

/// Shared fence state so another thread can play the role of the GPU.
#[derive(Debug, Clone, Default)]
pub struct FenceSignaler {
    fences: Arc<Mutex<FxHashMap<FenceHandle, bool>>>,
}

impl FenceSignaler {
    /// Signal every fence, completing all outstanding work.
    pub fn signal_all(&self) {
        for signaled in self.fences.lock().values_mut() {
            *signaled = true;
        }
    }

    fn is_signaled(&self, fence: FenceHandle) -> Option<bool> {
        self.fences.lock().get(&fence).copied()
    }

    fn set(&self, fence: FenceHandle, signaled: bool) {
        self.fences.lock().insert(fence, signaled);
    }

    fn remove(&self, fence: FenceHandle) {
        self.fences.lock().remove(&fence);
    }
}

/// Submissions kept for inspection; older ones are dropped first.
pub const SUBMISSION_HISTORY: usize = 1024;

/// Headless GPU backend.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u64,
    stats: BackendStats,
    live: FxHashMap<u64, ObjectKind>,
    textures: FxHashMap<TextureHandle, TextureDescriptor>,
    views: FxHashMap<TextureViewHandle, TextureHandle>,
    buffers: FxHashMap<BufferHandle, Vec<u8>>,
    pools: FxHashMap<DescriptorPoolHandle, PoolState>,
    set_contents: FxHashMap<DescriptorSetHandle, Vec<DescriptorWrite>>,
    recordings: FxHashMap<CommandBufferHandle, Vec<RecordedCommand>>,
    submissions: Vec<Submission>,
    fences: FenceSignaler,
    /// Fences submitted while hanging, not yet seen signaled.
    pending: FxHashSet<FenceHandle>,
    hang_fences: bool,
    failing_textures: FxHashSet<String>,
}

impl HeadlessBackend {
    /// Create a new headless backend.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> BackendStats {
        self.stats
    }

    /// Number of device objects currently alive.
    pub fn live_objects(&self) -> usize {
        self.live.len()
    }

    /// When set, submitted work never completes until
    /// [`FenceSignaler::signal_all`] is called, like a hung GPU.
    pub fn set_hang_fences(&mut self, hang: bool) {
        self.hang_fences = hang;
    }

    pub fn fence_signaler(&self) -> FenceSignaler {
        self.fences.clone()
    }

    /// Make every future texture creation with this label fail.
    pub fn fail_texture_creation(&mut self, label: &str) {
        self.failing_textures.insert(label.to_string());
    }

    /// The most recent submissions, oldest first, at most [`SUBMISSION_HISTORY`].
    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    pub fn clear_submissions(&mut self) {
        self.submissions.clear();
    }

    /// The descriptor writes currently stored in a set.
    pub fn descriptor_set_contents(&self, set: DescriptorSetHandle) -> Option<&[DescriptorWrite]> {
        self.set_contents.get(&set).map(Vec::as_slice)
    }

    pub fn texture_descriptor(&self, texture: TextureHandle) -> Option<&TextureDescriptor> {
        self.textures.get(&texture)
    }

    /// The texture a live view was created from.
    pub fn view_texture(&self, view: TextureViewHandle) -> Option<TextureHandle> {
        self.views.get(&view).copied()
    }

    /// Last bytes written to a host-visible buffer.
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    fn allocate(&mut self, kind: ObjectKind) -> u64 {
        self.next_handle += 1;
        self.live.insert(self.next_handle, kind);
        self.next_handle
    }

    fn release(&mut self, raw: u64, kind: ObjectKind) -> bool {
        match self.live.get(&raw) {
            Some(live_kind) if *live_kind == kind => {
                self.live.remove(&raw);
                true
            }
            _ => {
                log::warn!("HeadlessBackend: invalid destroy of {:?} {}", kind, raw);
                self.stats.invalid_destroys += 1;
                false
            }
        }
    }

    fn is_live(&self, raw: u64, kind: ObjectKind) -> bool {
        self.live.get(&raw) == Some(&kind)
    }

    fn record(&mut self, cmd: CommandBufferHandle, command: RecordedCommand) {
        match self.recordings.get_mut(&cmd) {
            Some(commands) => commands.push(command),
            None => log::warn!("HeadlessBackend: recording into unknown command buffer {:?}", cmd),
        }
    }
}

impl GpuBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "Headless"
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        if let Some(label) = &desc.label {
            if self.failing_textures.contains(label) {
                return Err(BackendError::TextureCreationFailed(format!(
                    "injected failure for '{label}'"
                )));
            }
        }
        log::trace!(
            "HeadlessBackend: creating texture {:?} ({}x{} {:?})",
            desc.label,
            desc.width,
            desc.height,
            desc.format
        );
        let handle = TextureHandle(self.allocate(ObjectKind::Texture));
        self.textures.insert(handle, desc.clone());
        self.stats.textures_created += 1;
        Ok(handle)
    }

    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle> {
        if !self.is_live(texture.0, ObjectKind::Texture) {
            return Err(BackendError::InvalidHandle(format!("{texture:?}")));
        }
        let view = TextureViewHandle(self.allocate(ObjectKind::View));
        self.views.insert(view, texture);
        self.stats.views_created += 1;
        Ok(view)
    }

    fn write_texture(
        &mut self,
        texture: TextureHandle,
        data: &[u8],
        width: u32,
        height: u32,
    ) -> BackendResult<()> {
        let desc = self
            .textures
            .get(&texture)
            .ok_or_else(|| BackendError::InvalidHandle(format!("{texture:?}")))?;
        let expected = (width * height * desc.format.bytes_per_pixel()) as usize;
        if data.len() != expected {
            return Err(BackendError::InvalidHandle(format!(
                "texture upload of {} bytes, expected {}",
                data.len(),
                expected
            )));
        }
        self.stats.texture_uploads += 1;
        Ok(())
    }

    fn destroy_texture_view(&mut self, view: TextureViewHandle) {
        if self.release(view.0, ObjectKind::View) {
            self.views.remove(&view);
            self.stats.views_destroyed += 1;
        }
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.release(texture.0, ObjectKind::Texture) {
            self.textures.remove(&texture);
            self.stats.textures_destroyed += 1;
        }
    }

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle> {
        log::trace!("HeadlessBackend: creating sampler {:?}", desc.label);
        self.stats.samplers_created += 1;
        Ok(SamplerHandle(self.allocate(ObjectKind::Sampler)))
    }

    fn destroy_sampler(&mut self, sampler: SamplerHandle) {
        self.release(sampler.0, ObjectKind::Sampler);
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        log::trace!(
            "HeadlessBackend: creating buffer {:?} (size: {})",
            desc.label,
            desc.size
        );
        let handle = BufferHandle(self.allocate(ObjectKind::Buffer));
        self.buffers.insert(handle, vec![0; desc.size as usize]);
        self.stats.buffers_created += 1;
        Ok(handle)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> BackendResult<()> {
        let contents = self
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| BackendError::InvalidHandle(format!("{buffer:?}")))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            return Err(BackendError::InvalidHandle(format!(
                "write of {} bytes at {} overflows {:?}",
                data.len(),
                offset,
                buffer
            )));
        }
        contents[start..end].copy_from_slice(data);
        self.stats.buffer_writes += 1;
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.release(buffer.0, ObjectKind::Buffer) {
            self.buffers.remove(&buffer);
        }
    }

    fn create_descriptor_set_layout(
        &mut self,
        entries: &[DescriptorLayoutEntry],
    ) -> BackendResult<DescriptorSetLayoutHandle> {
        log::trace!(
            "HeadlessBackend: creating descriptor set layout with {} entries",
            entries.len()
        );
        self.stats.set_layouts_created += 1;
        Ok(DescriptorSetLayoutHandle(self.allocate(ObjectKind::SetLayout)))
    }

    fn destroy_descriptor_set_layout(&mut self, layout: DescriptorSetLayoutHandle) {
        self.release(layout.0, ObjectKind::SetLayout);
    }

    fn create_pipeline_layout(
        &mut self,
        set_layouts: &[DescriptorSetLayoutHandle],
    ) -> BackendResult<PipelineLayoutHandle> {
        for layout in set_layouts {
            if !self.is_live(layout.0, ObjectKind::SetLayout) {
                return Err(BackendError::InvalidHandle(format!("{layout:?}")));
            }
        }
        self.stats.pipeline_layouts_created += 1;
        Ok(PipelineLayoutHandle(self.allocate(ObjectKind::PipelineLayout)))
    }

    fn destroy_pipeline_layout(&mut self, layout: PipelineLayoutHandle) {
        self.release(layout.0, ObjectKind::PipelineLayout);
    }

    fn create_descriptor_pool(
        &mut self,
        desc: &DescriptorPoolDescriptor,
    ) -> BackendResult<DescriptorPoolHandle> {
        let handle = DescriptorPoolHandle(self.allocate(ObjectKind::DescriptorPool));
        self.pools.insert(
            handle,
            PoolState {
                max_sets: desc.max_sets,
                allocated: Vec::new(),
            },
        );
        self.stats.descriptor_pools_created += 1;
        Ok(handle)
    }

    fn allocate_descriptor_set(
        &mut self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
    ) -> BackendResult<DescriptorSetHandle> {
        if !self.is_live(layout.0, ObjectKind::SetLayout) {
            return Err(BackendError::InvalidHandle(format!("{layout:?}")));
        }
        let full = match self.pools.get(&pool) {
            Some(state) => state.allocated.len() as u32 >= state.max_sets,
            None => return Err(BackendError::InvalidHandle(format!("{pool:?}"))),
        };
        if full {
            return Err(BackendError::DescriptorPoolExhausted);
        }

        // Sets are owned by their pool, not tracked as standalone objects.
        self.next_handle += 1;
        let set = DescriptorSetHandle(self.next_handle);
        if let Some(state) = self.pools.get_mut(&pool) {
            state.allocated.push(set);
        }
        self.stats.descriptor_sets_allocated += 1;
        Ok(set)
    }

    fn reset_descriptor_pool(&mut self, pool: DescriptorPoolHandle) {
        if let Some(state) = self.pools.get_mut(&pool) {
            for set in state.allocated.drain(..) {
                self.set_contents.remove(&set);
            }
            self.stats.descriptor_pool_resets += 1;
        }
    }

    fn destroy_descriptor_pool(&mut self, pool: DescriptorPoolHandle) {
        if self.release(pool.0, ObjectKind::DescriptorPool) {
            if let Some(state) = self.pools.remove(&pool) {
                for set in state.allocated {
                    self.set_contents.remove(&set);
                }
            }
        }
    }

    fn update_descriptor_set(&mut self, set: DescriptorSetHandle, writes: &[DescriptorWrite]) {
        let contents = self.set_contents.entry(set).or_default();
        for write in writes {
            contents.retain(|existing| {
                existing.binding != write.binding || existing.array_element != write.array_element
            });
            contents.push(*write);
        }
        self.stats.descriptor_updates += 1;
    }

    fn create_render_pass(&mut self, desc: &RenderPassDescriptor) -> BackendResult<RenderPassHandle> {
        log::trace!("HeadlessBackend: creating render pass {:?}", desc.label);
        self.stats.render_passes_created += 1;
        Ok(RenderPassHandle(self.allocate(ObjectKind::RenderPass)))
    }

    fn destroy_render_pass(&mut self, render_pass: RenderPassHandle) {
        if self.release(render_pass.0, ObjectKind::RenderPass) {
            self.stats.render_passes_destroyed += 1;
        }
    }

    fn create_framebuffer(
        &mut self,
        desc: &FramebufferDescriptor,
    ) -> BackendResult<FramebufferHandle> {
        if !self.is_live(desc.render_pass.0, ObjectKind::RenderPass) {
            return Err(BackendError::InvalidHandle(format!("{:?}", desc.render_pass)));
        }
        for view in &desc.attachments {
            if !self.is_live(view.0, ObjectKind::View) {
                return Err(BackendError::InvalidHandle(format!("{view:?}")));
            }
        }
        log::trace!(
            "HeadlessBackend: creating framebuffer {:?} ({}x{})",
            desc.label,
            desc.width,
            desc.height
        );
        self.stats.framebuffers_created += 1;
        Ok(FramebufferHandle(self.allocate(ObjectKind::Framebuffer)))
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        if self.release(framebuffer.0, ObjectKind::Framebuffer) {
            self.stats.framebuffers_destroyed += 1;
        }
    }

    fn create_graphics_pipeline(
        &mut self,
        desc: &GraphicsPipelineDescriptor<'_>,
    ) -> BackendResult<PipelineHandle> {
        if !self.is_live(desc.render_pass.0, ObjectKind::RenderPass) {
            return Err(BackendError::PipelineCreationFailed(format!(
                "render pass {:?} is not alive",
                desc.render_pass
            )));
        }
        if !self.is_live(desc.layout.0, ObjectKind::PipelineLayout) {
            return Err(BackendError::PipelineCreationFailed(format!(
                "pipeline layout {:?} is not alive",
                desc.layout
            )));
        }
        log::trace!(
            "HeadlessBackend: creating graphics pipeline {:?} ({} stages)",
            desc.label,
            desc.shaders.len()
        );
        self.stats.pipelines_created += 1;
        Ok(PipelineHandle(self.allocate(ObjectKind::Pipeline)))
    }

    fn create_ray_tracing_pipeline(
        &mut self,
        desc: &RayTracingPipelineDescriptor<'_>,
    ) -> BackendResult<PipelineHandle> {
        if !self.is_live(desc.layout.0, ObjectKind::PipelineLayout) {
            return Err(BackendError::PipelineCreationFailed(format!(
                "pipeline layout {:?} is not alive",
                desc.layout
            )));
        }
        log::trace!(
            "HeadlessBackend: creating ray tracing pipeline {:?}",
            desc.label
        );
        self.stats.pipelines_created += 1;
        Ok(PipelineHandle(self.allocate(ObjectKind::Pipeline)))
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineHandle) {
        if self.release(pipeline.0, ObjectKind::Pipeline) {
            self.stats.pipelines_destroyed += 1;
        }
    }

    fn create_command_pool(&mut self) -> BackendResult<CommandPoolHandle> {
        self.stats.command_pools_created += 1;
        Ok(CommandPoolHandle(self.allocate(ObjectKind::CommandPool)))
    }

    fn allocate_command_buffer(
        &mut self,
        pool: CommandPoolHandle,
    ) -> BackendResult<CommandBufferHandle> {
        if !self.is_live(pool.0, ObjectKind::CommandPool) {
            return Err(BackendError::InvalidHandle(format!("{pool:?}")));
        }
        self.next_handle += 1;
        let cmd = CommandBufferHandle(self.next_handle);
        self.recordings.insert(cmd, Vec::new());
        self.stats.command_buffers_allocated += 1;
        Ok(cmd)
    }

    fn reset_command_buffer(&mut self, cmd: CommandBufferHandle) {
        if let Some(commands) = self.recordings.get_mut(&cmd) {
            commands.clear();
        }
    }

    fn destroy_command_pool(&mut self, pool: CommandPoolHandle) {
        self.release(pool.0, ObjectKind::CommandPool);
    }

    fn create_fence(&mut self, signaled: bool) -> BackendResult<FenceHandle> {
        let fence = FenceHandle(self.allocate(ObjectKind::Fence));
        self.fences.set(fence, signaled);
        self.stats.fences_created += 1;
        Ok(fence)
    }

    fn wait_for_fence(&mut self, fence: FenceHandle, timeout: Duration) -> BackendResult<bool> {
        self.stats.fence_waits += 1;
        let start = Instant::now();
        loop {
            match self.fences.is_signaled(fence) {
                Some(true) => return Ok(true),
                Some(false) => {}
                None => return Err(BackendError::InvalidHandle(format!("{fence:?}"))),
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
            std::thread::yield_now();
        }
    }

    fn reset_fence(&mut self, fence: FenceHandle) {
        if self.fences.is_signaled(fence).is_some() {
            self.fences.set(fence, false);
        }
    }

    fn destroy_fence(&mut self, fence: FenceHandle) {
        if self.release(fence.0, ObjectKind::Fence) {
            self.fences.remove(fence);
        }
    }

    fn submit(&mut self, cmd: CommandBufferHandle, fence: FenceHandle) -> BackendResult<()> {
        let commands = self
            .recordings
            .get(&cmd)
            .cloned()
            .ok_or_else(|| BackendError::SubmitFailed(format!("unknown {cmd:?}")))?;
        if self.fences.is_signaled(fence) != Some(false) {
            return Err(BackendError::SubmitFailed(format!(
                "{fence:?} must be unsignaled at submit"
            )));
        }
        log::trace!(
            "HeadlessBackend: submit {:?} with {} commands",
            cmd,
            commands.len()
        );
        if self.submissions.len() >= SUBMISSION_HISTORY {
            let excess = self.submissions.len() + 1 - SUBMISSION_HISTORY;
            self.submissions.drain(..excess);
        }
        self.submissions.push(Submission {
            command_buffer: cmd,
            fence,
            commands,
        });
        self.stats.submits += 1;

        // No actual GPU work, so completion is immediate unless a hang is simulated.
        if self.hang_fences {
            self.pending.insert(fence);
        } else {
            self.fences.set(fence, true);
        }
        Ok(())
    }

    fn wait_idle(&mut self) -> BackendResult<()> {
        self.stats.wait_idles += 1;
        let fences = &self.fences;
        self.pending
            .retain(|fence| fences.is_signaled(*fence) == Some(false));
        if !self.pending.is_empty() {
            return Err(BackendError::DeviceLost);
        }
        Ok(())
    }

    fn begin_command_buffer(&mut self, cmd: CommandBufferHandle) {
        self.reset_command_buffer(cmd);
    }

    fn end_command_buffer(&mut self, _cmd: CommandBufferHandle) {}

    fn cmd_begin_render_pass(&mut self, cmd: CommandBufferHandle, begin: &RenderPassBegin) {
        self.record(cmd, RecordedCommand::BeginRenderPass(begin.clone()));
    }

    fn cmd_end_render_pass(&mut self, cmd: CommandBufferHandle) {
        self.record(cmd, RecordedCommand::EndRenderPass);
    }

    fn cmd_bind_pipeline(
        &mut self,
        cmd: CommandBufferHandle,
        bind_point: PipelineBindPoint,
        pipeline: PipelineHandle,
    ) {
        self.record(cmd, RecordedCommand::BindPipeline(bind_point, pipeline));
    }

    fn cmd_bind_descriptor_set(
        &mut self,
        cmd: CommandBufferHandle,
        _bind_point: PipelineBindPoint,
        _layout: PipelineLayoutHandle,
        index: u32,
        set: DescriptorSetHandle,
    ) {
        self.record(cmd, RecordedCommand::BindDescriptorSet { index, set });
    }

    fn cmd_bind_vertex_buffer(&mut self, cmd: CommandBufferHandle, buffer: BufferHandle) {
        self.record(cmd, RecordedCommand::BindVertexBuffer(buffer));
    }

    fn cmd_bind_index_buffer(
        &mut self,
        cmd: CommandBufferHandle,
        buffer: BufferHandle,
        format: IndexFormat,
    ) {
        self.record(cmd, RecordedCommand::BindIndexBuffer(buffer, format));
    }

    fn cmd_draw(&mut self, cmd: CommandBufferHandle, vertices: Range<u32>, instances: Range<u32>) {
        self.record(cmd, RecordedCommand::Draw { vertices, instances });
    }

    fn cmd_draw_indexed(
        &mut self,
        cmd: CommandBufferHandle,
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    ) {
        self.record(
            cmd,
            RecordedCommand::DrawIndexed {
                indices,
                base_vertex,
                instances,
            },
        );
    }

    fn cmd_trace_rays(&mut self, cmd: CommandBufferHandle, width: u32, height: u32, depth: u32) {
        self.record(
            cmd,
            RecordedCommand::TraceRays {
                width,
                height,
                depth,
            },
        );
    }

    fn cmd_transition_to_shader_read(&mut self, cmd: CommandBufferHandle, texture: TextureHandle) {
        self.record(cmd, RecordedCommand::TransitionToShaderRead(texture));
    }
}
