//! Core backend abstraction traits
//!
//! The render graph never talks to a graphics API directly. Everything it needs
//! from the device goes through [`GpuBackend`], a deliberately primitive
//! capability surface: create/destroy objects, record commands, submit with a
//! fence and wait for it.

use std::ops::Range;
use std::time::Duration;

use thiserror::Error;

use crate::backend::types::*;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create pipeline: {0}")]
    PipelineCreationFailed(String),
    #[error("Failed to create render pass: {0}")]
    RenderPassCreationFailed(String),
    #[error("Descriptor pool exhausted")]
    DescriptorPoolExhausted,
    #[error("Failed to submit work: {0}")]
    SubmitFailed(String),
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

impl BackendError {
    /// Device loss cannot be recovered by the render graph.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BackendError::DeviceLost)
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw backend value, useful for display and logging.
            pub fn raw(&self) -> u64 {
                self.0
            }
        }
    };
}

gpu_handle!(
    /// Handle to a GPU texture
    TextureHandle
);
gpu_handle!(
    /// Handle to a texture view
    TextureViewHandle
);
gpu_handle!(
    /// Handle to a sampler
    SamplerHandle
);
gpu_handle!(
    /// Handle to a GPU buffer
    BufferHandle
);
gpu_handle!(
    /// Handle to a descriptor set layout
    DescriptorSetLayoutHandle
);
gpu_handle!(
    /// Handle to a pipeline layout
    PipelineLayoutHandle
);
gpu_handle!(
    /// Handle to a descriptor pool
    DescriptorPoolHandle
);
gpu_handle!(
    /// Handle to an allocated descriptor set
    DescriptorSetHandle
);
gpu_handle!(
    /// Handle to a render pass
    RenderPassHandle
);
gpu_handle!(
    /// Handle to a framebuffer
    FramebufferHandle
);
gpu_handle!(
    /// Handle to a graphics or ray tracing pipeline
    PipelineHandle
);
gpu_handle!(
    /// Handle to a command pool
    CommandPoolHandle
);
gpu_handle!(
    /// Handle to a command buffer
    CommandBufferHandle
);
gpu_handle!(
    /// Handle to a CPU-GPU completion fence
    FenceHandle
);

/// Main graphics backend trait
///
/// All methods are called from the render thread only.
pub trait GpuBackend {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    // Images

    /// Create a texture
    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle>;

    /// Create a view over a whole texture
    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle>;

    /// Upload tightly packed pixel data to a texture
    fn write_texture(
        &mut self,
        texture: TextureHandle,
        data: &[u8],
        width: u32,
        height: u32,
    ) -> BackendResult<()>;

    fn destroy_texture_view(&mut self, view: TextureViewHandle);

    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Create a sampler
    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle>;

    fn destroy_sampler(&mut self, sampler: SamplerHandle);

    // Buffers

    /// Create a buffer
    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle>;

    /// Map, copy and unmap host-visible memory
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> BackendResult<()>;

    fn destroy_buffer(&mut self, buffer: BufferHandle);

    // Layouts and descriptors

    /// Create a descriptor set layout
    fn create_descriptor_set_layout(
        &mut self,
        entries: &[DescriptorLayoutEntry],
    ) -> BackendResult<DescriptorSetLayoutHandle>;

    fn destroy_descriptor_set_layout(&mut self, layout: DescriptorSetLayoutHandle);

    /// Create a pipeline layout from descriptor set layouts, indexed by set number
    fn create_pipeline_layout(
        &mut self,
        set_layouts: &[DescriptorSetLayoutHandle],
    ) -> BackendResult<PipelineLayoutHandle>;

    fn destroy_pipeline_layout(&mut self, layout: PipelineLayoutHandle);

    /// Create a descriptor pool
    fn create_descriptor_pool(
        &mut self,
        desc: &DescriptorPoolDescriptor,
    ) -> BackendResult<DescriptorPoolHandle>;

    /// Allocate a descriptor set.
    ///
    /// Returns [`BackendError::DescriptorPoolExhausted`] when the pool is full.
    fn allocate_descriptor_set(
        &mut self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
    ) -> BackendResult<DescriptorSetHandle>;

    /// Return every set allocated from the pool in one operation
    fn reset_descriptor_pool(&mut self, pool: DescriptorPoolHandle);

    fn destroy_descriptor_pool(&mut self, pool: DescriptorPoolHandle);

    /// Write resources into a descriptor set
    fn update_descriptor_set(&mut self, set: DescriptorSetHandle, writes: &[DescriptorWrite]);

    // Render passes and pipelines

    /// Create a render pass
    fn create_render_pass(&mut self, desc: &RenderPassDescriptor) -> BackendResult<RenderPassHandle>;

    fn destroy_render_pass(&mut self, render_pass: RenderPassHandle);

    /// Create a framebuffer
    fn create_framebuffer(
        &mut self,
        desc: &FramebufferDescriptor,
    ) -> BackendResult<FramebufferHandle>;

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle);

    /// Create a graphics pipeline
    fn create_graphics_pipeline(
        &mut self,
        desc: &GraphicsPipelineDescriptor<'_>,
    ) -> BackendResult<PipelineHandle>;

    /// Create a ray tracing pipeline
    fn create_ray_tracing_pipeline(
        &mut self,
        desc: &RayTracingPipelineDescriptor<'_>,
    ) -> BackendResult<PipelineHandle>;

    fn destroy_pipeline(&mut self, pipeline: PipelineHandle);

    // Command buffers and synchronization

    /// Create a command pool
    fn create_command_pool(&mut self) -> BackendResult<CommandPoolHandle>;

    /// Allocate a primary command buffer from a pool
    fn allocate_command_buffer(
        &mut self,
        pool: CommandPoolHandle,
    ) -> BackendResult<CommandBufferHandle>;

    /// Reset a command buffer so it can be recorded again
    fn reset_command_buffer(&mut self, cmd: CommandBufferHandle);

    fn destroy_command_pool(&mut self, pool: CommandPoolHandle);

    /// Create a fence
    fn create_fence(&mut self, signaled: bool) -> BackendResult<FenceHandle>;

    /// Wait for a fence with a timeout.
    ///
    /// Returns `Ok(true)` if the fence was signaled, `Ok(false)` if the timeout elapsed.
    fn wait_for_fence(&mut self, fence: FenceHandle, timeout: Duration) -> BackendResult<bool>;

    /// Reset a fence to the unsignaled state
    fn reset_fence(&mut self, fence: FenceHandle);

    fn destroy_fence(&mut self, fence: FenceHandle);

    /// Submit a recorded command buffer, signaling `fence` on completion
    fn submit(&mut self, cmd: CommandBufferHandle, fence: FenceHandle) -> BackendResult<()>;

    /// Block until the device has finished all submitted work
    fn wait_idle(&mut self) -> BackendResult<()>;

    // Command recording

    fn begin_command_buffer(&mut self, cmd: CommandBufferHandle);

    fn end_command_buffer(&mut self, cmd: CommandBufferHandle);

    fn cmd_begin_render_pass(&mut self, cmd: CommandBufferHandle, begin: &RenderPassBegin);

    fn cmd_end_render_pass(&mut self, cmd: CommandBufferHandle);

    fn cmd_bind_pipeline(
        &mut self,
        cmd: CommandBufferHandle,
        bind_point: PipelineBindPoint,
        pipeline: PipelineHandle,
    );

    fn cmd_bind_descriptor_set(
        &mut self,
        cmd: CommandBufferHandle,
        bind_point: PipelineBindPoint,
        layout: PipelineLayoutHandle,
        index: u32,
        set: DescriptorSetHandle,
    );

    fn cmd_bind_vertex_buffer(&mut self, cmd: CommandBufferHandle, buffer: BufferHandle);

    fn cmd_bind_index_buffer(
        &mut self,
        cmd: CommandBufferHandle,
        buffer: BufferHandle,
        format: IndexFormat,
    );

    fn cmd_draw(&mut self, cmd: CommandBufferHandle, vertices: Range<u32>, instances: Range<u32>);

    fn cmd_draw_indexed(
        &mut self,
        cmd: CommandBufferHandle,
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    );

    fn cmd_trace_rays(&mut self, cmd: CommandBufferHandle, width: u32, height: u32, depth: u32);

    /// Transition a texture so shaders (and the UI) can sample it
    fn cmd_transition_to_shader_read(&mut self, cmd: CommandBufferHandle, texture: TextureHandle);
}
