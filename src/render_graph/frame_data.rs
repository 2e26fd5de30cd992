//! Per-slot frame resources of a pass

use std::time::Duration;

use crate::backend::*;
use crate::cache::DescriptorCache;
use crate::error::RenderError;
use crate::render_graph::FrameUniforms;

/// Command buffer, fence, uniform buffer and descriptor sets of one pass slot.
///
/// Created on first use and reused every other frame. Only the uniform data
/// and descriptor contents change from frame to frame.
#[derive(Debug)]
pub struct PassFrameData {
    command_pool: CommandPoolHandle,
    command_buffer: CommandBufferHandle,
    fence: FenceHandle,
    uniform_buffer: BufferHandle,
    descriptor_sets: Vec<Option<DescriptorSetHandle>>,
    /// Layouts and cache epoch the sets were allocated for
    set_layouts: Vec<Option<DescriptorSetLayoutHandle>>,
    descriptor_epoch: u64,
    in_flight: bool,
}

impl PassFrameData {
    pub fn create<B: GpuBackend>(backend: &mut B, label: &str) -> BackendResult<Self> {
        let command_pool = backend.create_command_pool()?;
        let command_buffer = backend.allocate_command_buffer(command_pool)?;
        let fence = backend.create_fence(true)?;
        let uniform_buffer = backend.create_buffer(&BufferDescriptor {
            label: Some(format!("{label} uniforms")),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: BufferUsage::UNIFORM | BufferUsage::HOST_VISIBLE,
        })?;
        Ok(Self {
            command_pool,
            command_buffer,
            fence,
            uniform_buffer,
            descriptor_sets: Vec::new(),
            set_layouts: Vec::new(),
            descriptor_epoch: u64::MAX,
            in_flight: false,
        })
    }

    pub fn command_buffer(&self) -> CommandBufferHandle {
        self.command_buffer
    }

    pub fn uniform_buffer(&self) -> BufferHandle {
        self.uniform_buffer
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Block until the slot's last submission completed.
    ///
    /// A fence that doesn't signal within `timeout` means the device is lost.
    pub fn wait<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        timeout: Duration,
        pass: &str,
    ) -> Result<(), RenderError> {
        if !self.in_flight {
            return Ok(());
        }
        if backend.wait_for_fence(self.fence, timeout)? {
            self.in_flight = false;
            Ok(())
        } else {
            log::error!(
                "Fence of pass '{}' not signaled after {:?}, device lost",
                pass,
                timeout
            );
            Err(RenderError::FenceTimeout {
                pass: pass.to_string(),
                waited: timeout,
            })
        }
    }

    /// Upload this frame's uniform block.
    pub fn write_uniforms<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        uniforms: &FrameUniforms,
    ) -> BackendResult<()> {
        backend.write_buffer(self.uniform_buffer, 0, uniforms.as_bytes())
    }

    /// Descriptor sets for `layouts`, indexed by set number.
    ///
    /// Sets are allocated again only after a bulk reset of the cache or when
    /// the layouts change; otherwise the previous allocations are reused.
    pub fn descriptor_sets<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        cache: &mut DescriptorCache,
        layouts: &[Option<DescriptorSetLayoutHandle>],
    ) -> BackendResult<&[Option<DescriptorSetHandle>]> {
        if self.descriptor_epoch != cache.epoch() || self.set_layouts != layouts {
            let mut sets = Vec::with_capacity(layouts.len());
            for layout in layouts {
                sets.push(match layout {
                    Some(layout) => Some(cache.allocate(backend, *layout)?),
                    None => None,
                });
            }
            self.descriptor_sets = sets;
            self.set_layouts = layouts.to_vec();
            self.descriptor_epoch = cache.epoch();
        }
        Ok(&self.descriptor_sets)
    }

    /// Submit the recorded command buffer, signaling the slot fence.
    pub fn submit<B: GpuBackend>(&mut self, backend: &mut B) -> BackendResult<()> {
        backend.reset_fence(self.fence);
        backend.submit(self.command_buffer, self.fence)?;
        self.in_flight = true;
        Ok(())
    }

    /// Destroy the slot's objects. The slot must not be in flight.
    pub fn destroy<B: GpuBackend>(self, backend: &mut B) {
        backend.destroy_buffer(self.uniform_buffer);
        backend.destroy_fence(self.fence);
        backend.destroy_command_pool(self.command_pool);
    }
}
