//! Common types shared between the render graph and backends

use bitflags::bitflags;

use crate::backend::traits::*;
use crate::binding::BindingKind;
use crate::shader::{CompiledShader, ShaderStages};

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Rgba16Float,
    Rgba32Float,
    R32Float,
    Rg32Float,
    Depth32Float,
    Depth24PlusStencil8,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth32Float | TextureFormat::Depth24PlusStencil8
        )
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::Depth32Float
            | TextureFormat::Depth24PlusStencil8
            | TextureFormat::R32Float => 4,
            TextureFormat::Rgba16Float | TextureFormat::Rg32Float => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }
}

bitflags! {
    /// Texture usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        const SAMPLED = 1 << 2;
        const STORAGE = 1 << 3;
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

bitflags! {
    /// Buffer usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const COPY_DST = 1 << 0;
        const INDEX = 1 << 1;
        const VERTEX = 1 << 2;
        const UNIFORM = 1 << 3;
        const STORAGE = 1 << 4;
        /// Host visible, written through [`GpuBackend::write_buffer`].
        const HOST_VISIBLE = 1 << 5;
    }
}

/// Texture descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Usage for images a pass renders into and later passes sample.
    pub fn render_target(label: &str, width: u32, height: u32, format: TextureFormat) -> Self {
        let mut usage = TextureUsage::RENDER_ATTACHMENT | TextureUsage::SAMPLED;
        if !format.is_depth() {
            usage |= TextureUsage::STORAGE | TextureUsage::COPY_SRC;
        }
        Self {
            label: Some(label.to_string()),
            width,
            height,
            format,
            usage,
        }
    }

    /// Usage for images uploaded from the CPU.
    pub fn uploaded(label: &str, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            label: Some(label.to_string()),
            width,
            height,
            format,
            usage: TextureUsage::SAMPLED | TextureUsage::COPY_DST,
        }
    }
}

/// Buffer descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: u64,
    pub usage: BufferUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

/// Sampler descriptor
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SamplerDescriptor {
    pub label: Option<String>,
    pub filter: FilterMode,
    pub address_mode: AddressMode,
}

/// One entry of a descriptor set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorLayoutEntry {
    pub binding: u32,
    pub kind: BindingKind,
    pub count: u32,
    pub stages: ShaderStages,
}

/// Per-kind capacity of a descriptor pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorPoolDescriptor {
    pub max_sets: u32,
    pub sizes: Vec<(BindingKind, u32)>,
}

/// The resource written into one descriptor binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorResource {
    UniformBuffer {
        buffer: BufferHandle,
        offset: u64,
        size: u64,
    },
    SampledImage(TextureViewHandle),
    CombinedImageSampler {
        view: TextureViewHandle,
        sampler: SamplerHandle,
    },
    StorageImage(TextureViewHandle),
    Sampler(SamplerHandle),
}

/// A write into a descriptor set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorWrite {
    pub binding: u32,
    pub array_element: u32,
    pub resource: DescriptorResource,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp {
    Clear([f32; 4]),
    Load,
}

/// Attachment description used when creating a render pass
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentDescriptor {
    pub format: TextureFormat,
    pub load_op: LoadOp,
}

/// Render pass descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDescriptor {
    pub label: Option<String>,
    pub color_attachments: Vec<AttachmentDescriptor>,
    pub depth_attachment: Option<AttachmentDescriptor>,
}

/// Framebuffer descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct FramebufferDescriptor {
    pub label: Option<String>,
    pub render_pass: RenderPassHandle,
    pub attachments: Vec<TextureViewHandle>,
    pub width: u32,
    pub height: u32,
}

/// Vertex input of a graphics pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInput {
    /// Vertices are generated in the shader from the vertex index.
    None,
    /// One interleaved vertex buffer with the given stride.
    Interleaved { stride: u32 },
}

/// Graphics pipeline descriptor
#[derive(Debug, Clone)]
pub struct GraphicsPipelineDescriptor<'a> {
    pub label: Option<String>,
    pub shaders: Vec<&'a CompiledShader>,
    pub layout: PipelineLayoutHandle,
    pub render_pass: RenderPassHandle,
    pub color_target_count: u32,
    pub depth_test: bool,
    pub vertex_input: VertexInput,
}

/// Ray tracing pipeline descriptor
#[derive(Debug, Clone)]
pub struct RayTracingPipelineDescriptor<'a> {
    pub label: Option<String>,
    pub shaders: Vec<&'a CompiledShader>,
    pub layout: PipelineLayoutHandle,
}

/// Arguments for beginning a render pass during recording
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassBegin {
    pub render_pass: RenderPassHandle,
    pub framebuffer: FramebufferHandle,
    pub width: u32,
    pub height: u32,
    pub clear_color: [f32; 4],
    pub clear_depth: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineBindPoint {
    Graphics,
    RayTracing,
}

/// Index format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}
