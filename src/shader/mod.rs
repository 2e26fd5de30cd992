//! Pre-compiled shader modules and their reflected bindings.
//!
//! The render graph never compiles shaders. A [`CompiledShader`] arrives with
//! the scene description, carrying its code and the resource bindings it
//! declares, each tagged with the stage that uses it and the source line it
//! was declared on so diagnostics can point at it.

mod reflect;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bitflags::bitflags;

use crate::binding::{BindingKind, BindingMeta, ReflectedBinding};

pub use reflect::*;

bitflags! {
    /// Shader stage visibility
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
        const RAYGEN = 1 << 3;
        const MISS = 1 << 4;
        const CLOSEST_HIT = 1 << 5;
        const ANY_HIT = 1 << 6;
        const INTERSECTION = 1 << 7;
        const RASTER = Self::VERTEX.bits() | Self::FRAGMENT.bits();
        const RAY_TRACING = Self::RAYGEN.bits()
            | Self::MISS.bits()
            | Self::CLOSEST_HIT.bits()
            | Self::ANY_HIT.bits()
            | Self::INTERSECTION.bits();
    }
}

/// Shader code as handed to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderCode {
    SpirV(Arc<[u32]>),
    Wgsl(Arc<str>),
}

/// A compiled shader stage with reflected bindings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledShader {
    pub path: PathBuf,
    pub stage: ShaderStages,
    pub entry_point: String,
    pub code: ShaderCode,
    pub bindings: Vec<ReflectedBinding>,
}

impl CompiledShader {
    /// A shader without code, for backends that don't consume it.
    pub fn new(path: impl Into<PathBuf>, stage: ShaderStages) -> Self {
        Self {
            path: path.into(),
            stage,
            entry_point: "main".to_string(),
            code: ShaderCode::SpirV(Arc::from(Vec::new())),
            bindings: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: ShaderCode) -> Self {
        self.code = code;
        self
    }

    /// Declare a binding used by this stage.
    pub fn with_binding(
        mut self,
        set: u32,
        binding: u32,
        kind: BindingKind,
        name: &str,
        line: Option<u32>,
    ) -> Self {
        self.bindings.push(ReflectedBinding {
            set,
            binding,
            kind,
            count: 1,
            stages: self.stage,
            meta: BindingMeta {
                shader: self.path.clone(),
                line,
                name: name.to_string(),
            },
        });
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_ray_tracing(&self) -> bool {
        ShaderStages::RAY_TRACING.contains(self.stage)
    }
}
