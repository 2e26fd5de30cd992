//! Binding reflection with naga.

use std::path::{Path, PathBuf};
#[cfg(any(feature = "wgsl", feature = "spirv"))]
use std::sync::Arc;

use thiserror::Error;

use crate::binding::{BindingKind, BindingMeta, ReflectedBinding};
use crate::shader::{CompiledShader, ShaderCode, ShaderStages};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReflectError {
    #[error("{}: parse error: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("{}: validation error: {message}", .path.display())]
    Validation { path: PathBuf, message: String },
    #[error("{}: binding '{name}' is not supported: {reason}", .path.display())]
    Unsupported {
        path: PathBuf,
        name: String,
        reason: String,
    },
}

/// Reflect every entry point of a WGSL module.
#[cfg(feature = "wgsl")]
pub fn reflect_wgsl(path: &Path, source: &str) -> Result<Vec<CompiledShader>, ReflectError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ReflectError::Parse {
        path: path.to_path_buf(),
        message: e.emit_to_string(source),
    })?;
    reflect_module(path, &module, Some(source), ShaderCode::Wgsl(Arc::from(source)))
}

/// Reflect every entry point of a SPIR-V binary.
#[cfg(feature = "spirv")]
pub fn reflect_spirv(path: &Path, words: &[u32]) -> Result<Vec<CompiledShader>, ReflectError> {
    let options = naga::front::spv::Options::default();
    let module = naga::front::spv::parse_u8_slice(bytemuck::cast_slice(words), &options)
        .map_err(|e| ReflectError::Parse {
            path: path.to_path_buf(),
            message: format!("{e}"),
        })?;
    reflect_module(path, &module, None, ShaderCode::SpirV(Arc::from(words)))
}

#[cfg(any(feature = "wgsl", feature = "spirv"))]
fn reflect_module(
    path: &Path,
    module: &naga::Module,
    source: Option<&str>,
    code: ShaderCode,
) -> Result<Vec<CompiledShader>, ReflectError> {
    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    let info = validator
        .validate(module)
        .map_err(|e| ReflectError::Validation {
            path: path.to_path_buf(),
            message: format!("{e}"),
        })?;

    let mut shaders = Vec::with_capacity(module.entry_points.len());
    for (index, entry_point) in module.entry_points.iter().enumerate() {
        let stage = match entry_point.stage {
            naga::ShaderStage::Vertex => ShaderStages::VERTEX,
            naga::ShaderStage::Fragment => ShaderStages::FRAGMENT,
            naga::ShaderStage::Compute => ShaderStages::COMPUTE,
        };
        let usage = info.get_entry_point(index);

        let mut bindings = Vec::new();
        for (handle, var) in module.global_variables.iter() {
            let Some(resource) = &var.binding else {
                continue;
            };
            // Only bindings this entry point actually touches.
            if usage[handle].is_empty() {
                continue;
            }
            let name = var
                .name
                .clone()
                .unwrap_or_else(|| format!("binding{}", resource.binding));
            let Some((kind, count)) = classify(module, var, path, &name)? else {
                continue;
            };
            let line = source.map(|src| {
                module
                    .global_variables
                    .get_span(handle)
                    .location(src)
                    .line_number
            });
            bindings.push(ReflectedBinding {
                set: resource.group,
                binding: resource.binding,
                kind,
                count,
                stages: stage,
                meta: BindingMeta {
                    shader: path.to_path_buf(),
                    line,
                    name,
                },
            });
        }

        log::trace!(
            "Reflected {} '{}' ({:?}): {} bindings",
            path.display(),
            entry_point.name,
            stage,
            bindings.len()
        );
        shaders.push(CompiledShader {
            path: path.to_path_buf(),
            stage,
            entry_point: entry_point.name.clone(),
            code: code.clone(),
            bindings,
        });
    }
    Ok(shaders)
}

#[cfg(any(feature = "wgsl", feature = "spirv"))]
fn classify(
    module: &naga::Module,
    var: &naga::GlobalVariable,
    path: &Path,
    name: &str,
) -> Result<Option<(BindingKind, u32)>, ReflectError> {
    use naga::{AddressSpace, ArraySize, ImageClass, TypeInner};

    let unsupported = |reason: &str| ReflectError::Unsupported {
        path: path.to_path_buf(),
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let (inner, count) = match &module.types[var.ty].inner {
        TypeInner::BindingArray { base, size } => {
            let count = match size {
                ArraySize::Constant(n) => n.get(),
                _ => return Err(unsupported("runtime-sized binding arrays")),
            };
            (&module.types[*base].inner, count)
        }
        inner => (inner, 1),
    };

    let kind = match var.space {
        AddressSpace::Uniform => BindingKind::UniformBuffer,
        AddressSpace::Storage { .. } => BindingKind::StorageBuffer,
        AddressSpace::Handle => match inner {
            TypeInner::Image {
                class: ImageClass::Storage { .. },
                ..
            } => BindingKind::StorageImage,
            TypeInner::Image { .. } => BindingKind::SampledImage,
            TypeInner::Sampler { .. } => BindingKind::Sampler,
            _ => return Err(unsupported("handle type")),
        },
        _ => return Ok(None),
    };
    Ok(Some((kind, count)))
}

#[cfg(all(test, feature = "wgsl"))]
mod tests {
    use super::*;

    const BLUR: &str = r#"
struct Frame {
    time: vec4<f32>,
}

@group(0) @binding(0) var<uniform> frame: Frame;
@group(0) @binding(1) var source: texture_2d<f32>;
@group(0) @binding(2) var tex_sampler: sampler;

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let x = f32((index << 1u) & 2u);
    let y = f32(index & 2u);
    return vec4<f32>(x * 2.0 - 1.0, y * 2.0 - 1.0, frame.time.x, 1.0);
}

@fragment
fn fs_main(@builtin(position) pos: vec4<f32>) -> @location(0) vec4<f32> {
    return textureSample(source, tex_sampler, pos.xy / 256.0);
}
"#;

    #[test]
    fn test_reflect_wgsl_stage_usage() {
        let shaders = reflect_wgsl(Path::new("blur.wgsl"), BLUR).unwrap();
        assert_eq!(shaders.len(), 2);

        let vertex = shaders
            .iter()
            .find(|s| s.stage == ShaderStages::VERTEX)
            .unwrap();
        assert_eq!(vertex.bindings.len(), 1);
        assert_eq!(vertex.bindings[0].kind, BindingKind::UniformBuffer);
        assert_eq!(vertex.bindings[0].meta.name, "frame");
        assert_eq!(vertex.bindings[0].meta.line, Some(6));

        let fragment = shaders
            .iter()
            .find(|s| s.stage == ShaderStages::FRAGMENT)
            .unwrap();
        let kinds: Vec<_> = fragment.bindings.iter().map(|b| (b.binding, b.kind)).collect();
        assert_eq!(
            kinds,
            vec![(1, BindingKind::SampledImage), (2, BindingKind::Sampler)]
        );
    }

    #[test]
    fn test_reflect_wgsl_parse_error() {
        let err = reflect_wgsl(Path::new("broken.wgsl"), "fn main( {").unwrap_err();
        assert!(matches!(err, ReflectError::Parse { .. }));
        assert!(err.to_string().starts_with("broken.wgsl"));
    }
}
