//! Merges the reflected bindings of every shader a pass uses.

use std::fmt;

use crate::binding::{BindingKind, BindingMeta, BindingSet};
use crate::shader::CompiledShader;

/// Two shaders declare the same slot with incompatible resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingConflict {
    pub set: u32,
    pub binding: u32,
    pub first: (BindingKind, u32, BindingMeta),
    pub second: (BindingKind, u32, BindingMeta),
}

fn describe(kind: BindingKind, count: u32, meta: &BindingMeta) -> String {
    let mut out = format!("{:?}", kind);
    if count > 1 {
        out.push_str(&format!("[{}]", count));
    }
    out.push_str(&format!(" '{}' in {}", meta.name, meta.shader.display()));
    if let Some(line) = meta.line {
        out.push_str(&format!(":{}", line));
    }
    out
}

impl fmt::Display for BindingConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind_a, count_a, meta_a) = &self.first;
        let (kind_b, count_b, meta_b) = &self.second;
        write!(
            f,
            "binding {}.{} conflicts: {} vs {}",
            self.set,
            self.binding,
            describe(*kind_a, *count_a, meta_a),
            describe(*kind_b, *count_b, meta_b)
        )
    }
}

/// Union the bindings of `shaders` by (set, binding).
///
/// Stage visibility of a slot shared by several shaders is the union of their
/// stages. A slot declared with a different kind or array length by two shaders
/// is a conflict; every conflict is returned, not only the first.
pub fn merge_bindings<'a>(
    shaders: impl IntoIterator<Item = &'a CompiledShader>,
) -> Result<BindingSet, Vec<BindingConflict>> {
    let mut merged = BindingSet::new();
    let mut conflicts = Vec::new();

    for shader in shaders {
        for binding in &shader.bindings {
            match merged.entry_mut(binding.set, binding.binding) {
                Some(existing) => {
                    if existing.kind != binding.kind || existing.count != binding.count {
                        conflicts.push(BindingConflict {
                            set: binding.set,
                            binding: binding.binding,
                            first: (existing.kind, existing.count, existing.meta.clone()),
                            second: (binding.kind, binding.count, binding.meta.clone()),
                        });
                        continue;
                    }
                    existing.stages |= binding.stages;
                }
                None => merged.insert(binding.clone()),
            }
        }
    }

    if conflicts.is_empty() {
        Ok(merged)
    } else {
        Err(conflicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::ShaderStages;

    fn vertex() -> CompiledShader {
        CompiledShader::new("quad.vert", ShaderStages::VERTEX)
            .with_binding(0, 0, BindingKind::UniformBuffer, "frame", Some(3))
    }

    #[test]
    fn test_stage_flags_are_unioned() {
        let fragment = CompiledShader::new("blur.frag", ShaderStages::FRAGMENT)
            .with_binding(0, 1, BindingKind::CombinedImageSampler, "source", Some(5))
            .with_binding(0, 0, BindingKind::UniformBuffer, "frame", Some(4));

        let merged = merge_bindings([&vertex(), &fragment]).unwrap();
        let frame = merged.get(0, 0).unwrap();
        assert_eq!(frame.stages, ShaderStages::VERTEX | ShaderStages::FRAGMENT);
        assert_eq!(frame.meta.shader.to_str(), Some("quad.vert"));
        assert_eq!(
            merged.get(0, 1).unwrap().stages,
            ShaderStages::FRAGMENT
        );
    }

    #[test]
    fn test_iteration_is_ascending() {
        let fragment = CompiledShader::new("a.frag", ShaderStages::FRAGMENT)
            .with_binding(1, 4, BindingKind::SampledImage, "d", None)
            .with_binding(1, 2, BindingKind::Sampler, "c", None)
            .with_binding(0, 3, BindingKind::SampledImage, "b", None);

        let merged = merge_bindings([&fragment, &vertex()]).unwrap();
        let order: Vec<_> = merged.iter().map(|b| (b.set, b.binding)).collect();
        assert_eq!(order, vec![(0, 0), (0, 3), (1, 2), (1, 4)]);
        assert_eq!(merged.max_set(), Some(1));
        assert_eq!(
            merged
                .layout_entries(1)
                .iter()
                .map(|e| e.binding)
                .collect::<Vec<_>>(),
            vec![2, 4]
        );
    }

    #[test]
    fn test_kind_conflict_names_both_shaders() {
        let fragment = CompiledShader::new("bad.frag", ShaderStages::FRAGMENT)
            .with_binding(0, 0, BindingKind::SampledImage, "image", Some(9));

        let conflicts = merge_bindings([&vertex(), &fragment]).unwrap_err();
        assert_eq!(conflicts.len(), 1);
        let text = conflicts[0].to_string();
        assert!(text.contains("quad.vert:3"), "{text}");
        assert!(text.contains("bad.frag:9"), "{text}");
    }
}
