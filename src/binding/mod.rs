//! Resource bindings declared by shaders.

mod merger;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::backend::DescriptorLayoutEntry;
use crate::shader::ShaderStages;

pub use merger::*;

/// Kind of resource bound at a descriptor slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingKind {
    UniformBuffer,
    StorageBuffer,
    SampledImage,
    CombinedImageSampler,
    StorageImage,
    Sampler,
}

impl BindingKind {
    /// Kinds that read a surface.
    pub fn is_image(&self) -> bool {
        matches!(
            self,
            BindingKind::SampledImage
                | BindingKind::CombinedImageSampler
                | BindingKind::StorageImage
        )
    }
}

/// Where a binding was declared, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingMeta {
    pub shader: PathBuf,
    pub line: Option<u32>,
    pub name: String,
}

/// A binding as reflected from one shader stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedBinding {
    pub set: u32,
    pub binding: u32,
    pub kind: BindingKind,
    /// Array length, 1 for plain bindings
    pub count: u32,
    pub stages: ShaderStages,
    pub meta: BindingMeta,
}

impl ReflectedBinding {
    pub fn layout_entry(&self) -> DescriptorLayoutEntry {
        DescriptorLayoutEntry {
            binding: self.binding,
            kind: self.kind,
            count: self.count,
            stages: self.stages,
        }
    }
}

/// Bindings of a pass, grouped by set index then binding index.
///
/// Iteration is always in ascending (set, binding) order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingSet {
    sets: BTreeMap<u32, BTreeMap<u32, ReflectedBinding>>,
}

impl BindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn get(&self, set: u32, binding: u32) -> Option<&ReflectedBinding> {
        self.sets.get(&set)?.get(&binding)
    }

    pub(crate) fn entry_mut(&mut self, set: u32, binding: u32) -> Option<&mut ReflectedBinding> {
        self.sets.get_mut(&set)?.get_mut(&binding)
    }

    pub(crate) fn insert(&mut self, binding: ReflectedBinding) {
        self.sets
            .entry(binding.set)
            .or_default()
            .insert(binding.binding, binding);
    }

    /// Highest set index in use
    pub fn max_set(&self) -> Option<u32> {
        self.sets.keys().next_back().copied()
    }

    pub fn set_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.sets.keys().copied()
    }

    pub fn bindings(&self, set: u32) -> impl Iterator<Item = &ReflectedBinding> {
        self.sets.get(&set).into_iter().flat_map(|set| set.values())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReflectedBinding> {
        self.sets.values().flat_map(|set| set.values())
    }

    /// Layout entries of one set, sorted by binding index.
    pub fn layout_entries(&self, set: u32) -> Vec<DescriptorLayoutEntry> {
        self.bindings(set).map(ReflectedBinding::layout_entry).collect()
    }
}
