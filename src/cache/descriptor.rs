//! Layout cache and pooled descriptor set allocation.
//!
//! Layouts are deduplicated by a hash of their sorted entries and live as long
//! as the cache. Descriptor sets come from fixed-capacity pools that are never
//! freed set by set: [`DescriptorCache::reset_all`] returns every pool in one
//! go and bumps the epoch, telling holders of old sets to allocate new ones.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};

use crate::backend::*;
use crate::binding::BindingKind;

const POOL_KINDS: [BindingKind; 6] = [
    BindingKind::UniformBuffer,
    BindingKind::StorageBuffer,
    BindingKind::SampledImage,
    BindingKind::CombinedImageSampler,
    BindingKind::StorageImage,
    BindingKind::Sampler,
];

/// Hash of sorted layout entries
fn layout_hash(entries: &[DescriptorLayoutEntry]) -> u64 {
    let mut hasher = FxHasher::default();
    entries.len().hash(&mut hasher);
    for entry in entries {
        entry.hash(&mut hasher);
    }
    hasher.finish()
}

/// Cache of layouts plus the descriptor pools sets are drawn from
#[derive(Debug)]
pub struct DescriptorCache {
    /// Hash buckets; entries are compared on lookup to rule out collisions.
    layouts: FxHashMap<u64, Vec<(Vec<DescriptorLayoutEntry>, DescriptorSetLayoutHandle)>>,
    pipeline_layouts: FxHashMap<Vec<DescriptorSetLayoutHandle>, PipelineLayoutHandle>,
    current_pool: Option<DescriptorPoolHandle>,
    used_pools: Vec<DescriptorPoolHandle>,
    free_pools: Vec<DescriptorPoolHandle>,
    sets_per_pool: u32,
    epoch: u64,
}

impl DescriptorCache {
    pub fn new(sets_per_pool: u32) -> Self {
        Self {
            layouts: FxHashMap::default(),
            pipeline_layouts: FxHashMap::default(),
            current_pool: None,
            used_pools: Vec::new(),
            free_pools: Vec::new(),
            sets_per_pool: sets_per_pool.max(1),
            epoch: 0,
        }
    }

    /// Incremented by every [`reset_all`](Self::reset_all)
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn layout_count(&self) -> usize {
        self.layouts.values().map(Vec::len).sum()
    }

    pub fn pool_count(&self) -> usize {
        self.used_pools.len() + self.free_pools.len() + self.current_pool.iter().count()
    }

    /// Return the cached layout for `entries`, creating it on first use.
    ///
    /// Entry order doesn't matter.
    pub fn get_layout<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        entries: &[DescriptorLayoutEntry],
    ) -> BackendResult<DescriptorSetLayoutHandle> {
        let mut sorted = entries.to_vec();
        sorted.sort();
        let hash = layout_hash(&sorted);

        let bucket = self.layouts.entry(hash).or_default();
        if let Some((_, layout)) = bucket.iter().find(|(cached, _)| *cached == sorted) {
            return Ok(*layout);
        }

        let layout = backend.create_descriptor_set_layout(&sorted)?;
        log::debug!(
            "Created descriptor set layout {:?} ({} bindings, hash {:016x})",
            layout,
            sorted.len(),
            hash
        );
        bucket.push((sorted, layout));
        Ok(layout)
    }

    /// Return the cached pipeline layout for sets `0..set_layouts.len()`.
    ///
    /// Gaps (`None`) get an empty set layout so set indices stay stable.
    pub fn get_pipeline_layout<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        set_layouts: &[Option<DescriptorSetLayoutHandle>],
    ) -> BackendResult<PipelineLayoutHandle> {
        let mut handles = Vec::with_capacity(set_layouts.len());
        for layout in set_layouts {
            match layout {
                Some(layout) => handles.push(*layout),
                None => handles.push(self.get_layout(backend, &[])?),
            }
        }

        if let Some(layout) = self.pipeline_layouts.get(&handles) {
            return Ok(*layout);
        }
        let layout = backend.create_pipeline_layout(&handles)?;
        self.pipeline_layouts.insert(handles, layout);
        Ok(layout)
    }

    /// Allocate a descriptor set, moving to a fresh pool when the current one
    /// is exhausted.
    pub fn allocate<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        layout: DescriptorSetLayoutHandle,
    ) -> BackendResult<DescriptorSetHandle> {
        let pool = match self.current_pool {
            Some(pool) => pool,
            None => self.next_pool(backend)?,
        };
        match backend.allocate_descriptor_set(pool, layout) {
            Err(BackendError::DescriptorPoolExhausted) => {
                // The full pool stays in use until the next bulk reset.
                self.used_pools.push(pool);
                self.current_pool = None;
                let pool = self.next_pool(backend)?;
                backend.allocate_descriptor_set(pool, layout)
            }
            result => result,
        }
    }

    fn next_pool<B: GpuBackend>(&mut self, backend: &mut B) -> BackendResult<DescriptorPoolHandle> {
        let pool = match self.free_pools.pop() {
            Some(pool) => pool,
            None => {
                let sizes = POOL_KINDS
                    .iter()
                    .map(|kind| (*kind, self.sets_per_pool * 4))
                    .collect();
                let pool = backend.create_descriptor_pool(&DescriptorPoolDescriptor {
                    max_sets: self.sets_per_pool,
                    sizes,
                })?;
                log::debug!("Created descriptor pool {:?}", pool);
                pool
            }
        };
        self.current_pool = Some(pool);
        Ok(pool)
    }

    /// Reset every pool in bulk and return them to the free list.
    ///
    /// All previously allocated sets become invalid. The device must not be
    /// using any of them.
    pub fn reset_all<B: GpuBackend>(&mut self, backend: &mut B) {
        let pools = self.used_pools.drain(..).chain(self.current_pool.take());
        for pool in pools {
            backend.reset_descriptor_pool(pool);
            self.free_pools.push(pool);
        }
        self.epoch += 1;
        log::debug!("Descriptor pools reset (epoch {})", self.epoch);
    }

    /// Destroy every pool and layout.
    pub fn destroy<B: GpuBackend>(&mut self, backend: &mut B) {
        let pools = self
            .used_pools
            .drain(..)
            .chain(self.free_pools.drain(..))
            .chain(self.current_pool.take());
        for pool in pools {
            backend.destroy_descriptor_pool(pool);
        }
        for (_, layout) in self.pipeline_layouts.drain() {
            backend.destroy_pipeline_layout(layout);
        }
        for (_, bucket) in self.layouts.drain() {
            for (_, layout) in bucket {
                backend.destroy_descriptor_set_layout(layout);
            }
        }
        self.epoch += 1;
    }
}
