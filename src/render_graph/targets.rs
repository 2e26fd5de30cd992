//! Pass target resolution and invalidation.
//!
//! A [`PassTargets`] binds a pass's declared target names to surfaces and
//! caches the render pass, framebuffer and pipelines built on top of them.
//! Those objects stay valid exactly as long as every referenced surface keeps
//! the generation recorded at the last check and the derived size is
//! unchanged.

use crate::backend::*;
use crate::render_graph::StructuralError;
use crate::scene::PassDecl;
use crate::surface::{AllocationState, SurfaceId, SurfaceStore};

/// Resolved targets and cached GPU objects of one pass slot
#[derive(Debug, Default)]
pub struct PassTargets {
    /// Color targets in declaration order
    colors: Vec<SurfaceId>,
    depth: Option<SurfaceId>,
    /// Generations seen by the last `needs_rebuild`
    generations: Vec<u64>,
    checked_size: Option<(u32, u32)>,
    size: (u32, u32),
    pub(crate) render_pass: Option<RenderPassHandle>,
    pub(crate) framebuffer: Option<FramebufferHandle>,
    pub(crate) pipelines: Vec<PipelineHandle>,
}

impl PassTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn colors(&self) -> &[SurfaceId] {
        &self.colors
    }

    pub fn depth(&self) -> Option<SurfaceId> {
        self.depth
    }

    /// Color targets followed by the depth target
    pub fn surfaces(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.colors.iter().copied().chain(self.depth)
    }

    /// Common size of all targets, valid after a successful resolve
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Whether the cached objects are all built
    pub fn is_built(&self) -> bool {
        self.render_pass.is_some() && self.framebuffer.is_some()
    }

    /// Resolve the declared target and depth names and check they agree in size.
    ///
    /// `image` is the image index the pass writes this frame; every target must
    /// have it allocated.
    pub fn resolve(
        &mut self,
        store: &SurfaceStore,
        pass: &PassDecl,
        image: usize,
    ) -> Result<(), StructuralError> {
        let mut colors = Vec::with_capacity(pass.targets.len());
        for name in &pass.targets {
            colors.push(lookup(store, pass, name, image)?);
        }
        let depth = match &pass.depth {
            Some(name) => Some(lookup(store, pass, name, image)?),
            None => None,
        };

        let mut first: Option<(SurfaceId, (u32, u32))> = None;
        for id in colors.iter().copied().chain(depth) {
            let size = store.get(id).current_size().unwrap_or((0, 0));
            match first {
                None => first = Some((id, size)),
                Some((first_id, first_size)) if first_size != size => {
                    return Err(StructuralError::TargetSizeMismatch {
                        pass: pass.name.clone(),
                        first: store.get(first_id).name().to_string(),
                        first_size,
                        other: store.get(id).name().to_string(),
                        other_size: size,
                    });
                }
                Some(_) => {}
            }
        }

        self.colors = colors;
        self.depth = depth;
        self.size = first.map(|(_, size)| size).unwrap_or((0, 0));
        Ok(())
    }

    /// True if any referenced surface was reallocated or the target size
    /// changed since the previous call.
    ///
    /// Refreshes the stored generations, so a second call without any change
    /// in between returns false. Never touches the backend.
    pub fn needs_rebuild(&mut self, store: &SurfaceStore) -> bool {
        let live: Vec<u64> = self
            .surfaces()
            .map(|id| store.get(id).generation())
            .collect();
        let changed = live != self.generations || self.checked_size != Some(self.size);
        self.generations = live;
        self.checked_size = Some(self.size);
        changed
    }

    /// Destroy the cached objects, framebuffer first.
    ///
    /// The device must be done with them.
    pub fn destroy_objects<B: GpuBackend>(&mut self, backend: &mut B) {
        if let Some(framebuffer) = self.framebuffer.take() {
            backend.destroy_framebuffer(framebuffer);
        }
        if let Some(render_pass) = self.render_pass.take() {
            backend.destroy_render_pass(render_pass);
        }
        for pipeline in self.pipelines.drain(..) {
            backend.destroy_pipeline(pipeline);
        }
    }
}

fn lookup(
    store: &SurfaceStore,
    pass: &PassDecl,
    name: &str,
    image: usize,
) -> Result<SurfaceId, StructuralError> {
    let unavailable = |reason: String| StructuralError::TargetUnavailable {
        pass: pass.name.clone(),
        target: name.to_string(),
        reason,
    };

    let id = store
        .find(name)
        .ok_or_else(|| unavailable("unknown surface".to_string()))?;
    let surface = store.get(id);
    if surface.state() == AllocationState::Failed {
        return Err(unavailable(
            surface.failure().unwrap_or("allocation failed").to_string(),
        ));
    }
    if !surface.decl().is_render_target() {
        return Err(unavailable("not a render target".to_string()));
    }
    if surface.image(image).is_none() {
        return Err(unavailable("not allocated".to_string()));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SurfaceDecl;

    fn store_with(
        backend: &mut HeadlessBackend,
        surfaces: &[(&str, (u32, u32))],
    ) -> SurfaceStore {
        let mut store = SurfaceStore::new();
        for (name, size) in surfaces {
            let id = store.get_or_create(name, || SurfaceDecl::target(TextureFormat::Rgba8Unorm));
            store
                .ensure_allocated(backend, id, *size, TextureFormat::Rgba8Unorm)
                .unwrap();
        }
        store
    }

    #[test]
    fn test_size_mismatch_is_structural() {
        let mut backend = HeadlessBackend::new();
        let store = store_with(&mut backend, &[("a", (64, 64)), ("b", (32, 32))]);
        let pass = PassDecl::new("split").target("a").target("b");

        let err = PassTargets::new().resolve(&store, &pass, 0).unwrap_err();
        assert_eq!(
            err,
            StructuralError::TargetSizeMismatch {
                pass: "split".to_string(),
                first: "a".to_string(),
                first_size: (64, 64),
                other: "b".to_string(),
                other_size: (32, 32),
            }
        );
    }

    #[test]
    fn test_needs_rebuild_is_idempotent() {
        let mut backend = HeadlessBackend::new();
        let store = store_with(&mut backend, &[("color", (64, 64))]);
        let pass = PassDecl::new("main").target("color");
        let mut targets = PassTargets::new();
        targets.resolve(&store, &pass, 0).unwrap();

        assert!(targets.needs_rebuild(&store));
        let stats = backend.stats();
        assert!(!targets.needs_rebuild(&store));
        assert!(!targets.needs_rebuild(&store));
        assert_eq!(backend.stats(), stats);
    }

    #[test]
    fn test_needs_rebuild_once_per_reallocation() {
        let mut backend = HeadlessBackend::new();
        let mut store = store_with(&mut backend, &[("color", (64, 64))]);
        let pass = PassDecl::new("main").target("color");
        let mut targets = PassTargets::new();
        targets.resolve(&store, &pass, 0).unwrap();
        assert!(targets.needs_rebuild(&store));

        let id = store.find("color").unwrap();
        let before = store.get(id).generation();
        store
            .ensure_allocated(&mut backend, id, (128, 128), TextureFormat::Rgba8Unorm)
            .unwrap();
        assert!(store.get(id).generation() > before);

        targets.resolve(&store, &pass, 0).unwrap();
        assert!(targets.needs_rebuild(&store));
        for _ in 0..3 {
            targets.resolve(&store, &pass, 0).unwrap();
            assert!(!targets.needs_rebuild(&store));
        }
    }

    #[test]
    fn test_unallocated_image_is_unavailable() {
        let mut backend = HeadlessBackend::new();
        let store = store_with(&mut backend, &[("color", (64, 64))]);
        let pass = PassDecl::new("main").target("color");

        let err = PassTargets::new().resolve(&store, &pass, 1).unwrap_err();
        assert!(matches!(err, StructuralError::TargetUnavailable { .. }));
    }
}
