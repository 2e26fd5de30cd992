//! Surface store
//!
//! Owns every surface of the active scene along with its GPU images, views and
//! samplers. Surfaces are never resized in place: a size or format change
//! destroys the backing images and allocates new ones, bumping the surface
//! generation so anything built on top of the old images knows to rebuild.

use rustc_hash::FxHashMap;

use crate::backend::*;
use crate::scene::{SurfaceDecl, SurfaceSize, SurfaceSource};
use crate::surface::{AllocationState, ImageData, Surface, SurfaceError, SurfaceId, SurfaceImage};

type SamplerKey = (FilterMode, AddressMode);

/// Owner of all surfaces of a scene
#[derive(Debug, Default)]
pub struct SurfaceStore {
    surfaces: Vec<Surface>,
    by_name: FxHashMap<String, SurfaceId>,
    samplers: FxHashMap<SamplerKey, SamplerHandle>,
}

impl SurfaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a surface by name, creating it from `decl` if it doesn't exist.
    pub fn get_or_create(&mut self, name: &str, decl: impl FnOnce() -> SurfaceDecl) -> SurfaceId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = SurfaceId(self.surfaces.len() as u32);
        self.surfaces.push(Surface::new(name, decl()));
        self.by_name.insert(name.to_string(), id);
        log::trace!("Created surface '{}' ({:?})", name, id);
        id
    }

    pub fn find(&self, name: &str) -> Option<SurfaceId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: SurfaceId) -> &Surface {
        &self.surfaces[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SurfaceId, &Surface)> {
        self.surfaces
            .iter()
            .enumerate()
            .map(|(i, surface)| (SurfaceId(i as u32), surface))
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Size the surface should have for the given framebuffer size.
    ///
    /// Fixed sizes win; relative sizes scale the framebuffer, never below 1x1.
    /// Loaded images keep the size of their pixels.
    pub fn resolve_size(&self, id: SurfaceId, framebuffer: (u32, u32)) -> (u32, u32) {
        let surface = self.get(id);
        match (&surface.decl.source, surface.decl.size) {
            (SurfaceSource::File(_), _) => surface.current_size.unwrap_or((1, 1)),
            (SurfaceSource::Procedural { width, height }, _) => (*width, *height),
            (SurfaceSource::RenderTarget, SurfaceSize::Fixed { width, height }) => {
                (width.max(1), height.max(1))
            }
            (SurfaceSource::RenderTarget, SurfaceSize::Relative { scale_x, scale_y }) => (
                ((framebuffer.0 as f32 * scale_x).floor() as u32).max(1),
                ((framebuffer.1 as f32 * scale_y).floor() as u32).max(1),
            ),
        }
    }

    /// Whether [`ensure_allocated`](Self::ensure_allocated) would replace the images.
    pub fn needs_allocation(&self, id: SurfaceId, size: (u32, u32), format: TextureFormat) -> bool {
        let surface = self.get(id);
        surface.state != AllocationState::Failed
            && (surface.current_size != Some(size)
                || surface.current_format != Some(format)
                || surface.allocated_images() != surface.required_images())
    }

    /// Make sure a render target is backed by images of `size` and `format`.
    ///
    /// Returns `Ok(true)` if the images were (re)allocated, in which case the
    /// generation was bumped exactly once. The caller must make sure the device
    /// no longer uses the old images.
    pub fn ensure_allocated<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        id: SurfaceId,
        size: (u32, u32),
        format: TextureFormat,
    ) -> Result<bool, SurfaceError> {
        if self.get(id).state == AllocationState::Failed {
            return Err(self.get(id).unavailable());
        }
        if !self.needs_allocation(id, size, format) {
            return Ok(false);
        }

        let surface = &mut self.surfaces[id.index()];
        destroy_images(backend, surface);
        surface.generation += 1;
        surface.rendered = false;
        surface.last_written = 0;

        let desc = TextureDescriptor::render_target(&surface.name, size.0, size.1, format);
        for index in 0..surface.required_images() {
            match create_image(backend, &desc) {
                Ok(image) => surface.images[index] = Some(image),
                Err(source) => {
                    destroy_images(backend, surface);
                    surface.state = AllocationState::Failed;
                    surface.failure = Some(source.to_string());
                    return Err(SurfaceError::Backend {
                        name: surface.name.clone(),
                        source,
                    });
                }
            }
        }

        surface.current_size = Some(size);
        surface.current_format = Some(format);
        surface.state = AllocationState::Loaded;
        log::debug!(
            "Allocated surface '{}' {}x{} {:?} x{} (generation {})",
            surface.name,
            size.0,
            size.1,
            format,
            surface.required_images(),
            surface.generation
        );
        Ok(true)
    }

    /// Load a file-backed or procedural surface on first use.
    ///
    /// A failure is remembered: later calls return the same error without
    /// touching the file again.
    pub fn ensure_loaded<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        id: SurfaceId,
    ) -> Result<(), SurfaceError> {
        let surface = &mut self.surfaces[id.index()];
        match surface.state {
            AllocationState::Loaded => return Ok(()),
            AllocationState::Failed => return Err(surface.unavailable()),
            AllocationState::Init => {}
        }

        let pixels = match &surface.decl.source {
            SurfaceSource::RenderTarget => return Ok(()),
            SurfaceSource::File(path) => match ImageData::from_file(path) {
                Ok(pixels) => pixels,
                Err(reason) => {
                    let reason = format!("{}: {}", path.display(), reason);
                    log::warn!("Failed to load surface '{}': {}", surface.name, reason);
                    surface.state = AllocationState::Failed;
                    surface.failure = Some(reason);
                    return Err(surface.unavailable());
                }
            },
            SurfaceSource::Procedural { width, height } => {
                ImageData::solid_color(*width, *height, [0, 0, 0, 255])
            }
        };
        let format = match surface.decl.source {
            SurfaceSource::Procedural { .. } => surface.decl.format,
            _ => pixels.format,
        };

        let desc = TextureDescriptor::uploaded(&surface.name, pixels.width, pixels.height, format);
        let result = create_image(backend, &desc).and_then(|image| {
            surface.images[0] = Some(image);
            if format == pixels.format {
                backend.write_texture(image.texture, &pixels.data, pixels.width, pixels.height)?;
            }
            Ok(())
        });
        if let Err(source) = result {
            destroy_images(backend, surface);
            surface.state = AllocationState::Failed;
            surface.failure = Some(source.to_string());
            return Err(SurfaceError::Backend {
                name: surface.name.clone(),
                source,
            });
        }

        surface.current_size = Some((pixels.width, pixels.height));
        surface.current_format = Some(format);
        surface.generation += 1;
        surface.state = AllocationState::Loaded;
        surface.rendered = true;
        log::debug!(
            "Loaded surface '{}' {}x{}",
            surface.name,
            pixels.width,
            pixels.height
        );
        Ok(())
    }

    /// Upload new pixels to a procedural surface.
    pub fn write_procedural<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        id: SurfaceId,
        data: &[u8],
    ) -> Result<(), SurfaceError> {
        self.ensure_loaded(backend, id)?;
        let surface = &mut self.surfaces[id.index()];
        let (Some(image), Some((width, height))) = (surface.images[0], surface.current_size) else {
            return Err(surface.unavailable());
        };
        backend
            .write_texture(image.texture, data, width, height)
            .map_err(|source| SurfaceError::Backend {
                name: surface.name.clone(),
                source,
            })?;
        surface.rendered = true;
        Ok(())
    }

    /// Flag a surface as sampled and return the sampler to read it with.
    ///
    /// Sampler objects are shared between surfaces with the same settings and
    /// created on first request.
    pub fn request_sampled<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        id: SurfaceId,
        filter: FilterMode,
        address_mode: AddressMode,
    ) -> BackendResult<SamplerHandle> {
        let sampler = self.sampler(backend, filter, address_mode)?;
        self.surfaces[id.index()].sampled = true;
        Ok(sampler)
    }

    /// Sampler for bindings that are not tied to a declared surface
    pub fn default_sampler<B: GpuBackend>(&mut self, backend: &mut B) -> BackendResult<SamplerHandle> {
        self.sampler(backend, FilterMode::default(), AddressMode::default())
    }

    fn sampler<B: GpuBackend>(
        &mut self,
        backend: &mut B,
        filter: FilterMode,
        address_mode: AddressMode,
    ) -> BackendResult<SamplerHandle> {
        if let Some(sampler) = self.samplers.get(&(filter, address_mode)) {
            return Ok(*sampler);
        }
        let sampler = backend.create_sampler(&SamplerDescriptor {
            label: Some(format!("{:?}/{:?}", filter, address_mode)),
            filter,
            address_mode,
        })?;
        self.samplers.insert((filter, address_mode), sampler);
        Ok(sampler)
    }

    /// A pass reads this surface while writing it; it needs two images.
    pub fn mark_feedback(&mut self, id: SurfaceId) {
        let surface = &mut self.surfaces[id.index()];
        if !surface.feedback {
            log::debug!("Surface '{}' is double-buffered for feedback", surface.name);
            surface.feedback = true;
        }
    }

    /// Record that `image` of the surface now holds this frame's output.
    pub fn mark_rendered(&mut self, id: SurfaceId, image: usize) {
        let surface = &mut self.surfaces[id.index()];
        surface.rendered = true;
        surface.last_written = image;
    }

    /// Destroy every surface and sampler.
    ///
    /// The device must be idle.
    pub fn clear<B: GpuBackend>(&mut self, backend: &mut B) {
        for surface in &mut self.surfaces {
            destroy_images(backend, surface);
        }
        for (_, sampler) in self.samplers.drain() {
            backend.destroy_sampler(sampler);
        }
        self.surfaces.clear();
        self.by_name.clear();
    }
}

fn create_image<B: GpuBackend>(backend: &mut B, desc: &TextureDescriptor) -> BackendResult<SurfaceImage> {
    let texture = backend.create_texture(desc)?;
    match backend.create_texture_view(texture) {
        Ok(view) => Ok(SurfaceImage { texture, view }),
        Err(e) => {
            backend.destroy_texture(texture);
            Err(e)
        }
    }
}

fn destroy_images<B: GpuBackend>(backend: &mut B, surface: &mut Surface) {
    for image in surface.images.iter_mut() {
        if let Some(image) = image.take() {
            backend.destroy_texture_view(image.view);
            backend.destroy_texture(image.texture);
        }
    }
    surface.current_size = None;
    surface.current_format = None;
}
