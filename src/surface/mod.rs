//! Surfaces: the GPU images passes render into and sample from.

mod image_data;
mod store;

use thiserror::Error;

use crate::backend::{BackendError, TextureFormat, TextureHandle, TextureViewHandle};
use crate::scene::SurfaceDecl;

pub use image_data::*;
pub use store::*;

/// Index of a surface in its [`SurfaceStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub(crate) u32);

impl SurfaceId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationState {
    Init,
    Loaded,
    /// Allocation or loading failed; not retried until the next scene.
    Failed,
}

/// One backing image of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceImage {
    pub texture: TextureHandle,
    pub view: TextureViewHandle,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("surface '{name}' is unavailable: {reason}")]
    Failed { name: String, reason: String },
    #[error("surface '{name}': {source}")]
    Backend {
        name: String,
        #[source]
        source: BackendError,
    },
}

impl SurfaceError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SurfaceError::Backend { source, .. } if source.is_fatal())
    }
}

/// Runtime state of a surface
#[derive(Debug)]
pub struct Surface {
    name: String,
    decl: SurfaceDecl,
    /// Second image only for surfaces a pass reads back while writing
    images: [Option<SurfaceImage>; 2],
    current_size: Option<(u32, u32)>,
    current_format: Option<TextureFormat>,
    generation: u64,
    state: AllocationState,
    failure: Option<String>,
    feedback: bool,
    sampled: bool,
    rendered: bool,
    last_written: usize,
}

impl Surface {
    fn new(name: &str, decl: SurfaceDecl) -> Self {
        Self {
            name: name.to_string(),
            decl,
            images: [None, None],
            current_size: None,
            current_format: None,
            generation: 0,
            state: AllocationState::Init,
            failure: None,
            feedback: false,
            sampled: false,
            rendered: false,
            last_written: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn decl(&self) -> &SurfaceDecl {
        &self.decl
    }

    /// Bumped every time the backing images are replaced
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_size(&self) -> Option<(u32, u32)> {
        self.current_size
    }

    pub fn format(&self) -> Option<TextureFormat> {
        self.current_format
    }

    pub fn state(&self) -> AllocationState {
        self.state
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_feedback(&self) -> bool {
        self.feedback
    }

    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    /// Written since its images were last allocated
    pub fn rendered(&self) -> bool {
        self.rendered
    }

    pub fn image(&self, index: usize) -> Option<SurfaceImage> {
        self.images.get(index).copied().flatten()
    }

    /// Index of the image holding the most recent contents
    pub fn last_written(&self) -> usize {
        self.last_written
    }

    /// The image a reader outside the writing pass should sample
    pub fn latest_image(&self) -> Option<SurfaceImage> {
        self.image(self.last_written)
    }

    fn required_images(&self) -> usize {
        if self.feedback {
            2
        } else {
            1
        }
    }

    fn allocated_images(&self) -> usize {
        self.images.iter().filter(|image| image.is_some()).count()
    }

    fn unavailable(&self) -> SurfaceError {
        SurfaceError::Failed {
            name: self.name.clone(),
            reason: self
                .failure
                .clone()
                .unwrap_or_else(|| "not allocated".to_string()),
        }
    }
}
