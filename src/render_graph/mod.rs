//! Render Graph System
//!
//! Turns the passes of a scene description into recorded GPU work, one
//! [`PassExecutor`] per declared pass, driven frame by frame by the
//! [`SceneRenderer`].

mod executor;
mod frame_data;
mod graph;
mod targets;
mod uniforms;

pub(crate) use executor::FrameContext;
pub use executor::{PassExecutor, PassOutcome, PassState, StructuralError};
pub use frame_data::PassFrameData;
pub use graph::{SceneRenderer, TargetView};
pub use targets::PassTargets;
pub use uniforms::*;
