//! Scene description data model

mod camera;
mod description;
mod handoff;

pub use camera::*;
pub use description::*;
pub use handoff::*;
