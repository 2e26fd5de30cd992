//! Descriptor set layout, pipeline layout and descriptor set caching

mod descriptor;

pub use descriptor::*;
