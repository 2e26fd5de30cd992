//! Backend abstraction layer
//!
//! Provides the capability trait every GPU backend implements, the shared
//! descriptor types, and a headless backend for tests and offline runs.

pub mod headless;
pub mod traits;
pub mod types;

pub use headless::*;
pub use traits::*;
pub use types::*;
