//! Role registries gating the engine's mutating entry points.

pub mod access_control;

pub use access_control::AccessControl;
