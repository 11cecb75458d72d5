//! Artifact writers. Each returns the paths it created.
pub mod asm;
pub mod vm;
