//! Command implementations

pub mod info;
pub mod simulate;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use ips_emitter::EffectLibrary;

/// Load an effect library, attaching the path to any error
pub fn load_library(path: &Path) -> Result<EffectLibrary> {
    EffectLibrary::load(path)
        .with_context(|| format!("Failed to load effect library from {}", path.display()))
}
