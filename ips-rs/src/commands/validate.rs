//! Template validation

use std::path::Path;

use anyhow::{Result, bail};
use log::info;

use crate::commands::load_library;

pub fn execute(path: &Path) -> Result<()> {
    let library = load_library(path)?;

    let mut failures = 0usize;
    for (name, particle) in &library.particles {
        if let Err(e) = particle.validate() {
            println!("✗ particle {name}: {e}");
            failures += 1;
        }
    }

    for name in library.emitter_names() {
        match library.build_emitter_data(name) {
            Ok(data) => {
                info!("Emitter {name} resolved {} particle templates", data.particles.len());
                println!("✓ emitter {name}");
            }
            Err(e) => {
                println!("✗ emitter {name}: {e}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} template(s) failed validation");
    }
    println!("All {} emitters are valid", library.emitters.len());
    Ok(())
}
