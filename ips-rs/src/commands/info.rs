//! Library listing

use std::path::Path;

use anyhow::Result;
use ips_emitter::{EffectLibrary, ParticleData};

use crate::commands::load_library;
use crate::utils::{TableRow, format_vec3, report_table};

struct ParticleRow<'a> {
    name: &'a str,
    particle: &'a ParticleData,
}

impl TableRow for ParticleRow<'_> {
    const HEADERS: &'static [&'static str] =
        &["Name", "Lifetime", "Gravity", "Drag", "Texture", "Animated"];

    fn cells(&self) -> Vec<String> {
        let particle = self.particle;
        vec![
            self.name.to_string(),
            format!("{} ± {} ms", particle.lifetime_ms, particle.lifetime_variance_ms),
            format!("{:.2}", particle.gravity),
            format!("{:.2}", particle.drag),
            particle.texture_name.clone().unwrap_or_else(|| "-".to_string()),
            match &particle.animation {
                Some(animation) => format!("{} frames", animation.frames().len()),
                None => "no".to_string(),
            },
        ]
    }
}

struct EmitterRow<'a> {
    name: &'a str,
    library: &'a EffectLibrary,
}

impl TableRow for EmitterRow<'_> {
    const HEADERS: &'static [&'static str] = &["Name", "Particles", "Period", "Blend", "Capacity"];

    fn cells(&self) -> Vec<String> {
        let Some(descriptor) = self.library.emitters.get(self.name) else {
            return vec![self.name.to_string()];
        };
        let ejection = &descriptor.settings.ejection;
        // capacity needs the resolved templates; unresolvable emitters show why
        let capacity = match self.library.build_emitter_data(self.name) {
            Ok(data) => data.initial_capacity().to_string(),
            Err(e) => format!("error: {e}"),
        };
        vec![
            self.name.to_string(),
            descriptor.particles.clone(),
            format!("{} ± {} ms", ejection.period_ms, ejection.period_variance_ms),
            format!("{:?}", descriptor.settings.blend_style),
            capacity,
        ]
    }
}

pub fn execute(path: &Path) -> Result<()> {
    let library = load_library(path)?;

    println!("Effect library: {}", path.display());
    println!("  Wind:    {}", format_vec3(library.environment.wind_velocity));
    println!("  Gravity: {}", format_vec3(library.environment.gravity));

    println!("\n=== Particle templates ({}) ===", library.particles.len());
    report_table(
        library
            .particles
            .iter()
            .map(|(name, particle)| ParticleRow { name, particle }),
    )
    .printstd();

    println!("\n=== Emitters ({}) ===", library.emitters.len());
    report_table(library.emitter_names().map(|name| EmitterRow {
        name,
        library: &library,
    }))
    .printstd();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY: &str = r#"
particles:
  spark:
    lifetime_ms: 400
    lifetime_variance_ms: 50
    texture_name: spark.png
emitters:
  sparks:
    particles: spark
    ejection:
      period_ms: 20
  orphan:
    particles: missing
"#;

    #[test]
    fn test_particle_row() {
        let library = EffectLibrary::from_yaml_str(LIBRARY).unwrap();
        let row = ParticleRow {
            name: "spark",
            particle: &library.particles["spark"],
        };
        let cells = row.cells();
        assert_eq!(cells.len(), ParticleRow::HEADERS.len());
        assert_eq!(cells[1], "400 ± 50 ms");
        assert_eq!(cells[4], "spark.png");
        assert_eq!(cells[5], "no");
    }

    #[test]
    fn test_emitter_row_capacity() {
        let library = EffectLibrary::from_yaml_str(LIBRARY).unwrap();
        let sparks = EmitterRow {
            name: "sparks",
            library: &library,
        }
        .cells();
        assert_eq!(sparks.len(), EmitterRow::HEADERS.len());
        // 400 + 50 ms over a 20 ms period, plus the margin
        assert_eq!(sparks[4], "30");

        let orphan = EmitterRow {
            name: "orphan",
            library: &library,
        }
        .cells();
        assert!(orphan[4].starts_with("error:"));
    }
}
