//! Effect libraries loaded from YAML or JSON
//!
//! A library names particle templates and emitter descriptors. Each emitter
//! descriptor lists its particle templates by name, separated by spaces or
//! tabs:
//!
//! ```yaml
//! particles:
//!   spark:
//!     lifetime_ms: 400
//!     gravity: 1.0
//! emitters:
//!   sparks:
//!     particles: "spark"
//!     ejection:
//!       period_ms: 20
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::data::{EmitterData, ParticleData};
use crate::error::{EmitterError, Result};
use crate::world::Environment;

/// Emitter settings plus the names of the particle templates it binds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterDescriptor {
    #[serde(flatten)]
    pub settings: EmitterData,
    /// Space or tab separated particle template names
    pub particles: String,
}

/// Named particle templates and emitter descriptors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectLibrary {
    pub environment: Environment,
    pub particles: BTreeMap<String, ParticleData>,
    pub emitters: BTreeMap<String, EmitterDescriptor>,
}

impl EffectLibrary {
    /// Parse a YAML document
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        serde_yaml_ng::from_str(source).map_err(|e| EmitterError::ParseError(e.to_string()))
    }

    /// Parse a JSON document
    pub fn from_json_str(source: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(|e| EmitterError::ParseError(e.to_string()))
    }

    /// Load a library, choosing the format by file extension (YAML unless `.json`)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        debug!("Loading effect library from {}", path.display());

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&source)
        } else {
            Self::from_yaml_str(&source)
        }
    }

    /// Serialize the library back to YAML
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml_ng::to_string(self).map_err(|e| EmitterError::ParseError(e.to_string()))
    }

    /// Emitter names in sorted order
    pub fn emitter_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.emitters.keys().map(String::as_str)
    }

    /// Resolve an emitter descriptor into a validated, bound template
    ///
    /// Unknown particle names are logged and skipped; the emitter fails to
    /// build only if none of them resolve.
    pub fn build_emitter_data(&self, name: &str) -> Result<EmitterData> {
        let descriptor = self
            .emitters
            .get(name)
            .ok_or_else(|| EmitterError::UnknownEmitter(name.to_string()))?;

        let mut data = descriptor.settings.clone();
        data.particles = descriptor
            .particles
            .split([' ', '\t'])
            .filter(|token| !token.is_empty())
            .filter_map(|token| match self.particles.get(token) {
                Some(particle) => Some(Arc::new(particle.clone())),
                None => {
                    warn!("Emitter `{name}` references unknown particle template `{token}`");
                    None
                }
            })
            .collect();

        if data.particles.is_empty() {
            return Err(EmitterError::NoParticleTemplates(name.to_string()));
        }

        data.validate()?;
        Ok(data)
    }
}
