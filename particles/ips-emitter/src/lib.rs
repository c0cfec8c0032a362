//! Particle lifecycle core for path-driven emitters
//!
//! An emitter is moved along a path each frame and ejects particles at a
//! configured rate. Particles live in a chunked, growable pool, are aged and
//! integrated once per tick, and are expanded into camera-facing quads for
//! the host renderer.
//!
//! ```
//! use std::sync::Arc;
//! use glam::Vec3;
//! use ips_emitter::{
//!     EmissionSegment, EmitterData, EmitterId, EmptyWorld, Environment, GraphEmitter,
//!     ParticleData, SceneHost, SimContext,
//! };
//!
//! struct Scene;
//! impl SceneHost for Scene {
//!     fn add_to_scene(&mut self, _id: EmitterId) {}
//!     fn remove_from_scene(&mut self, _id: EmitterId) {}
//! }
//!
//! let data = EmitterData::with_particles(vec![ParticleData::default()]);
//! data.validate().unwrap();
//!
//! let mut emitter = GraphEmitter::with_seed(EmitterId(1), Arc::new(data), 7);
//! let env = Environment::default();
//! let ctx = SimContext::new(&env, &EmptyWorld);
//!
//! let segment = EmissionSegment::new(Vec3::ZERO, Vec3::X, Vec3::Z, Vec3::ZERO, 250);
//! emitter.emit_along_segment(&segment, &ctx, &mut Scene, None);
//! emitter.advance_time(0.25, &ctx);
//! assert_eq!(emitter.len(), 2);
//! ```

pub mod attraction;
#[cfg(feature = "serde-support")]
pub mod config;
pub mod data;
pub mod emitter;
pub mod error;
pub mod integrate;
pub mod keyframe;
pub mod particle;
pub mod pool;
pub mod render;
pub mod rng;
pub mod spawn;
pub mod vertex;
pub mod world;

// Re-export common types
pub use attraction::{AttractionMode, Attractor};
#[cfg(feature = "serde-support")]
pub use config::{EffectLibrary, EmitterDescriptor};
pub use data::{AnimatedTexture, BlendStyle, EjectionParams, EmitterData, KeyframeTable, ParticleData};
pub use emitter::{EmitterStats, GraphEmitter};
pub use error::{EmitterError, Result};
pub use particle::{Particle, ParticleHandle};
pub use pool::ParticlePool;
pub use render::{Aabb, DrawTarget, RenderInstance, RenderPass};
pub use spawn::EmissionSegment;
pub use vertex::{CameraView, ParticleVertex};
pub use world::{
    EmitterId, EmptyWorld, Environment, ObjectId, RayHit, SceneHost, SimContext,
    SpawnOffsetSource, World,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
