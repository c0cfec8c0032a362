//! Per-tick aging and physics
//!
//! A tick ages every live particle, evicts the expired ones in the same pass
//! and forward-Euler integrates the rest: drag, wind, gravity and optional
//! attraction, then collision response, sticky anchoring and keyframe lookup.

use std::sync::Arc;

use glam::{Vec3, Vec4};
use log::{debug, trace};

use crate::attraction::MAX_ATTRACTORS;
use crate::data::{EmitterData, ParticleData};
use crate::emitter::GraphEmitter;
use crate::keyframe::{KEYFRAME_COUNT, KeyCursor};
use crate::particle::Particle;
use crate::world::{Environment, SimContext};

/// Longest time step a single advance will simulate
pub const MAX_TICK_SECONDS: f32 = 0.5;

/// Steps shorter than this are ignored
pub const MIN_TICK_SECONDS: f32 = 0.000_01;

/// Fraction of tangential velocity kept after a bounce
pub const COLLISION_DAMPING: f32 = 0.8;

/// Acceleration from the particle's own term plus drag, wind and gravity
pub(crate) fn base_acceleration(particle: &Particle, template: &ParticleData, env: &Environment) -> Vec3 {
    particle.acceleration - particle.velocity * template.drag - env.wind_velocity * template.wind
        + env.gravity * template.gravity
}

/// Velocity after hitting a surface with the given normal
///
/// The normal component is reflected and the tangential component damped.
pub fn collision_response(velocity: Vec3, normal: Vec3) -> Vec3 {
    let normal_sq = normal.length_squared();
    if normal_sq == 0.0 {
        return velocity;
    }
    let projected = normal * (velocity.dot(normal) / normal_sq);
    let tangential = velocity - projected;
    -(velocity - tangential * 2.0 * COLLISION_DAMPING)
}

/// Recompute size and color from the keyframe tables at the particle's age
pub(crate) fn refresh_key_data(
    particle: &mut Particle,
    template: &ParticleData,
    data: &EmitterData,
    sizes: &[f32; KEYFRAME_COUNT],
    colors: &[Vec4; KEYFRAME_COUNT],
) {
    if particle.total_lifetime < 1 {
        particle.total_lifetime = 1;
    }

    let t = particle.age_fraction();
    debug_assert!(t <= 1.0, "particle outlived its lifetime: t = {t}");

    if let Some(cursor) = KeyCursor::locate(&template.keys.times, t) {
        particle.color = if data.use_emitter_colors {
            cursor.sample(colors)
        } else {
            cursor.sample(&template.keys.colors)
        };
        particle.size = if data.use_emitter_sizes {
            cursor.sample(sizes)
        } else {
            cursor.sample(&template.keys.sizes)
        };
    }
}

impl GraphEmitter {
    /// Advance the simulation by `dt` seconds
    ///
    /// Steps are clamped to [`MAX_TICK_SECONDS`]; steps below
    /// [`MIN_TICK_SECONDS`] or shorter than a whole millisecond do nothing.
    pub fn advance_time(&mut self, dt: f32, ctx: &SimContext<'_>) {
        if !(dt >= MIN_TICK_SECONDS) {
            return;
        }
        let dt = dt.min(MAX_TICK_SECONDS);

        if self.dead {
            return;
        }

        let ms = (dt * 1000.0) as u32;
        self.elapsed_time_ms += u64::from(ms);
        if ms == 0 {
            return;
        }

        let evicted = self.pool.retain(|particle| {
            particle.current_age = particle.current_age.saturating_add(ms);
            !particle.is_expired()
        });
        if evicted > 0 {
            trace!("Emitter {} evicted {} particles", self.id.0, evicted);
        }

        if self.pool.is_empty() {
            if self.delete_when_empty {
                self.delete_on_tick = true;
                debug!("Emitter {} empty, deleting on next tick", self.id.0);
            }
            return;
        }

        self.update(ms, ctx);
    }

    fn update(&mut self, ms: u32, ctx: &SimContext<'_>) {
        let t = ms as f32 / 1000.0;
        let data = Arc::clone(&self.data);
        let sizes = self.sizes;
        let colors = self.colors;
        let sticky = self.sticky;
        let anchor = self.parent_anchor;
        let range = self.attraction_range;
        let attractors = self.attractors;

        let attracting = attractors.iter().any(|a| a.is_active());
        let mut targets = [None; MAX_ATTRACTORS];
        if attracting {
            for (target, attractor) in targets.iter_mut().zip(&attractors) {
                *target = attractor.resolve(ctx.world);
            }
        }

        self.pool.for_each_mut(|particle| {
            let Some(template) = data.particles.get(particle.template) else {
                return;
            };

            if attracting {
                particle.acceleration = Vec3::ZERO;
                for (attractor, target) in attractors.iter().zip(targets) {
                    if let Some(target) = target {
                        particle.acceleration += attractor.force(target, particle.position, range);
                    }
                }
            }

            let a = base_acceleration(particle, template, ctx.environment);
            particle.velocity += a * t;

            let next = particle.position + particle.velocity * t;
            if let Some(hit) = ctx.world.cast_ray(particle.position, next) {
                particle.velocity = collision_response(particle.velocity, hit.normal);
            }

            particle.position += particle.velocity * t;
            if sticky {
                particle.position = anchor + particle.relative_position;
            }

            refresh_key_data(particle, template, &data, &sizes, &colors);
        });
    }
}
