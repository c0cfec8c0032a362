//! Time-sliced stochastic spawning
//!
//! Each emission call covers a motion segment of the source. Spawns are spaced
//! by the (randomized) ejection period, and whatever part of a period does not
//! fit into the segment is carried into the next call, so spawn timing is
//! independent of how the host slices frames.

use std::sync::Arc;

use glam::{Quat, Vec3};
use log::trace;

use crate::data::EjectionParams;
use crate::emitter::GraphEmitter;
use crate::integrate::{base_acceleration, refresh_key_data};
use crate::particle::ParticleHandle;
use crate::render::Aabb;
use crate::world::{SceneHost, SimContext, SpawnOffsetSource};

/// Motion of the emission source over one emission call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionSegment {
    pub start: Vec3,
    pub end: Vec3,
    /// Emission axis, particles leave within a cone around it
    pub axis: Vec3,
    /// Source velocity, partly inherited by particles
    pub velocity: Vec3,
    pub duration_ms: u32,
}

impl EmissionSegment {
    /// Segment from `start` to `end` covering `duration_ms`
    pub fn new(start: Vec3, end: Vec3, axis: Vec3, velocity: Vec3, duration_ms: u32) -> Self {
        Self {
            start,
            end,
            axis,
            velocity,
            duration_ms,
        }
    }

    /// Position after `elapsed_ms` of the segment
    pub fn point_at(&self, elapsed_ms: u32) -> Vec3 {
        self.start
            .lerp(self.end, elapsed_ms as f32 / self.duration_ms.max(1) as f32)
    }
}

/// Basis vector perpendicular to the emission axis, used for cone deflection
fn deflection_axis(axis: Vec3) -> Vec3 {
    let reference = if axis.z.abs() < 0.9 { Vec3::Z } else { Vec3::Y };
    axis.cross(reference).normalize_or_zero()
}

impl GraphEmitter {
    /// Emit from a point, continuing from the end of the previous segment
    ///
    /// With `use_last_position` the segment starts where the last emission
    /// call ended, if there was one.
    #[allow(clippy::too_many_arguments)]
    pub fn emit_from_point(
        &mut self,
        point: Vec3,
        use_last_position: bool,
        axis: Vec3,
        velocity: Vec3,
        duration_ms: u32,
        ctx: &SimContext<'_>,
        host: &mut dyn SceneHost,
    ) -> usize {
        let start = match self.last_position {
            Some(last) if use_last_position => last,
            _ => point,
        };
        let segment = EmissionSegment::new(start, point, axis, velocity, duration_ms);
        self.emit_along_segment(&segment, ctx, host, None)
    }

    /// Emit along a motion segment
    ///
    /// Consumes any spawn time carried over from the previous call, then
    /// spawns at randomized ejection periods until the segment is used up.
    /// `node` may override ejection parameters and place particles. Returns
    /// the number of particles spawned.
    pub fn emit_along_segment(
        &mut self,
        segment: &EmissionSegment,
        ctx: &SimContext<'_>,
        host: &mut dyn SceneHost,
        mut node: Option<&mut dyn SpawnOffsetSource>,
    ) -> usize {
        if self.dead || self.data.particles.is_empty() || self.lifetime_exhausted() {
            return 0;
        }

        let ejection = node
            .as_deref()
            .and_then(|n| n.ejection_override())
            .copied()
            .unwrap_or(self.data.ejection);
        let axis = segment.axis.normalize_or(Vec3::Z);
        let axisx = deflection_axis(axis);
        let duration = segment.duration_ms;

        let mut current = 0u32;
        let mut spawned = 0usize;

        if self.next_particle_time_ms != 0 {
            if self.next_particle_time_ms > duration {
                // Not due yet within this segment
                self.next_particle_time_ms -= duration;
                self.internal_clock_ms += u64::from(duration);
                self.last_position = Some(segment.end);
                return 0;
            }

            current += self.next_particle_time_ms;
            self.internal_clock_ms += u64::from(self.next_particle_time_ms);
            self.next_particle_time_ms = 0;

            let pos = segment.point_at(current);
            if self
                .add_particle(pos, axis, segment.velocity, axisx, &ejection, node.as_deref_mut())
                .is_some()
            {
                spawned += 1;
            }
        }

        while current < duration {
            let period = ejection.next_period_ms(&mut self.rng);
            let remaining = duration - current;
            if period > remaining {
                self.next_particle_time_ms = period - remaining;
                self.internal_clock_ms += u64::from(remaining);
                break;
            }

            current += period;
            self.internal_clock_ms += u64::from(period);

            let pos = segment.point_at(current);
            if let Some(handle) =
                self.add_particle(pos, axis, segment.velocity, axisx, &ejection, node.as_deref_mut())
            {
                spawned += 1;
                self.advance_spawned(handle, duration - current, ctx);
            }
        }

        trace!(
            "Emitter {} spawned {} particles over {} ms, {} ms pending",
            self.id.0, spawned, duration, self.next_particle_time_ms
        );

        if spawned > 0 {
            self.update_bbox();
        }
        self.join_scene(host);
        self.last_position = Some(segment.end);
        spawned
    }

    /// One-shot burst of `count` particles within a hemisphere around `normal`
    pub fn emit_in_hemisphere(
        &mut self,
        center: Vec3,
        normal: Vec3,
        radius: f32,
        velocity: Vec3,
        count: usize,
        host: &mut dyn SceneHost,
    ) -> usize {
        if self.dead || self.data.particles.is_empty() || self.lifetime_exhausted() {
            return 0;
        }

        let axisz = normal.normalize_or(Vec3::Z);
        let reference = if axisz.z.abs() < 0.98 { Vec3::Z } else { Vec3::Y };
        let axisy = axisz.cross(reference).normalize_or_zero();
        let axisx = axisz.cross(axisy).normalize_or_zero();
        let ejection = self.data.ejection;

        let mut spawned = 0;
        for _ in 0..count {
            let mut offset = axisx * (radius * (1.0 - 2.0 * self.rng.rand_f()));
            offset += axisy * (radius * (1.0 - 2.0 * self.rng.rand_f()));
            offset += axisz * (radius * self.rng.rand_f());

            let axis = offset.normalize_or(axisz);
            if self
                .add_particle(center + offset, axis, velocity, axisz, &ejection, None)
                .is_some()
            {
                spawned += 1;
            }
        }

        self.bounds = Aabb::from_center_half_extents(center, Vec3::splat(radius));
        self.join_scene(host);
        self.last_position = None;
        spawned
    }

    /// Spawn one particle at `pos`, ejected within the cone around `axis`
    ///
    /// Returns `None` when the driving node is shutting down.
    fn add_particle(
        &mut self,
        pos: Vec3,
        axis: Vec3,
        inherit_vel: Vec3,
        axisx: Vec3,
        ejection: &EjectionParams,
        node: Option<&mut (dyn SpawnOffsetSource + '_)>,
    ) -> Option<ParticleHandle> {
        if node.as_deref().is_some_and(|n| n.is_shutting_down()) {
            return None;
        }

        let theta = self.rng.between(ejection.theta_min, ejection.theta_max);
        let reference = (self.internal_clock_ms as f32 / 1000.0) * ejection.phi_reference_vel;
        let phi = reference + self.rng.rand_f() * ejection.phi_variance;

        let theta_rot = Quat::from_axis_angle(axisx, theta.to_radians());
        let phi_rot = Quat::from_axis_angle(axis, phi.to_radians());
        let ejection_axis = phi_rot * (theta_rot * axis);

        let speed = ejection.velocity
            + ejection.velocity_variance * 2.0 * self.rng.rand_f()
            - ejection.velocity_variance;

        let node_offset = node.and_then(|n| n.spawn_offset(pos, self.internal_clock_ms));

        let handle = self.allocate();
        let template_index = self.rng.index(self.data.particles.len());
        let data = Arc::clone(&self.data);
        let template = &data.particles[template_index];

        let particle = self.pool.get_mut(handle);
        particle.template = template_index;
        match node_offset {
            Some(offset) => {
                particle.position = pos + offset;
                particle.relative_position = offset;
                self.parent_anchor = pos;
            }
            None => particle.position = pos + ejection_axis * ejection.offset,
        }
        particle.velocity = ejection_axis * speed;
        particle.orient_dir = ejection_axis;
        particle.acceleration = Vec3::ZERO;
        particle.current_age = 0;

        template.initialize_particle(particle, inherit_vel, &mut self.rng);
        refresh_key_data(particle, template, &data, &self.sizes, &self.colors);

        Some(handle)
    }

    /// Forward-integrate a just-spawned particle by the rest of the segment
    ///
    /// Only applies when the template does not override advancing and the
    /// particle is still the live-list head. A particle whose lifetime is
    /// shorter than the remaining time is released right away.
    fn advance_spawned(&mut self, handle: ParticleHandle, advance_ms: u32, ctx: &SimContext<'_>) {
        if self.data.override_advance || advance_ms == 0 {
            return;
        }
        debug_assert_eq!(self.pool.head(), Some(handle), "spawned particle must be the head");
        if self.pool.head() != Some(handle) {
            return;
        }

        if advance_ms > self.pool.get(handle).total_lifetime {
            self.pool.release_head();
            return;
        }

        let data = Arc::clone(&self.data);
        let particle = self.pool.get_mut(handle);
        let Some(template) = data.particles.get(particle.template) else {
            return;
        };

        let t = advance_ms as f32 / 1000.0;
        let a = base_acceleration(particle, template, ctx.environment);
        particle.velocity += a * t;
        particle.position += particle.velocity * t;

        refresh_key_data(particle, template, &data, &self.sizes, &self.colors);
    }
}
