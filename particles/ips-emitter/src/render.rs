//! Bounding volume and render submission glue

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use glam::{Mat4, Vec3};

use crate::data::BlendStyle;
use crate::emitter::GraphEmitter;
use crate::vertex::{CameraView, ParticleVertex, build_quads};

/// Kind of pass the host is preparing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPass {
    Diffuse,
    Reflection,
    Shadow,
}

/// Where the host should draw the particle system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTarget {
    /// Full resolution, together with the scene
    HighRes,
    /// Reduced-resolution offscreen target, composited later
    Offscreen,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extents(center: Vec3, half: Vec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Size along each axis
    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Squared distance from `point` to the box, zero inside
    pub fn distance_squared_to(&self, point: Vec3) -> f32 {
        let closest = point.clamp(self.min, self.max);
        (point - closest).length_squared()
    }
}

/// Everything the host needs to draw one emitter
#[derive(Debug, Clone)]
pub struct RenderInstance<'a> {
    pub vertices: &'a [ParticleVertex],
    pub indices: &'a [u32],
    pub quad_count: usize,
    pub blend_style: BlendStyle,
    /// Squared distance from the camera to the emitter bounds
    pub sort_dist_sq: f32,
    pub draw_target: DrawTarget,
    pub softness_distance: f32,
    /// Emitter texture, else the newest particle's texture
    pub texture: Option<&'a str>,
    /// Groups instances sharing a texture, otherwise unique per emitter
    pub sort_key: u64,
    /// Unit box to world transform covering the particles
    pub bb_obj_to_world: Mat4,
}

impl GraphEmitter {
    /// Recompute the bounding box over live particles
    ///
    /// Particles extend half their size in X and Z. Leaves the box unchanged
    /// when nothing is live.
    pub fn update_bbox(&mut self) {
        let mut particles = self.pool.iter();
        let Some(first) = particles.next() else {
            return;
        };

        let half = |size: f32| Vec3::new(size * 0.5, 0.0, size * 0.5);
        let mut min = first.position - half(first.size);
        let mut max = first.position + half(first.size);
        for particle in particles {
            min = min.min(particle.position - half(particle.size));
            max = max.max(particle.position + half(particle.size));
        }

        self.bounds = Aabb::new(min, max);
        self.bb_obj_to_world = Mat4::from_scale(self.bounds.extents().max(Vec3::ONE));
    }

    /// Build vertices and describe the draw for one pass
    ///
    /// Returns `None` for shadow passes, for reflection passes when the
    /// template disables them, and for dead or empty emitters.
    pub fn prepare_render(&mut self, view: &CameraView, pass: RenderPass) -> Option<RenderInstance<'_>> {
        match pass {
            RenderPass::Shadow => return None,
            RenderPass::Reflection if !self.data.render_reflection => return None,
            _ => {}
        }
        if self.dead || self.pool.is_empty() {
            return None;
        }

        build_quads(&self.pool, &self.data, view, &mut self.sort_order, &mut self.scratch);
        self.vertices.upload(&self.scratch);

        let quad_count = self.pool.len();
        if self.indices.quad_capacity() < quad_count {
            self.indices.resize(self.pool.capacity());
        }

        let texture = self.data.texture().or_else(|| {
            let newest = self.pool.head()?;
            let template = self.data.particles.get(self.pool.get(newest).template)?;
            template.texture_name.as_deref()
        });

        let mut hasher = DefaultHasher::new();
        match texture {
            Some(name) => name.hash(&mut hasher),
            None => self.id.hash(&mut hasher),
        }

        let anchor = self.last_position.unwrap_or_else(|| self.bounds.center());

        Some(RenderInstance {
            vertices: self.vertices.as_slice(),
            indices: &self.indices.as_slice()[..quad_count * 6],
            quad_count,
            blend_style: self.blend_style,
            sort_dist_sq: self.bounds.distance_squared_to(view.position),
            draw_target: if self.data.high_res_only {
                DrawTarget::HighRes
            } else {
                DrawTarget::Offscreen
            },
            softness_distance: self.data.softness_distance,
            texture,
            sort_key: hasher.finish(),
            bb_obj_to_world: Mat4::from_translation(anchor) * self.bb_obj_to_world,
        })
    }
}
