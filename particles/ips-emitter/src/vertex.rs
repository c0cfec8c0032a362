//! Quad generation for live particles
//!
//! Every live particle becomes four vertices, wound so that the shared
//! [`QuadIndexBuffer`] pattern `0, 1, 3, 1, 3, 2` draws two triangles per quad.
//! Three mutually exclusive quad styles exist:
//!
//! - camera-facing billboards, optionally spinning about the view axis
//! - ribbons oriented along velocity or the ejection direction
//! - ribbons aligned to a fixed world axis, optionally spinning about it

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Vec2, Vec3, Vec4};

use crate::data::{EmitterData, ParticleData};
use crate::particle::{Particle, ParticleHandle};
use crate::pool::ParticlePool;

/// Converts `spin_speed (deg/s) * age (ms)` into radians
pub const AGED_SPIN_TO_RADIANS: f32 = (1.0 / 1000.0) * (1.0 / 360.0) * std::f32::consts::TAU;

/// Billboard corners in view space, in the same order as the ribbon corners
const BILLBOARD_CORNERS: [Vec3; 4] = [
    Vec3::new(-1.0, 0.0, 1.0),
    Vec3::new(-1.0, 0.0, -1.0),
    Vec3::new(1.0, 0.0, -1.0),
    Vec3::new(1.0, 0.0, 1.0),
];

/// Index pattern of a single quad
pub const QUAD_INDICES: [u32; 6] = [0, 1, 3, 1, 3, 2];

/// GPU-facing particle vertex
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct ParticleVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub tex_coord: [f32; 2],
}

impl ParticleVertex {
    fn new(position: Vec3, color: Vec4, tex_coord: Vec2) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
            tex_coord: tex_coord.to_array(),
        }
    }
}

/// Static index list shared by all quads of an emitter
#[derive(Debug, Clone, Default)]
pub struct QuadIndexBuffer {
    indices: Vec<u32>,
}

impl QuadIndexBuffer {
    /// Build indices for `quads` quads
    pub fn new(quads: usize) -> Self {
        let mut buffer = Self::default();
        buffer.resize(quads);
        buffer
    }

    /// Rebuild for a new quad capacity
    pub fn resize(&mut self, quads: usize) {
        self.indices.clear();
        self.indices.reserve(quads * QUAD_INDICES.len());
        for quad in 0..quads as u32 {
            let offset = quad * 4;
            self.indices
                .extend(QUAD_INDICES.iter().map(|index| index + offset));
        }
    }

    /// Number of quads covered
    pub fn quad_capacity(&self) -> usize {
        self.indices.len() / QUAD_INDICES.len()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.indices
    }
}

/// Renderer-facing vertex storage that grows but never shrinks
#[derive(Debug, Clone, Default)]
pub struct VertexBuffer {
    vertices: Vec<ParticleVertex>,
    len: usize,
    generation: u32,
}

impl VertexBuffer {
    /// Copy a filled scratch buffer in, reallocating only when it is too small
    pub fn upload(&mut self, scratch: &[ParticleVertex]) {
        if scratch.len() > self.vertices.len() {
            self.vertices = vec![ParticleVertex::default(); scratch.len()];
            self.generation = self.generation.wrapping_add(1);
        }
        self.vertices[..scratch.len()].copy_from_slice(scratch);
        self.len = scratch.len();
    }

    /// Vertices written by the last upload
    pub fn as_slice(&self) -> &[ParticleVertex] {
        &self.vertices[..self.len]
    }

    /// Raw bytes of the last upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.as_slice())
    }

    /// Number of quads the buffer can hold without reallocating
    pub fn quad_capacity(&self) -> usize {
        self.vertices.len() / 4
    }

    /// Incremented on every reallocation
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Camera state needed to build quads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    /// Camera position in world space
    pub position: Vec3,
    /// World to view rotation; view space looks down +Y with +Z up
    pub world_to_view: Mat3,
    /// Scene ambient light color
    pub ambient_color: Vec4,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            world_to_view: Mat3::IDENTITY,
            ambient_color: Vec4::ONE,
        }
    }
}

impl CameraView {
    /// Camera at `position` looking along `forward`, with +Z as up hint
    pub fn looking(position: Vec3, forward: Vec3) -> Self {
        let forward = forward.normalize_or(Vec3::Y);
        let up_hint = if forward.z.abs() > 0.999 { Vec3::Y } else { Vec3::Z };
        let right = forward.cross(up_hint).normalize();
        let up = right.cross(forward);
        Self {
            position,
            // rows are the view axes expressed in world space
            world_to_view: Mat3::from_cols(right, forward, up).transpose(),
            ..Default::default()
        }
    }

    /// View-forward axis in world space
    pub fn forward(&self) -> Vec3 {
        self.world_to_view.row(1)
    }
}

/// Sort record for depth ordering
#[derive(Debug, Clone, Copy)]
pub(crate) struct SortEntry {
    handle: ParticleHandle,
    key: f32,
}

#[derive(Debug, Clone, Copy)]
enum QuadStyle {
    Billboard { view_to_world: Mat3 },
    Oriented { camera: Vec3, on_velocity: bool },
    Aligned { axis: Vec3 },
}

/// Build one quad per live particle into `out`
///
/// `out` is resized to exactly four vertices per live particle. Ordering is
/// newest first, or far to near when sorting is enabled, and written back to
/// front when `reverse_order` is set.
pub(crate) fn build_quads(
    pool: &ParticlePool,
    data: &EmitterData,
    view: &CameraView,
    order: &mut Vec<SortEntry>,
    out: &mut Vec<ParticleVertex>,
) {
    let count = pool.len();
    out.clear();
    if count == 0 {
        return;
    }
    out.resize(count * 4, ParticleVertex::default());

    let style = if data.orient_particles {
        QuadStyle::Oriented {
            camera: view.position,
            on_velocity: data.orient_on_velocity,
        }
    } else if data.align_particles {
        QuadStyle::Aligned {
            axis: data.align_axis(),
        }
    } else {
        QuadStyle::Billboard {
            view_to_world: view.world_to_view.transpose(),
        }
    };
    let ambient_lerp = data.ambient_factor.clamp(0.0, 1.0);

    let mut emit = |i: usize, particle: &Particle| {
        let slot = if data.reverse_order { count - 1 - i } else { i };
        let color = particle
            .color
            .lerp(particle.color * view.ambient_color, ambient_lerp);
        let quad = match data.particles.get(particle.template) {
            Some(template) => build_quad(style, particle, template, color),
            None => collapsed_quad(particle, [Vec2::ZERO; 4]),
        };
        out[slot * 4..slot * 4 + 4].copy_from_slice(&quad);
    };

    if data.sort_particles {
        let forward = view.forward();
        order.clear();
        order.extend(pool.handles().map(|handle| SortEntry {
            handle,
            key: pool.get(handle).position.dot(forward),
        }));
        order.sort_unstable_by(|a, b| b.key.total_cmp(&a.key));

        for (i, entry) in order.iter().enumerate() {
            emit(i, pool.get(entry.handle));
        }
    } else {
        for (i, particle) in pool.iter().enumerate() {
            emit(i, particle);
        }
    }
}

fn build_quad(
    style: QuadStyle,
    particle: &Particle,
    template: &ParticleData,
    color: Vec4,
) -> [ParticleVertex; 4] {
    let uvs = match &template.animation {
        Some(animation) => animation.frame_uvs(particle.current_age),
        None => template.tex_coords,
    };
    let half = particle.size * 0.5;

    let corners = match style {
        QuadStyle::Billboard { view_to_world } => {
            let (sin, cos) = spin_angle(particle).sin_cos();
            BILLBOARD_CORNERS.map(|base| {
                let local = Vec3::new(cos * base.x - sin * base.z, 0.0, sin * base.x + cos * base.z);
                view_to_world * local * half + particle.position
            })
        }
        QuadStyle::Oriented {
            camera,
            on_velocity,
        } => {
            let dir = if on_velocity {
                particle.velocity
            } else {
                particle.orient_dir
            };
            if dir.length_squared() == 0.0 {
                return collapsed_quad(particle, uvs);
            }
            let from_camera = particle.position - camera;
            let cross = from_camera.cross(dir).normalize_or_zero() * half;
            let dir = dir.normalize_or_zero() * half;
            ribbon(particle.position, dir, cross)
        }
        QuadStyle::Aligned { axis } => {
            let right = if axis.y.abs() > axis.z.abs() {
                Vec3::Z.cross(axis)
            } else {
                Vec3::Y.cross(axis)
            }
            .normalize_or_zero();
            let right = if particle.spin_speed == 0.0 {
                right
            } else {
                spin_about(axis, right, spin_angle(particle))
            };
            let cross = right.cross(axis) * half;
            ribbon(particle.position, right * half, cross)
        }
    };

    [
        ParticleVertex::new(corners[0], color, uvs[0]),
        ParticleVertex::new(corners[1], color, uvs[1]),
        ParticleVertex::new(corners[2], color, uvs[2]),
        ParticleVertex::new(corners[3], color, uvs[3]),
    ]
}

fn spin_angle(particle: &Particle) -> f32 {
    particle.spin_speed * particle.current_age as f32 * AGED_SPIN_TO_RADIANS
}

/// Corners of a ribbon running from `center - dir` to `center + dir`
fn ribbon(center: Vec3, dir: Vec3, cross: Vec3) -> [Vec3; 4] {
    let start = center - dir;
    let end = center + dir;
    [start + cross, start - cross, end - cross, end + cross]
}

/// Rotate `v` about the unit `axis` by `angle` radians
///
/// Expanded quaternion sandwich product; avoids building a `Quat` per particle.
fn spin_about(axis: Vec3, v: Vec3, angle: f32) -> Vec3 {
    let (sin, qw) = (angle * 0.5).sin_cos();
    let q = axis * sin;

    let vx = v.x * qw + v.z * q.y - v.y * q.z;
    let vy = v.y * qw + v.x * q.z - v.z * q.x;
    let vz = v.z * qw + v.y * q.x - v.x * q.y;
    let vw = v.x * q.x + v.y * q.y + v.z * q.z;

    Vec3::new(
        qw * vx + q.x * vw + q.y * vz - q.z * vy,
        qw * vy + q.y * vw + q.z * vx - q.x * vz,
        qw * vz + q.z * vw + q.x * vy - q.y * vx,
    )
}

/// Zero-area, fully transparent quad keeping the particle's slot in the buffer
fn collapsed_quad(particle: &Particle, uvs: [Vec2; 4]) -> [ParticleVertex; 4] {
    let color = particle.color.truncate().extend(0.0);
    uvs.map(|uv| ParticleVertex::new(particle.position, color, uv))
}
