//! Emitter instance state
//!
//! A [`GraphEmitter`] owns its particle pool, the renderer-facing buffers and
//! the spawn clock. Behavior is split across modules by phase:
//! spawning lives in [`crate::spawn`], per-tick aging in [`crate::integrate`]
//! and render preparation in [`crate::render`].

use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};
use log::{debug, warn};

use crate::attraction::{Attractor, DEFAULT_ATTRACTION_RANGE, MAX_ATTRACTORS};
use crate::data::{BlendStyle, EmitterData};
use crate::error::{EmitterError, Result};
use crate::keyframe::KEYFRAME_COUNT;
use crate::particle::{Particle, ParticleHandle};
use crate::pool::ParticlePool;
use crate::render::Aabb;
use crate::rng::EmitterRng;
use crate::vertex::{ParticleVertex, QuadIndexBuffer, SortEntry, VertexBuffer};
use crate::world::{EmitterId, SceneHost};

/// Half-size of the bounding box before any particle has been spawned
const INITIAL_BOUNDS_RADIUS: f32 = 5.0;

/// Snapshot of an emitter's pool and clocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmitterStats {
    pub live: usize,
    pub free: usize,
    pub capacity: usize,
    pub chunks: usize,
    /// Number of times the pool had to grow
    pub growths: u32,
    pub elapsed_ms: u64,
    pub pending_ms: u32,
    pub in_scene: bool,
    pub dead: bool,
}

/// A path-driven particle emitter
#[derive(Debug)]
pub struct GraphEmitter {
    pub(crate) id: EmitterId,
    pub(crate) data: Arc<EmitterData>,
    pub(crate) blend_style: BlendStyle,
    pub(crate) pool: ParticlePool,
    pub(crate) indices: QuadIndexBuffer,
    pub(crate) vertices: VertexBuffer,
    pub(crate) scratch: Vec<ParticleVertex>,
    pub(crate) sort_order: Vec<SortEntry>,
    pub(crate) rng: EmitterRng,

    pub(crate) internal_clock_ms: u64,
    pub(crate) next_particle_time_ms: u32,
    pub(crate) elapsed_time_ms: u64,
    pub(crate) lifetime_ms: u32,
    pub(crate) last_position: Option<Vec3>,
    pub(crate) parent_anchor: Vec3,

    pub(crate) delete_when_empty: bool,
    pub(crate) delete_on_tick: bool,
    pub(crate) dead: bool,
    pub(crate) in_scene: bool,

    pub(crate) sticky: bool,
    pub(crate) sizes: [f32; KEYFRAME_COUNT],
    pub(crate) colors: [Vec4; KEYFRAME_COUNT],
    pub(crate) attractors: [Attractor; MAX_ATTRACTORS],
    pub(crate) attraction_range: f32,

    pub(crate) bounds: Aabb,
    pub(crate) bb_obj_to_world: Mat4,
    pub(crate) growth_count: u32,
}

impl GraphEmitter {
    /// Create an emitter seeded from the operating system
    pub fn new(id: EmitterId, data: Arc<EmitterData>) -> Self {
        Self::with_rng(id, data, EmitterRng::from_entropy())
    }

    /// Create an emitter with a fixed seed for reproducible emission
    pub fn with_seed(id: EmitterId, data: Arc<EmitterData>, seed: u64) -> Self {
        Self::with_rng(id, data, EmitterRng::seeded(seed))
    }

    fn with_rng(id: EmitterId, data: Arc<EmitterData>, rng: EmitterRng) -> Self {
        let mut emitter = Self {
            id,
            data: Arc::clone(&data),
            blend_style: BlendStyle::Undefined,
            pool: ParticlePool::default(),
            indices: QuadIndexBuffer::default(),
            vertices: VertexBuffer::default(),
            scratch: Vec::new(),
            sort_order: Vec::new(),
            rng,
            internal_clock_ms: 0,
            next_particle_time_ms: 0,
            elapsed_time_ms: 0,
            lifetime_ms: 0,
            last_position: None,
            parent_anchor: Vec3::ZERO,
            delete_when_empty: false,
            delete_on_tick: false,
            dead: false,
            in_scene: false,
            sticky: false,
            sizes: [1.0; KEYFRAME_COUNT],
            colors: [Vec4::ONE; KEYFRAME_COUNT],
            attractors: [Attractor::default(); MAX_ATTRACTORS],
            attraction_range: DEFAULT_ATTRACTION_RANGE,
            bounds: Aabb::from_center_half_extents(
                Vec3::ZERO,
                Vec3::splat(INITIAL_BOUNDS_RADIUS),
            ),
            bb_obj_to_world: Mat4::IDENTITY,
            growth_count: 0,
        };
        emitter.bind_data(data);
        emitter
    }

    /// Bind a new emitter template
    ///
    /// Draws the emitter lifetime, resolves the blend style and rebuilds the
    /// pool at the template's initial capacity. Live particles are discarded.
    pub fn bind_data(&mut self, data: Arc<EmitterData>) {
        if data.particles.is_empty() {
            warn!(
                "Emitter {} bound to a template without particles, it will stay idle",
                self.id.0
            );
        }

        let lifetime = i64::from(data.lifetime_ms) + self.rng.variance_ms(data.lifetime_variance_ms);
        self.lifetime_ms = lifetime.max(0) as u32;

        self.blend_style = data.resolved_blend_style();
        data.check_texture_consistency();

        let capacity = data.initial_capacity();
        self.pool = ParticlePool::with_capacity(capacity);
        self.indices.resize(capacity);
        debug!(
            "Emitter {} bound with pool capacity {} and lifetime {} ms",
            self.id.0, capacity, self.lifetime_ms
        );

        self.data = data;
    }

    pub fn id(&self) -> EmitterId {
        self.id
    }

    pub fn data(&self) -> &Arc<EmitterData> {
        &self.data
    }

    /// The live particle pool
    pub fn pool(&self) -> &ParticlePool {
        &self.pool
    }

    /// Number of live particles
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Iterate live particles, newest first
    pub fn particles(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.pool.iter()
    }

    /// Newest live particle
    pub fn newest(&self) -> Option<ParticleHandle> {
        self.pool.head()
    }

    /// Check if the emitter has been deleted
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Check if the emitter is registered with its scene host
    pub fn is_in_scene(&self) -> bool {
        self.in_scene
    }

    /// Check if deletion is scheduled for the next tick
    pub fn is_deletion_pending(&self) -> bool {
        self.delete_on_tick
    }

    /// Milliseconds of simulated time since creation
    pub fn elapsed_time_ms(&self) -> u64 {
        self.elapsed_time_ms
    }

    /// Spawn clock, advanced by emission calls
    pub fn internal_clock_ms(&self) -> u64 {
        self.internal_clock_ms
    }

    /// Time until the next spawn carried over from the previous emission call
    pub fn pending_spawn_ms(&self) -> u32 {
        self.next_particle_time_ms
    }

    /// Emission time box drawn at bind time, 0 for unlimited
    pub fn lifetime_ms(&self) -> u32 {
        self.lifetime_ms
    }

    /// End of the last emission segment
    pub fn last_position(&self) -> Option<Vec3> {
        self.last_position
    }

    /// Blend style after resolving the template's legacy settings
    pub fn blend_style(&self) -> BlendStyle {
        self.blend_style
    }

    /// Bounding box over live particles
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn index_buffer(&self) -> &QuadIndexBuffer {
        &self.indices
    }

    pub fn vertex_buffer(&self) -> &VertexBuffer {
        &self.vertices
    }

    pub fn stats(&self) -> EmitterStats {
        EmitterStats {
            live: self.pool.len(),
            free: self.pool.free_count(),
            capacity: self.pool.capacity(),
            chunks: self.pool.chunk_count(),
            growths: self.growth_count,
            elapsed_ms: self.elapsed_time_ms,
            pending_ms: self.next_particle_time_ms,
            in_scene: self.in_scene,
            dead: self.dead,
        }
    }

    /// Emission time box has run out
    pub(crate) fn lifetime_exhausted(&self) -> bool {
        self.lifetime_ms > 0 && self.elapsed_time_ms > u64::from(self.lifetime_ms)
    }

    /// Take a slot from the pool, keeping the index buffer in step with growth
    pub(crate) fn allocate(&mut self) -> ParticleHandle {
        let allocation = self.pool.allocate();
        if let Some(capacity) = allocation.grown_to {
            self.indices.resize(capacity);
            self.growth_count += 1;
            debug!(
                "Emitter {} pool grew to {} particles",
                self.id.0, capacity
            );
        }
        allocation.handle
    }

    /// Register with the scene host once there is something to show
    pub(crate) fn join_scene(&mut self, host: &mut dyn SceneHost) {
        if !self.pool.is_empty() && !self.in_scene {
            host.add_to_scene(self.id);
            self.in_scene = true;
        }
    }

    fn leave_scene(&mut self, host: &mut dyn SceneHost) {
        if self.in_scene {
            host.remove_from_scene(self.id);
            self.in_scene = false;
        }
    }

    fn kill(&mut self, host: &mut dyn SceneHost) {
        self.dead = true;
        self.delete_on_tick = false;
        self.pool.clear();
        self.leave_scene(host);
        debug!("Emitter {} deleted", self.id.0);
    }

    /// Delete the emitter once its last particle has expired
    ///
    /// An emitter that is already empty dies immediately.
    pub fn delete_when_empty(&mut self, host: &mut dyn SceneHost) {
        if self.dead {
            warn!("Emitter {} already deleted", self.id.0);
            return;
        }
        self.delete_when_empty = true;
        if self.pool.is_empty() {
            self.kill(host);
        }
    }

    /// Perform a deletion scheduled by the last time advance
    pub fn process_tick(&mut self, host: &mut dyn SceneHost) {
        if self.delete_on_tick && !self.dead {
            self.kill(host);
        }
    }

    /// Emitter-level size keys, used when the template asks for emitter sizes
    pub fn set_sizes(&mut self, sizes: [f32; KEYFRAME_COUNT]) {
        self.sizes = sizes;
    }

    /// Emitter-level color keys, used when the template asks for emitter colors
    pub fn set_colors(&mut self, colors: [Vec4; KEYFRAME_COUNT]) {
        self.colors = colors;
    }

    /// Lock particles to the anchor of the driving node
    pub fn set_sticky(&mut self, sticky: bool) {
        self.sticky = sticky;
    }

    /// Move the anchor that sticky particles follow
    pub fn set_parent_anchor(&mut self, anchor: Vec3) {
        self.parent_anchor = anchor;
    }

    pub fn parent_anchor(&self) -> Vec3 {
        self.parent_anchor
    }

    /// Configure one of the attraction slots
    pub fn set_attractor(&mut self, slot: usize, attractor: Attractor) -> Result<()> {
        let target = self.attractors.get_mut(slot).ok_or_else(|| {
            EmitterError::invalid(
                "attractor",
                format!("slot {slot} exceeds the {MAX_ATTRACTORS} available"),
            )
        })?;
        *target = attractor;
        Ok(())
    }

    pub fn attractors(&self) -> &[Attractor; MAX_ATTRACTORS] {
        &self.attractors
    }

    /// Distance scale of the attraction falloff
    pub fn set_attraction_range(&mut self, range: f32) {
        self.attraction_range = range;
    }

    /// Average color of all live particles, opaque black when empty
    pub fn collective_color(&self) -> Vec4 {
        if self.pool.is_empty() {
            return Vec4::W;
        }
        let sum: Vec4 = self.pool.iter().map(|p| p.color).sum();
        sum / self.pool.len() as f32
    }
}
