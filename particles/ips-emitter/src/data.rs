//! Emission and particle templates
//!
//! Templates are immutable once bound to an emitter. Each particle refers back
//! to the [`ParticleData`] it was spawned from by index into
//! [`EmitterData::particles`].

use std::sync::Arc;

use glam::{UVec2, Vec2, Vec3, Vec4};
use log::warn;

use crate::error::{EmitterError, Result};
use crate::keyframe::KEYFRAME_COUNT;
use crate::particle::Particle;
use crate::pool::CAPACITY_MARGIN;
use crate::rng::EmitterRng;

/// Stochastic ejection parameters
///
/// Used by the emitter template and, for stand-alone emission nodes, as a
/// per-node override.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct EjectionParams {
    /// Base time between two spawns in milliseconds
    pub period_ms: u32,
    /// Uniform integer variance applied to the period, strictly below it
    pub period_variance_ms: u32,
    /// Base ejection speed
    pub velocity: f32,
    /// Uniform variance applied to the ejection speed
    pub velocity_variance: f32,
    /// Distance along the ejection direction at which particles appear
    pub offset: f32,
    /// Minimum cone deflection from the emission axis (degrees)
    pub theta_min: f32,
    /// Maximum cone deflection from the emission axis (degrees)
    pub theta_max: f32,
    /// Azimuth rotation speed (degrees per second of emitter clock)
    pub phi_reference_vel: f32,
    /// Random azimuth range added on top of the reference angle (degrees)
    pub phi_variance: f32,
}

impl Default for EjectionParams {
    fn default() -> Self {
        Self {
            period_ms: 100,
            period_variance_ms: 0,
            velocity: 2.0,
            velocity_variance: 1.0,
            offset: 0.0,
            theta_min: 0.0,
            theta_max: 90.0,
            phi_reference_vel: 0.0,
            phi_variance: 360.0,
        }
    }
}

impl EjectionParams {
    /// Check every parameter against its valid range
    pub fn validate(&self) -> Result<()> {
        if self.period_ms < 1 {
            return Err(EmitterError::invalid("period_ms", "must be at least 1 ms"));
        }
        if self.period_variance_ms >= self.period_ms {
            return Err(EmitterError::invalid(
                "period_variance_ms",
                format!(
                    "{} must be below the period of {} ms",
                    self.period_variance_ms, self.period_ms
                ),
            ));
        }
        if !(self.velocity >= 0.0) {
            return Err(EmitterError::invalid("velocity", "must not be negative"));
        }
        if !(0.0..=self.velocity).contains(&self.velocity_variance) {
            return Err(EmitterError::invalid(
                "velocity_variance",
                format!("must lie within [0, {}]", self.velocity),
            ));
        }
        if !(self.offset >= 0.0) {
            return Err(EmitterError::invalid("offset", "must not be negative"));
        }
        if self.theta_min < 0.0 {
            return Err(EmitterError::invalid("theta_min", "must not be negative"));
        }
        if self.theta_max > 180.0 {
            return Err(EmitterError::invalid("theta_max", "must not exceed 180"));
        }
        if self.theta_min > self.theta_max {
            return Err(EmitterError::invalid(
                "theta_min",
                format!("{} exceeds theta_max {}", self.theta_min, self.theta_max),
            ));
        }
        if !(0.0..=360.0).contains(&self.phi_variance) {
            return Err(EmitterError::invalid(
                "phi_variance",
                "must lie within [0, 360]",
            ));
        }
        Ok(())
    }

    /// Draw the delay until the next spawn, within `1..=u32::MAX` ms
    pub(crate) fn next_period_ms(&self, rng: &mut EmitterRng) -> u32 {
        let period = i64::from(self.period_ms) + rng.variance_ms(self.period_variance_ms);
        debug_assert!(period > 0, "ejection period must stay positive");
        u32::try_from(period.max(1)).unwrap_or(u32::MAX)
    }
}

/// How rendered particles are blended into the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum BlendStyle {
    /// Resolved from the particle templates at bind time
    #[default]
    Undefined,
    /// Alpha blending (src * alpha + dst * (1-alpha))
    Normal,
    /// Additive blending (src * alpha + dst)
    Additive,
    /// Subtractive blending (dst - src)
    Subtractive,
    /// Premultiplied alpha (src + dst * (1-alpha))
    PremultAlpha,
    /// Greyscale modulation
    Greyscale,
}

/// Serialized form of an animated texture
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct AnimatedTextureSpec {
    /// Playback rate
    pub frames_per_sec: f32,
    /// Tiles across and down the texture sheet
    pub tiling: [u32; 2],
    /// Frame list such as `"0-3 5 7"`
    pub frames: String,
}

/// Flipbook animation over a tiled texture sheet
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "AnimatedTextureSpec", into = "AnimatedTextureSpec")
)]
pub struct AnimatedTexture {
    frames_per_sec: f32,
    tiling: UVec2,
    frame_spec: String,
    frames: Vec<u8>,
    uvs: Vec<Vec2>,
}

impl AnimatedTexture {
    /// Build an animation from a tiling and a frame list
    ///
    /// The frame list is a whitespace separated sequence of tile indices and
    /// inclusive ranges (`"0-3 5"` plays tiles 0, 1, 2, 3, 5). Descending
    /// ranges play backwards.
    pub fn new(tiling: UVec2, frames_per_sec: f32, frame_spec: &str) -> Result<Self> {
        if tiling.x == 0 || tiling.y == 0 {
            return Err(EmitterError::InvalidAnimation(format!(
                "tiling {}x{} has no tiles",
                tiling.x, tiling.y
            )));
        }
        if !(frames_per_sec >= 0.0) {
            return Err(EmitterError::InvalidAnimation(
                "frames_per_sec must not be negative".to_string(),
            ));
        }

        let tile_count = tiling.x * tiling.y;
        let frames = parse_frame_list(frame_spec, tile_count)?;

        let mut uvs = Vec::with_capacity(((tiling.x + 1) * (tiling.y + 1)) as usize);
        for y in 0..=tiling.y {
            for x in 0..=tiling.x {
                uvs.push(Vec2::new(
                    x as f32 / tiling.x as f32,
                    y as f32 / tiling.y as f32,
                ));
            }
        }

        Ok(Self {
            frames_per_sec,
            tiling,
            frame_spec: frame_spec.to_string(),
            frames,
            uvs,
        })
    }

    /// Playback rate in frames per second
    pub fn frames_per_sec(&self) -> f32 {
        self.frames_per_sec
    }

    /// Tiles across and down the sheet
    pub fn tiling(&self) -> UVec2 {
        self.tiling
    }

    /// Parsed tile sequence
    pub fn frames(&self) -> &[u8] {
        &self.frames
    }

    /// Texture coordinates of the four quad corners for a particle of the given age
    pub fn frame_uvs(&self, age_ms: u32) -> [Vec2; 4] {
        let frame = (age_ms as f32 * (1.0 / 1000.0) * self.frames_per_sec) as usize;
        let tile = self.frames[frame % self.frames.len()] as usize;
        let row = self.tiling.x as usize;

        let uv0 = tile + tile / row;
        let uv1 = uv0 + row + 1;
        let uv2 = uv1 + 1;
        let uv3 = uv0 + 1;

        [self.uvs[uv0], self.uvs[uv1], self.uvs[uv2], self.uvs[uv3]]
    }
}

impl TryFrom<AnimatedTextureSpec> for AnimatedTexture {
    type Error = EmitterError;

    fn try_from(spec: AnimatedTextureSpec) -> Result<Self> {
        Self::new(UVec2::from(spec.tiling), spec.frames_per_sec, &spec.frames)
    }
}

impl From<AnimatedTexture> for AnimatedTextureSpec {
    fn from(anim: AnimatedTexture) -> Self {
        Self {
            frames_per_sec: anim.frames_per_sec,
            tiling: anim.tiling.to_array(),
            frames: anim.frame_spec,
        }
    }
}

fn parse_frame_list(spec: &str, tile_count: u32) -> Result<Vec<u8>> {
    let parse_tile = |token: &str| -> Result<u8> {
        let tile: u32 = token.trim().parse().map_err(|_| {
            EmitterError::InvalidAnimation(format!("`{token}` is not a tile index"))
        })?;
        if tile >= tile_count {
            return Err(EmitterError::InvalidAnimation(format!(
                "tile {tile} is outside the {tile_count} tile sheet"
            )));
        }
        u8::try_from(tile).map_err(|_| {
            EmitterError::InvalidAnimation(format!("tile {tile} exceeds 255"))
        })
    };

    let mut frames = Vec::new();
    for token in spec.split_whitespace() {
        match token.split_once('-') {
            Some((lo, hi)) => {
                let lo = parse_tile(lo)?;
                let hi = parse_tile(hi)?;
                if lo <= hi {
                    frames.extend(lo..=hi);
                } else {
                    frames.extend((hi..=lo).rev());
                }
            }
            None => frames.push(parse_tile(token)?),
        }
    }

    if frames.is_empty() {
        return Err(EmitterError::InvalidAnimation(
            "frame list is empty".to_string(),
        ));
    }
    Ok(frames)
}

/// Time-indexed size and color keys over a particle's normalized age
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct KeyframeTable {
    /// Normalized key times, ascending within [0, 1]
    pub times: [f32; KEYFRAME_COUNT],
    /// RGBA color at each key
    pub colors: [Vec4; KEYFRAME_COUNT],
    /// Size at each key
    pub sizes: [f32; KEYFRAME_COUNT],
}

impl Default for KeyframeTable {
    fn default() -> Self {
        Self {
            times: [0.0, 0.33, 0.66, 1.0],
            colors: [Vec4::ONE; KEYFRAME_COUNT],
            sizes: [1.0; KEYFRAME_COUNT],
        }
    }
}

impl KeyframeTable {
    /// Check that key times are ascending and inside [0, 1]
    pub fn validate(&self) -> Result<()> {
        if self.times[0] != 0.0 {
            return Err(EmitterError::InvalidKeyframes(format!(
                "first key time is {}, expected 0",
                self.times[0]
            )));
        }
        for pair in self.times.windows(2) {
            if !(pair[1] >= pair[0]) || pair[1] > 1.0 {
                return Err(EmitterError::InvalidKeyframes(format!(
                    "key times {:?} are not ascending within [0, 1]",
                    self.times
                )));
            }
        }
        if self.sizes.iter().any(|s| *s < 0.0) {
            return Err(EmitterError::InvalidKeyframes(
                "sizes must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-particle physics and visual template
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ParticleData {
    /// Velocity-proportional drag coefficient
    pub drag: f32,
    /// Scale applied to the environment wind
    pub wind: f32,
    /// Scale applied to the environment gravity
    pub gravity: f32,
    /// Fraction of the emitter velocity added to the ejection velocity
    pub inherited_vel_factor: f32,
    /// Constant acceleration as a multiple of the initial velocity
    pub constant_acceleration: f32,
    /// Base lifetime in milliseconds
    pub lifetime_ms: u32,
    /// Integer lifetime variance in milliseconds
    pub lifetime_variance_ms: u32,
    /// Spin speed in degrees per second
    pub spin_speed: f32,
    /// Lower bound of the random spin factor
    pub spin_random_min: f32,
    /// Upper bound of the random spin factor
    pub spin_random_max: f32,
    /// Legacy blend hint, used when the emitter blend style is undefined
    pub use_inv_alpha: bool,
    /// Texture used when the emitter has none
    pub texture_name: Option<String>,
    /// Static texture coordinates of the four quad corners
    pub tex_coords: [Vec2; 4],
    /// Size and color keys
    pub keys: KeyframeTable,
    /// Optional flipbook animation, replacing the static coordinates
    pub animation: Option<AnimatedTexture>,
}

impl Default for ParticleData {
    fn default() -> Self {
        Self {
            drag: 0.0,
            wind: 1.0,
            gravity: 0.0,
            inherited_vel_factor: 0.0,
            constant_acceleration: 0.0,
            lifetime_ms: 1000,
            lifetime_variance_ms: 0,
            spin_speed: 0.0,
            spin_random_min: 0.0,
            spin_random_max: 0.0,
            use_inv_alpha: false,
            texture_name: None,
            tex_coords: [
                Vec2::new(0.0, 0.0),
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(1.0, 0.0),
            ],
            keys: KeyframeTable::default(),
            animation: None,
        }
    }
}

impl ParticleData {
    /// Check the template against its valid ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.drag.is_finite() && self.wind.is_finite() && self.gravity.is_finite()) {
            return Err(EmitterError::invalid(
                "drag/wind/gravity",
                "coefficients must be finite",
            ));
        }
        if self.lifetime_ms < 1 {
            return Err(EmitterError::invalid("lifetime_ms", "must be at least 1 ms"));
        }
        if self.lifetime_variance_ms >= self.lifetime_ms {
            return Err(EmitterError::invalid(
                "lifetime_variance_ms",
                format!(
                    "{} must be below the lifetime of {} ms",
                    self.lifetime_variance_ms, self.lifetime_ms
                ),
            ));
        }
        if !(-10000.0..=10000.0).contains(&self.spin_speed) {
            return Err(EmitterError::invalid(
                "spin_speed",
                "must lie within [-10000, 10000]",
            ));
        }
        if self.spin_random_min > self.spin_random_max {
            return Err(EmitterError::invalid(
                "spin_random_min",
                "exceeds spin_random_max",
            ));
        }
        self.keys.validate()
    }

    /// Longest lifetime a particle of this template can get
    pub fn max_lifetime_ms(&self) -> u32 {
        self.lifetime_ms.saturating_add(self.lifetime_variance_ms)
    }

    /// Finish initializing a freshly ejected particle
    ///
    /// Expects position, velocity and orientation to already hold the ejection
    /// state. Adds the inherited emitter velocity, derives the constant
    /// acceleration, and draws lifetime and spin.
    pub fn initialize_particle(
        &self,
        particle: &mut Particle,
        inherit_vel: Vec3,
        rng: &mut EmitterRng,
    ) {
        particle.velocity += inherit_vel * self.inherited_vel_factor;
        particle.acceleration = particle.velocity * self.constant_acceleration;

        let lifetime = i64::from(self.lifetime_ms) + rng.variance_ms(self.lifetime_variance_ms);
        particle.total_lifetime = lifetime.clamp(1, i64::from(u32::MAX)) as u32;

        particle.spin_speed =
            self.spin_speed * rng.between(self.spin_random_min, self.spin_random_max);
    }
}

/// Emitter template: ejection statistics, render flags and bound particle templates
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct EmitterData {
    pub ejection: EjectionParams,
    /// Soft-particle fade distance
    pub softness_distance: f32,
    /// Blend factor between particle color and ambient-lit color
    pub ambient_factor: f32,
    /// Skip forward-integrating particles spawned within one emission call
    pub override_advance: bool,
    /// Render as oriented ribbons instead of billboards
    pub orient_particles: bool,
    /// Oriented particles follow velocity rather than the ejection direction
    pub orient_on_velocity: bool,
    /// Render as ribbons aligned to `align_direction`
    pub align_particles: bool,
    pub align_direction: Vec3,
    /// Use the emitter's size keys instead of the particle template's
    pub use_emitter_sizes: bool,
    /// Use the emitter's color keys instead of the particle template's
    pub use_emitter_colors: bool,
    /// Emission time box in milliseconds, 0 for unlimited
    pub lifetime_ms: u32,
    pub lifetime_variance_ms: u32,
    pub blend_style: BlendStyle,
    /// Sort far to near before building vertices
    pub sort_particles: bool,
    /// Write quads back to front in the vertex buffer
    pub reverse_order: bool,
    /// Texture overriding the particle templates' textures
    pub texture_name: Option<String>,
    /// Draw at full resolution rather than offscreen
    pub high_res_only: bool,
    /// Draw into reflection passes
    pub render_reflection: bool,
    /// Bound particle templates, resolved by the configuration layer
    #[cfg_attr(feature = "serde-support", serde(skip))]
    pub particles: Vec<Arc<ParticleData>>,
}

impl Default for EmitterData {
    fn default() -> Self {
        Self {
            ejection: EjectionParams::default(),
            softness_distance: 1.0,
            ambient_factor: 0.0,
            override_advance: true,
            orient_particles: false,
            orient_on_velocity: true,
            align_particles: false,
            align_direction: Vec3::Y,
            use_emitter_sizes: false,
            use_emitter_colors: false,
            lifetime_ms: 0,
            lifetime_variance_ms: 0,
            blend_style: BlendStyle::Undefined,
            sort_particles: false,
            reverse_order: false,
            texture_name: None,
            high_res_only: true,
            render_reflection: true,
            particles: Vec::new(),
        }
    }
}

impl EmitterData {
    /// Create an emitter template bound to the given particle templates
    pub fn with_particles(particles: Vec<ParticleData>) -> Self {
        Self {
            particles: particles.into_iter().map(Arc::new).collect(),
            ..Default::default()
        }
    }

    /// Check the template and every bound particle template
    pub fn validate(&self) -> Result<()> {
        self.ejection.validate()?;

        if !(self.softness_distance >= 0.0) {
            return Err(EmitterError::invalid(
                "softness_distance",
                "must not be negative",
            ));
        }
        if self.lifetime_variance_ms > self.lifetime_ms {
            return Err(EmitterError::invalid(
                "lifetime_variance_ms",
                format!("exceeds the emitter lifetime of {} ms", self.lifetime_ms),
            ));
        }
        if self.align_particles && self.align_direction.length_squared() == 0.0 {
            return Err(EmitterError::invalid(
                "align_direction",
                "must not be the zero vector",
            ));
        }
        if self.particles.is_empty() {
            return Err(EmitterError::NoParticleTemplates(
                "<unnamed>".to_string(),
            ));
        }
        for particle in &self.particles {
            particle.validate()?;
        }
        Ok(())
    }

    /// Longest lifetime over all bound particle templates
    pub fn max_particle_lifetime_ms(&self) -> u32 {
        self.particles
            .iter()
            .map(|p| p.max_lifetime_ms())
            .max()
            .unwrap_or(0)
    }

    /// Pool size expected to cover the steady state without growth
    pub fn initial_capacity(&self) -> usize {
        let min_period = self
            .ejection
            .period_ms
            .saturating_sub(self.ejection.period_variance_ms)
            .max(1);
        (self.max_particle_lifetime_ms() / min_period) as usize + CAPACITY_MARGIN
    }

    /// Blend style after resolving `Undefined` from the particle templates
    pub fn resolved_blend_style(&self) -> BlendStyle {
        if self.blend_style != BlendStyle::Undefined {
            return self.blend_style;
        }
        let Some(first) = self.particles.first() else {
            return BlendStyle::Undefined;
        };
        if self
            .particles
            .iter()
            .any(|p| p.use_inv_alpha != first.use_inv_alpha)
        {
            warn!("Particle templates have inconsistent use_inv_alpha settings");
        }
        if first.use_inv_alpha {
            BlendStyle::Normal
        } else {
            BlendStyle::Additive
        }
    }

    /// Alignment axis as a unit vector
    pub fn align_axis(&self) -> Vec3 {
        self.align_direction.normalize_or(Vec3::Y)
    }

    /// Texture for the whole emitter, if it overrides the particle textures
    pub fn texture(&self) -> Option<&str> {
        self.texture_name.as_deref()
    }

    /// Warn when the particle templates disagree on texture and no override is set
    pub(crate) fn check_texture_consistency(&self) {
        if self.texture_name.is_some() {
            return;
        }
        if let Some(first) = self.particles.first() {
            if self
                .particles
                .iter()
                .any(|p| p.texture_name != first.texture_name)
            {
                warn!("Particle templates reference different textures");
            }
        }
    }
}
