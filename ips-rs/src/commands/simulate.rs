//! Headless emitter simulation along a scripted path

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use glam::{Affine3A, Vec3};
use ips_emitter::{
    CameraView, EffectLibrary, EmissionSegment, EmitterId, EmptyWorld, GraphEmitter, ObjectId,
    RayHit, RenderPass, SceneHost, SimContext, World,
};
use log::{debug, warn};
use serde::Serialize;

use crate::commands::load_library;
use crate::utils::{TableRow, create_progress_bar, format_bytes, format_ms, report_table};

/// Shape of the path the emitter follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PathShape {
    /// Stay at the origin
    Still,
    /// Move along +X
    Line,
    /// Circle the origin in the XY plane
    Circle,
}

impl PathShape {
    /// Emitter position `t_ms` into the run
    pub fn position_at(self, t_ms: u64, speed: f32, radius: f32) -> Vec3 {
        let t = t_ms as f32 / 1000.0;
        match self {
            Self::Still => Vec3::ZERO,
            Self::Line => Vec3::X * speed * t,
            Self::Circle => {
                if radius <= 0.0 {
                    return Vec3::ZERO;
                }
                let (sin, cos) = (speed / radius * t).sin_cos();
                Vec3::new(radius * cos, radius * sin, 0.0)
            }
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Effect library (YAML, or JSON by extension)
    pub file: PathBuf,

    /// Emitter to run
    #[arg(short, long)]
    pub emitter: String,

    /// Total simulated time in milliseconds
    #[arg(short, long, default_value = "3000")]
    pub duration_ms: u64,

    /// Frame length in milliseconds
    #[arg(long, default_value = "16")]
    pub step_ms: u32,

    /// Stop emitting after this many milliseconds and delete the emitter once empty
    #[arg(long)]
    pub emit_ms: Option<u64>,

    /// Path the emitter follows
    #[arg(long, value_enum, default_value = "still")]
    pub path: PathShape,

    /// Path speed in units per second
    #[arg(long, default_value = "5.0")]
    pub speed: f32,

    /// Circle radius
    #[arg(long, default_value = "5.0")]
    pub radius: f32,

    /// Height of a collision floor
    #[arg(long)]
    pub floor: Option<f32>,

    /// Seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Interval between statistics samples in milliseconds
    #[arg(long, default_value = "500")]
    pub sample_ms: u64,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Scene host that tracks which emitters are registered
#[derive(Debug, Default)]
pub struct SceneRegistry {
    members: BTreeSet<EmitterId>,
    pub adds: usize,
    pub removes: usize,
}

impl SceneRegistry {
    pub fn contains(&self, id: EmitterId) -> bool {
        self.members.contains(&id)
    }
}

impl SceneHost for SceneRegistry {
    fn add_to_scene(&mut self, id: EmitterId) {
        if self.members.insert(id) {
            self.adds += 1;
        } else {
            warn!("Emitter {} registered twice", id.0);
        }
    }

    fn remove_from_scene(&mut self, id: EmitterId) {
        if self.members.remove(&id) {
            self.removes += 1;
        } else {
            warn!("Emitter {} removed without being registered", id.0);
        }
    }
}

/// Horizontal plane particles bounce off
#[derive(Debug, Clone, Copy)]
pub struct FloorWorld {
    pub height: f32,
}

impl World for FloorWorld {
    fn cast_ray(&self, start: Vec3, end: Vec3) -> Option<RayHit> {
        if start.z < self.height || end.z >= self.height {
            return None;
        }
        let t = (start.z - self.height) / (start.z - end.z);
        Some(RayHit {
            point: start.lerp(end, t),
            normal: Vec3::Z,
        })
    }

    fn object_transform(&self, _id: ObjectId) -> Option<Affine3A> {
        None
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Sample {
    pub time_ms: u64,
    pub live: usize,
    pub capacity: usize,
    pub pending_ms: u32,
    pub in_scene: bool,
}

impl TableRow for Sample {
    const HEADERS: &'static [&'static str] = &["Time", "Live", "Capacity", "Pending", "In scene"];

    fn cells(&self) -> Vec<String> {
        vec![
            format_ms(self.time_ms),
            self.live.to_string(),
            self.capacity.to_string(),
            format!("{} ms", self.pending_ms),
            if self.in_scene { "yes" } else { "no" }.to_string(),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub emitter: String,
    pub simulated_ms: u64,
    pub spawned: usize,
    pub peak_live: usize,
    pub final_live: usize,
    pub capacity: usize,
    pub growths: u32,
    pub dead: bool,
    pub scene_adds: usize,
    pub scene_removes: usize,
    pub quads: usize,
    pub vertex_bytes: usize,
    pub samples: Vec<Sample>,
}

pub fn execute(args: &SimulateArgs, quiet: bool) -> Result<()> {
    let library = load_library(&args.file)?;
    let report = run(&library, args, quiet)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Drive one emitter through the scripted run
pub fn run(library: &EffectLibrary, args: &SimulateArgs, quiet: bool) -> Result<SimulationReport> {
    let data = library
        .build_emitter_data(&args.emitter)
        .with_context(|| format!("Failed to build emitter `{}`", args.emitter))?;
    let data = Arc::new(data);

    let id = EmitterId(1);
    let mut emitter = match args.seed {
        Some(seed) => GraphEmitter::with_seed(id, data, seed),
        None => GraphEmitter::new(id, data),
    };

    let world: Box<dyn World> = match args.floor {
        Some(height) => Box::new(FloorWorld { height }),
        None => Box::new(EmptyWorld),
    };
    let ctx = SimContext::new(&library.environment, world.as_ref());
    let mut scene = SceneRegistry::default();

    let step = args.step_ms.max(1);
    let sample_every = args.sample_ms.max(1);
    let position = |t_ms| args.path.position_at(t_ms, args.speed, args.radius);

    let pb = create_progress_bar(args.duration_ms, &args.emitter, quiet);
    let mut clock = 0u64;
    let mut next_sample = 0u64;
    let mut previous = position(0);
    let mut spawned = 0usize;
    let mut peak_live = 0usize;
    let mut deletion_requested = false;
    let mut samples = Vec::new();

    while clock < args.duration_ms {
        let ms = (args.duration_ms - clock).min(u64::from(step)) as u32;
        let dt = ms as f32 / 1000.0;
        let current = position(clock + u64::from(ms));

        let emitting = args.emit_ms.is_none_or(|limit| clock < limit);
        if emitting {
            let velocity = (current - previous) / dt;
            let segment = EmissionSegment::new(previous, current, Vec3::Z, velocity, ms);
            spawned += emitter.emit_along_segment(&segment, &ctx, &mut scene, None);
        } else if !deletion_requested {
            debug!("Emission stopped at {clock} ms, deleting when empty");
            emitter.delete_when_empty(&mut scene);
            deletion_requested = true;
        }

        emitter.advance_time(dt, &ctx);
        emitter.process_tick(&mut scene);

        previous = current;
        clock += u64::from(ms);
        peak_live = peak_live.max(emitter.len());
        pb.set_position(clock);

        if clock >= next_sample {
            let stats = emitter.stats();
            samples.push(Sample {
                time_ms: clock,
                live: stats.live,
                capacity: stats.capacity,
                pending_ms: stats.pending_ms,
                in_scene: scene.contains(id),
            });
            next_sample = clock + sample_every;
        }

        if emitter.is_dead() {
            debug!("Emitter deleted at {clock} ms");
            break;
        }
    }
    pb.finish_and_clear();

    let view = CameraView::looking(emitter.bounds().center() - Vec3::Y * 20.0, Vec3::Y);
    let (quads, vertex_bytes) = match emitter.prepare_render(&view, RenderPass::Diffuse) {
        Some(instance) => (instance.quad_count, std::mem::size_of_val(instance.vertices)),
        None => (0, 0),
    };

    let stats = emitter.stats();
    Ok(SimulationReport {
        emitter: args.emitter.clone(),
        simulated_ms: clock,
        spawned,
        peak_live,
        final_live: stats.live,
        capacity: stats.capacity,
        growths: stats.growths,
        dead: stats.dead,
        scene_adds: scene.adds,
        scene_removes: scene.removes,
        quads,
        vertex_bytes,
        samples,
    })
}

fn print_report(report: &SimulationReport) {
    println!("=== Simulation: {} ===", report.emitter);

    report_table(&report.samples).printstd();

    println!("\nSimulated:     {}", format_ms(report.simulated_ms));
    println!("Spawned:       {}", report.spawned);
    println!("Peak live:     {}", report.peak_live);
    println!("Final live:    {}", report.final_live);
    println!("Pool capacity: {} ({} growths)", report.capacity, report.growths);
    println!(
        "Scene:         {} adds, {} removes{}",
        report.scene_adds,
        report.scene_removes,
        if report.dead { ", emitter deleted" } else { "" }
    );
    println!(
        "Last frame:    {} quads, {} of vertices",
        report.quads,
        format_bytes(report.vertex_bytes as u64)
    );
}
