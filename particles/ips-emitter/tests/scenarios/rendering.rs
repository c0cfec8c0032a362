//! From emission to a render instance

use glam::Vec3;
use ips_emitter::{
    BlendStyle, CameraView, DrawTarget, EmissionSegment, ParticleVertex, RenderPass,
};
use pretty_assertions::assert_eq;

use crate::common::{CountingHost, emitter, emitter_data, with_ctx};

fn quad_depths(vertices: &[ParticleVertex]) -> Vec<f32> {
    vertices.chunks(4).map(|quad| quad[0].position[1]).collect()
}

fn line_emitter(sort: bool, reverse: bool) -> ips_emitter::GraphEmitter {
    let mut data = emitter_data(100, 5000);
    data.ejection.theta_max = 0.0;
    data.sort_particles = sort;
    data.reverse_order = reverse;
    let mut emitter = emitter(data);

    let segment = EmissionSegment::new(
        Vec3::new(0.0, 5.0, 0.0),
        Vec3::new(0.0, 25.0, 0.0),
        Vec3::Z,
        Vec3::ZERO,
        400,
    );
    with_ctx(|ctx| emitter.emit_along_segment(&segment, ctx, &mut CountingHost::default(), None));
    emitter
}

#[test]
fn test_sorted_far_to_near() {
    let mut emitter = line_emitter(true, false);
    let view = CameraView::looking(Vec3::ZERO, Vec3::Y);

    let instance = emitter.prepare_render(&view, RenderPass::Diffuse).unwrap();
    assert_eq!(quad_depths(instance.vertices), vec![25.0, 20.0, 15.0, 10.0]);
    assert_eq!(instance.indices[..6], [0, 1, 3, 1, 3, 2]);
    assert_eq!(instance.indices[6..12], [4, 5, 7, 5, 7, 6]);
}

#[test]
fn test_sorted_reverse_writes_near_first() {
    let mut emitter = line_emitter(true, true);
    let view = CameraView::looking(Vec3::ZERO, Vec3::Y);

    let instance = emitter.prepare_render(&view, RenderPass::Diffuse).unwrap();
    assert_eq!(quad_depths(instance.vertices), vec![10.0, 15.0, 20.0, 25.0]);
}

#[test]
fn test_unsorted_is_newest_first() {
    let mut emitter = line_emitter(false, false);
    let view = CameraView::looking(Vec3::ZERO, Vec3::Y);

    let instance = emitter.prepare_render(&view, RenderPass::Diffuse).unwrap();
    assert_eq!(quad_depths(instance.vertices), vec![25.0, 20.0, 15.0, 10.0]);
    assert_eq!(instance.blend_style, BlendStyle::Additive);
    assert_eq!(instance.draw_target, DrawTarget::HighRes);
    // nearest particle edge is 10 units ahead of the camera
    assert!((instance.sort_dist_sq - 100.0).abs() < 1e-3);
}

#[test]
fn test_vertex_buffer_reallocates_only_on_growth() {
    let mut emitter = line_emitter(false, false);
    let view = CameraView::default();
    assert_eq!(emitter.vertex_buffer().generation(), 0);

    emitter.prepare_render(&view, RenderPass::Diffuse);
    emitter.prepare_render(&view, RenderPass::Reflection);
    assert_eq!(emitter.vertex_buffer().generation(), 1);
    assert_eq!(
        emitter.vertex_buffer().as_bytes().len(),
        4 * 4 * std::mem::size_of::<ParticleVertex>()
    );

    let segment = EmissionSegment::new(Vec3::ZERO, Vec3::ZERO, Vec3::Z, Vec3::ZERO, 200);
    with_ctx(|ctx| emitter.emit_along_segment(&segment, ctx, &mut CountingHost::default(), None));
    emitter.prepare_render(&view, RenderPass::Diffuse);
    assert_eq!(emitter.vertex_buffer().generation(), 2);
    assert_eq!(emitter.vertex_buffer().as_slice().len(), 24);
}
