//! Pipeline behaviour that can be checked without a GPU.

use lumen::passes::{BlurSchedule, BlurSource};
use lumen::render_graph::{FrameContext, PassId, RenderGraph, RenderNode, Slot};
use lumen::shading::{self, Surface, Visibility};
use lumen::ssao::{self, Plane, SoftGBuffer, SsaoKernel};
use lumen::{
    DirectionalLight, GBufferChannel, Mat4, PointLight, RenderConfig, Vec2, Vec3, Vec4,
};

/// A node with the real pass declarations and no GPU work.
struct Declared(PassId);

impl RenderNode for Declared {
    fn id(&self) -> PassId {
        self.0
    }

    fn execute(&self, _ctx: &mut FrameContext<'_>) {}
}

fn canonical_graph() -> RenderGraph {
    PassId::ALL
        .into_iter()
        .fold(RenderGraph::builder(), |builder, id| builder.node(Declared(id)))
        .build()
        .expect("canonical order is valid")
}

#[test]
fn every_configuration_plans_without_missing_inputs() {
    let graph = canonical_graph();
    for config in RenderConfig::combinations() {
        let plan = graph
            .plan(&config)
            .unwrap_or_else(|e| panic!("{config:?}: {e}"));

        // Shadows, lighting and composite always run, in that order.
        let passes = plan.passes();
        assert_eq!(passes[0], PassId::DirectionalShadow);
        assert_eq!(passes[1], PassId::PointShadow);
        assert_eq!(passes.last(), Some(&PassId::Composite));
        assert!(plan.contains(PassId::Lighting));

        assert_eq!(plan.contains(PassId::AmbientOcclusion), config.ssao);
        assert_eq!(plan.contains(PassId::Bloom), config.bloom);
        assert_eq!(plan.contains(PassId::Geometry), config.needs_geometry_pass());

        // Executed passes keep their canonical relative order.
        let mut sorted = passes.to_vec();
        sorted.sort();
        assert_eq!(sorted, passes);
    }
}

#[test]
fn forward_ssao_still_runs_geometry_first() {
    let config = RenderConfig {
        ssao: true,
        ..RenderConfig::minimal()
    };
    let plan = canonical_graph().plan(&config).unwrap();
    assert_eq!(
        plan.passes(),
        [
            PassId::DirectionalShadow,
            PassId::PointShadow,
            PassId::Geometry,
            PassId::AmbientOcclusion,
            PassId::Lighting,
            PassId::Composite,
        ]
    );
}

#[test]
fn bloom_reads_the_stencil_lighting_writes() {
    let config = RenderConfig::default();
    assert!(PassId::Bloom.reads(&config).contains(&Slot::EmissiveStencil));
    assert!(PassId::Lighting.writes(&config).contains(&Slot::EmissiveStencil));
}

#[test]
fn debug_channel_without_deferred_still_fills_gbuffer() {
    let config = RenderConfig {
        gbuffer_view: GBufferChannel::Normal,
        ..RenderConfig::minimal()
    };
    let plan = canonical_graph().plan(&config).unwrap();
    assert!(plan.contains(PassId::Geometry));
}

#[test]
fn default_bloom_ends_in_second_buffer() {
    let schedule = BlurSchedule::new(lumen::defaults::DEFAULT_BLOOM_ITERATIONS);
    let steps = schedule.steps();
    assert_eq!(steps.len(), 10);
    assert_eq!(steps[0].source, BlurSource::Bright);
    assert!(steps[0].horizontal);
    assert!(!steps[9].horizontal);
    assert_eq!(schedule.output(), Some(1));
}

/// Depth the directional shadow pass stores in texel `(tx, ty)` of a
/// `size`-square map whose only caster is the floor `y = 0`. Row 0 is the
/// top of the map.
fn floor_depth_at_texel(sun: &DirectionalLight, size: u32, tx: u32, ty: u32) -> f32 {
    let ndc = Vec2::new(
        (tx as f32 + 0.5) / size as f32 * 2.0 - 1.0,
        1.0 - (ty as f32 + 0.5) / size as f32 * 2.0,
    );
    let light_space = sun.light_space();
    let inv = light_space.inverse();
    let near = inv.project_point3(ndc.extend(0.0));
    let far = inv.project_point3(ndc.extend(1.0));
    let hit = near.lerp(far, near.y / (near.y - far.y));
    light_space.project_point3(hit).z
}

/// Directional visibility of `p` as the lighting shader computes it.
fn floor_lit(sun: &DirectionalLight, size: u32, p: Vec3, bias: f32) -> bool {
    let uvz = sun.shadow_matrix().project_point3(p);
    let on_map = (0.0..1.0).contains(&uvz.x) && (0.0..1.0).contains(&uvz.y);
    assert!(on_map, "{p} off the map");
    let tx = (uvz.x * size as f32) as u32;
    let ty = (uvz.y * size as f32) as u32;
    uvz.z - bias <= floor_depth_at_texel(sun, size, tx, ty)
}

#[test]
fn shadow_bias_keeps_lit_floor_lit() {
    // Low sun, about 11 degrees above the horizon.
    let sun = DirectionalLight {
        position: Vec3::new(-5.0, 1.0, 0.0),
        target: Vec3::ZERO,
        ..Default::default()
    };
    let size = lumen::defaults::DEFAULT_SHADOW_MAP_SIZE;
    let points: Vec<Vec3> = (0..40)
        .flat_map(|i| {
            (0..40).map(move |j| Vec3::new(i as f32 * 0.0731 - 1.3, 0.0, j as f32 * 0.0617 - 1.2))
        })
        .collect();

    let biased = lumen::defaults::DEFAULT_SHADOW_BIAS;
    for p in &points {
        assert!(floor_lit(&sun, size, *p, biased), "acne at {p}");
    }

    let acne = points.iter().filter(|p| !floor_lit(&sun, size, **p, 0.0)).count();
    assert!(acne > 0, "an unbiased grazing floor should self-shadow");
}

#[test]
fn point_light_faces_cover_every_direction() {
    let light = PointLight::default();
    let faces = light.cube_faces();
    for dir in [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z] {
        let target = light.position + dir * 2.0;
        let hits = faces
            .iter()
            .filter(|m| {
                let c = **m * Vec4::from((target, 1.0));
                let n = c.truncate() / c.w;
                c.w > 0.0 && n.x.abs() <= 1.0 && n.y.abs() <= 1.0 && (0.0..=1.0).contains(&n.z)
            })
            .count();
        assert_eq!(hits, 1, "direction {dir}");
    }
}

fn pixel_of(p: Vec3, view: Mat4, proj: Mat4, width: u32, height: u32) -> (u32, u32) {
    let ndc = (proj * view).project_point3(p);
    (
        ((ndc.x * 0.5 + 0.5) * width as f32) as u32,
        ((0.5 - ndc.y * 0.5) * height as f32) as u32,
    )
}

#[test]
fn ssao_darkens_the_corner_crease() {
    let (width, height) = (256, 256);
    let view = Mat4::look_at_rh(Vec3::new(0.0, 2.0, 2.0), Vec3::new(0.0, 0.3, -2.0), Vec3::Y);
    let proj = Mat4::perspective_rh(90f32.to_radians(), 1.0, 0.1, 50.0);
    let floor = Plane {
        normal: Vec3::Y,
        offset: 0.0,
    };
    let wall = Plane {
        normal: Vec3::Z,
        offset: -2.0,
    };
    let gbuffer = SoftGBuffer::render_planes(&[floor, wall], view, proj, width, height);
    let kernel = SsaoKernel::generate(64, 0x5eed);

    let (cx, cy) = pixel_of(Vec3::new(0.0, 0.0, -1.92), view, proj, width, height);
    let (ox, oy) = pixel_of(Vec3::new(0.0, 0.0, 0.2), view, proj, width, height);
    assert!(gbuffer.get(cx, cy).is_some() && gbuffer.get(ox, oy).is_some());

    let crease = ssao::evaluate(&kernel, &gbuffer, proj, cx, cy, 0.5, 0.025);
    let open = ssao::evaluate(&kernel, &gbuffer, proj, ox, oy, 0.5, 0.025);
    assert!(crease < open, "crease {crease} vs open {open}");
    assert!(open > 0.85, "open floor {open}");
}

#[test]
fn flat_triangle_reference_shading() {
    let sun = DirectionalLight {
        position: Vec3::new(0.0, 0.0, 5.0),
        target: Vec3::ZERO,
        ..Default::default()
    };
    let point = PointLight {
        diffuse: Vec3::ZERO,
        specular: Vec3::ZERO,
        ..Default::default()
    };
    let surface = Surface {
        position: Vec3::ZERO,
        normal: Vec3::Z,
        ambient: Vec3::splat(0.5),
        diffuse: Vec3::splat(0.6),
        specular: Vec3::ZERO,
        shininess: 32.0,
    };
    let lit = shading::shade(
        &RenderConfig::minimal(),
        &surface,
        Vec3::new(0.0, 0.0, 3.0),
        &sun,
        &point,
        Visibility::default(),
    );
    let expected = surface.ambient * sun.ambient + surface.diffuse * sun.diffuse;
    assert!((lit - expected).abs().max_element() < 1e-5, "{lit} vs {expected}");
}
