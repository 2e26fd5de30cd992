//! End-to-end tests of the scene renderer on the headless backend.
//!
//! # Test Categories
//!
//! - **Scenarios**: first frame, resize, broken sampler next to a healthy pass
//! - **Invalidation**: generation counters and rebuild counts
//! - **Ping-pong**: feedback passes read the previous frame's image
//! - **Failures**: diagnostics attribution, deduplication, device loss
//! - **Hand-off**: scenes published from another thread

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rstest::rstest;

use common::{
    base_scene, sampling_fragment, single_pass_scene, solid_pass, TestContext, SCENE_PATH, SOLID,
    VERTEX,
};
use hotgraph::backend::{
    DescriptorResource, DescriptorSetHandle, PipelineBindPoint, RecordedCommand, TextureFormat,
};
use hotgraph::binding::BindingKind;
use hotgraph::render_graph::{PassState, StructuralError};
use hotgraph::scene::{
    scene_channel, DrawDecl, MeshData, PassDecl, SamplerRef, SceneDescription, SourceLocation,
    SurfaceDecl,
};
use hotgraph::shader::{CompiledShader, ShaderStages};
use hotgraph::surface::AllocationState;
use hotgraph::RenderError;

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_empty_scene_draws_nothing() {
    let mut ctx = TestContext::new();
    ctx.load(SceneDescription::new(SCENE_PATH));

    assert!(!ctx.render((640, 480), 3));
    assert!(ctx.messages().is_empty());
    assert_eq!(ctx.stats().submits, 0);
}

#[test]
fn test_no_scene_draws_nothing() {
    let mut ctx = TestContext::new();
    assert!(!ctx.render((640, 480), 1));
    assert!(ctx.messages().is_empty());
}

/// One pass, one framebuffer-sized target: built once, reused afterwards.
#[test]
fn test_first_frame_builds_once() {
    let mut ctx = TestContext::new();
    ctx.load(single_pass_scene());

    assert!(ctx.render((640, 480), 1));
    assert!(ctx.rendered("color"));
    assert!(ctx.renderer.scene_valid());
    let stats = ctx.stats();
    assert_eq!(stats.framebuffers_created, 1);
    assert_eq!(stats.render_passes_created, 1);
    assert_eq!(stats.pipelines_created, 1);

    assert!(ctx.render((640, 480), 1));
    let after = ctx.stats();
    assert_eq!(after.framebuffers_created, 1);
    assert_eq!(after.render_passes_created, 1);
    assert_eq!(after.pipelines_created, 1);
    assert_eq!(after.submits, 2);
    assert_eq!(ctx.renderer.pass_state("main"), Some(PassState::Submitted));
    assert!(ctx.messages().is_empty());
}

/// Changing the framebuffer size reallocates the target exactly once.
#[test]
fn test_resize_rebuilds_once() {
    let mut ctx = TestContext::new();
    ctx.load(single_pass_scene());
    ctx.render((640, 480), 2);
    let generation = ctx.generation("color");

    ctx.render((800, 600), 1);
    assert_eq!(ctx.generation("color"), generation + 1);
    let stats = ctx.stats();
    assert_eq!(stats.framebuffers_created, 2);
    assert_eq!(stats.framebuffers_destroyed, 1);
    assert_eq!(stats.render_passes_created, 2);
    assert_eq!(stats.pipelines_created, 2);
    assert_eq!(stats.pipelines_destroyed, 1);

    ctx.render((800, 600), 3);
    assert_eq!(ctx.generation("color"), generation + 1);
    assert_eq!(ctx.stats().framebuffers_created, 2);
    assert_eq!(ctx.stats().pipelines_created, 2);

    let surface = ctx.renderer.surface("color").unwrap();
    assert_eq!(surface.current_size(), Some((800, 600)));
}

/// A broken sampler reference is reported by name; earlier passes still render.
#[test]
fn test_unknown_sampler_keeps_healthy_pass() {
    let mut ctx = TestContext::new();
    let mut missing = SamplerRef::new("missing_texture");
    missing.location = Some(SourceLocation::new(SCENE_PATH, 12));
    let scene = base_scene()
        .with_pass(solid_pass("good", "a"))
        .with_pass(solid_pass("bad", "b").sample(missing));
    ctx.load(scene);

    assert!(ctx.render((320, 240), 1));
    assert!(!ctx.renderer.scene_valid());
    assert!(ctx.rendered("a"));
    assert!(!ctx.rendered("b"));

    let messages = ctx.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].text.contains("missing_texture"));
    assert_eq!(messages[0].line, Some(12));

    let views = ctx.renderer.target_views();
    let names: Vec<_> = views.iter().map(|v| (v.name.as_str(), v.rendered)).collect();
    assert_eq!(names, vec![("a", true), ("b", false)]);
    assert!(matches!(
        ctx.renderer.pass_error("bad"),
        Some(StructuralError::UnknownSampler { .. })
    ));
}

/// Passes after the first failing one are not submitted for that frame.
#[test]
fn test_failure_stops_later_passes() {
    let mut ctx = TestContext::new();
    let scene = base_scene()
        .with_pass(solid_pass("broken", "a").sample_surface("nowhere"))
        .with_pass(solid_pass("after", "b"));
    ctx.load(scene);

    assert!(!ctx.render((64, 64), 2));
    assert!(!ctx.rendered("b"));
    assert_eq!(ctx.renderer.pass_state("after"), Some(PassState::Idle));
    assert_eq!(ctx.stats().submits, 0);
}

// ============================================================================
// Invalidation
// ============================================================================

#[test]
fn test_size_mismatch_reported_once() {
    let mut ctx = TestContext::new();
    let scene = base_scene()
        .with_surface(
            "big",
            SurfaceDecl::target(TextureFormat::Rgba8Unorm).fixed(64, 64),
        )
        .with_surface(
            "small",
            SurfaceDecl::target(TextureFormat::Rgba8Unorm).fixed(32, 32),
        )
        .with_pass(
            solid_pass("split", "big")
                .target("small")
                .declared_at(SourceLocation::new(SCENE_PATH, 7)),
        );
    ctx.load(scene);

    assert!(!ctx.render((640, 480), 5));
    let messages = ctx.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].line, Some(7));
    assert!(messages[0].text.contains("big"));
    assert!(messages[0].text.contains("small"));
    assert!(!ctx.renderer.scene_valid());
    assert_eq!(ctx.stats().framebuffers_created, 0);
}

/// A pass that recovers and then fails the same way again is reported again.
#[test]
fn test_failure_after_recovery_reported_again() {
    let mut ctx = TestContext::new();
    let scene = base_scene()
        .with_surface("color", SurfaceDecl::target(TextureFormat::Rgba8Unorm))
        .with_surface(
            "fixed",
            SurfaceDecl::target(TextureFormat::Rgba8Unorm).fixed(64, 64),
        )
        .with_pass(
            solid_pass("overlay", "color")
                .target("fixed")
                .declared_at(SourceLocation::new(SCENE_PATH, 4)),
        );
    ctx.load(scene);

    assert!(!ctx.render((128, 128), 2));
    let first = ctx.messages();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].line, Some(4));
    assert!(!ctx.renderer.scene_valid());

    assert!(ctx.render((64, 64), 1));
    assert!(ctx.messages().is_empty());
    assert!(ctx.renderer.scene_valid());

    assert!(!ctx.render((128, 128), 2));
    let second = ctx.messages();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].text, first[0].text);
    assert!(!ctx.renderer.scene_valid());
}

/// Every reallocation bumps the generation and rebuilds exactly once.
#[rstest]
#[case::grow(vec![(100, 100), (200, 100), (200, 100), (400, 300)], 3)]
#[case::steady(vec![(128, 128), (128, 128), (128, 128)], 1)]
#[case::shrink_and_back(vec![(256, 256), (16, 16), (256, 256)], 3)]
fn test_generation_tracks_reallocations(#[case] sizes: Vec<(u32, u32)>, #[case] builds: u32) {
    let mut ctx = TestContext::new();
    ctx.load(single_pass_scene());

    let mut last = 0;
    for size in &sizes {
        ctx.render(*size, 1);
        let generation = ctx.generation("color");
        assert!(generation >= last);
        last = generation;
    }
    assert_eq!(last, u64::from(builds));
    assert_eq!(ctx.stats().framebuffers_created, builds);
    assert_eq!(ctx.stats().pipelines_created, builds);
    assert_eq!(ctx.stats().invalid_destroys, 0);
}

#[test]
fn test_reallocation_resets_descriptor_pools() {
    let mut ctx = TestContext::new();
    ctx.load(single_pass_scene());
    ctx.render((100, 100), 2);
    let resets = ctx.stats().descriptor_pool_resets;
    let updates = ctx.stats().descriptor_updates;

    ctx.render((100, 100), 2);
    assert_eq!(ctx.stats().descriptor_pool_resets, resets);
    assert_eq!(ctx.stats().descriptor_updates, updates + 2);

    ctx.render((50, 50), 1);
    assert!(ctx.stats().descriptor_pool_resets > resets);
}

#[test]
fn test_relative_and_fixed_sizes() {
    let mut ctx = TestContext::new();
    let scene = base_scene()
        .with_surface(
            "half",
            SurfaceDecl::target(TextureFormat::Rgba16Float).relative(0.5, 0.5),
        )
        .with_surface(
            "fixed",
            SurfaceDecl::target(TextureFormat::Rgba8Unorm).fixed(32, 16),
        )
        .with_pass(solid_pass("a", "half"))
        .with_pass(solid_pass("b", "fixed"));
    ctx.load(scene);

    ctx.render((640, 480), 1);
    assert_eq!(
        ctx.renderer.surface("half").unwrap().current_size(),
        Some((320, 240))
    );
    ctx.render((1280, 720), 1);
    assert_eq!(
        ctx.renderer.surface("fixed").unwrap().current_size(),
        Some((32, 16))
    );
    assert_eq!(ctx.generation("fixed"), 1);
    assert_eq!(ctx.generation("half"), 2);
}

// ============================================================================
// Ping-pong
// ============================================================================

fn feedback_scene() -> SceneDescription {
    base_scene()
        .with_shader(
            "shaders/accum.frag",
            sampling_fragment("shaders/accum.frag", "accum"),
        )
        .with_shader(
            "shaders/present.frag",
            sampling_fragment("shaders/present.frag", "accum"),
        )
        .with_surface("accum", SurfaceDecl::target(TextureFormat::Rgba16Float))
        .with_pass(
            PassDecl::new("accumulate")
                .target("accum")
                .sample_surface("accum")
                .draw(DrawDecl::fullscreen(&[VERTEX, "shaders/accum.frag"])),
        )
        .with_pass(
            PassDecl::new("present")
                .target("screen")
                .sample_surface("accum")
                .draw(DrawDecl::fullscreen(&[VERTEX, "shaders/present.frag"])),
        )
}

/// View bound at set 0, binding 1 by the submission at `index`
fn sampled_view(ctx: &TestContext, index: usize) -> Option<hotgraph::backend::TextureViewHandle> {
    let backend = ctx.renderer.backend();
    let submission = &backend.submissions()[index];
    let set: DescriptorSetHandle = submission.commands.iter().find_map(|cmd| match cmd {
        RecordedCommand::BindDescriptorSet { index: 0, set } => Some(*set),
        _ => None,
    })?;
    backend
        .descriptor_set_contents(set)?
        .iter()
        .find(|write| write.binding == 1)
        .and_then(|write| match write.resource {
            DescriptorResource::CombinedImageSampler { view, .. } => Some(view),
            _ => None,
        })
}

#[test]
fn test_feedback_pass_reads_previous_frame() {
    let mut ctx = TestContext::new();
    ctx.load(feedback_scene());

    for frame in 0..4usize {
        assert!(ctx.render((128, 128), 1));
        let surface = ctx.renderer.surface("accum").unwrap();
        let written = frame % 2;
        assert!(surface.is_feedback());
        assert_eq!(surface.last_written(), written);

        let image = |i: usize| surface.image(i).map(|image| image.view);
        // Two submissions per frame: accumulate, then present
        let accumulate = sampled_view(&ctx, frame * 2);
        let present = sampled_view(&ctx, frame * 2 + 1);
        assert_eq!(accumulate, image(1 - written));
        assert_eq!(present, image(written));
        assert_ne!(accumulate, present);
    }

    // Each image slot got its own framebuffer, built once
    assert_eq!(ctx.stats().framebuffers_created, 3);
    assert!(ctx.renderer.scene_valid());
}

#[test]
fn test_feedback_targets_render_into_alternating_framebuffers() {
    let mut ctx = TestContext::new();
    ctx.load(feedback_scene());
    ctx.render((64, 64), 2);

    let framebuffers: Vec<_> = ctx
        .renderer
        .backend()
        .submissions()
        .iter()
        .step_by(2)
        .filter_map(|s| {
            s.commands.iter().find_map(|cmd| match cmd {
                RecordedCommand::BeginRenderPass(begin) => Some(begin.framebuffer),
                _ => None,
            })
        })
        .collect();
    assert_eq!(framebuffers.len(), 2);
    assert_ne!(framebuffers[0], framebuffers[1]);
}

/// The UI handle of a feedback target does not flip with the ping-pong.
#[test]
fn test_feedback_target_view_is_stable() {
    let mut ctx = TestContext::new();
    ctx.load(feedback_scene());

    let mut views = Vec::new();
    let mut latest = Vec::new();
    for _ in 0..4 {
        ctx.render((64, 64), 1);
        let accum = ctx
            .renderer
            .target_views()
            .into_iter()
            .find(|view| view.name == "accum")
            .unwrap();
        assert!(accum.rendered);
        views.push(accum.view.unwrap());
        latest.push(ctx.renderer.surface("accum").unwrap().latest_image().unwrap().view);
    }
    assert!(views.iter().all(|view| *view == views[0]));
    assert_ne!(latest[0], latest[1]);

    // A resize replaces the images, and with them the handle
    ctx.render((32, 32), 1);
    let resized = ctx.renderer.target_views()[0].view.unwrap();
    assert_ne!(resized, views[0]);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_binding_conflict_names_both_shaders() {
    let mut ctx = TestContext::new();
    let vertex = CompiledShader::new("shaders/warp.vert", ShaderStages::VERTEX).with_binding(
        0,
        1,
        BindingKind::SampledImage,
        "noise",
        Some(5),
    );
    let fragment = CompiledShader::new("shaders/warp.frag", ShaderStages::FRAGMENT)
        .with_binding(0, 1, BindingKind::UniformBuffer, "params", Some(9));
    let scene = base_scene()
        .with_shader("shaders/warp.vert", vertex)
        .with_shader("shaders/warp.frag", fragment)
        .with_pass(
            PassDecl::new("warp")
                .target("out")
                .draw(DrawDecl::fullscreen(&["shaders/warp.vert", "shaders/warp.frag"])),
        );
    ctx.load(scene);

    ctx.render((64, 64), 3);
    let messages = ctx.messages();
    assert_eq!(messages.len(), 1);
    let message = &messages[0];
    assert_eq!(message.line, Some(9));
    assert!(message.text.contains("warp.vert:5"));
    assert!(message.text.contains("warp.frag:9"));
}

#[test]
fn test_unresolved_binding_points_at_shader_line() {
    let mut ctx = TestContext::new();
    let fragment = CompiledShader::new("shaders/particles.frag", ShaderStages::FRAGMENT)
        .with_binding(1, 0, BindingKind::StorageBuffer, "particles", Some(21));
    let scene = base_scene()
        .with_shader("shaders/particles.frag", fragment)
        .with_pass(
            PassDecl::new("particles")
                .target("out")
                .draw(DrawDecl::fullscreen(&[VERTEX, "shaders/particles.frag"])),
        );
    ctx.load(scene);

    ctx.render((64, 64), 1);
    let messages = ctx.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].path.as_deref(),
        Some(std::path::Path::new("shaders/particles.frag"))
    );
    assert_eq!(messages[0].line, Some(21));
    assert!(messages[0].text.contains("particles"));
}

#[test]
fn test_unknown_shader_is_reported() {
    let mut ctx = TestContext::new();
    let scene = base_scene().with_pass(
        PassDecl::new("main")
            .target("out")
            .draw(DrawDecl::fullscreen(&[VERTEX, "shaders/typo.frag"])),
    );
    ctx.load(scene);

    assert!(!ctx.render((64, 64), 2));
    let messages = ctx.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].text.contains("typo.frag"));
}

#[test]
fn test_missing_file_surface_fails_once() {
    let mut ctx = TestContext::new();
    let scene = base_scene()
        .with_shader(
            "shaders/logo.frag",
            sampling_fragment("shaders/logo.frag", "logo"),
        )
        .with_surface("logo", SurfaceDecl::file("/nonexistent/logo.png"))
        .with_pass(
            PassDecl::new("show")
                .target("out")
                .sample_surface("logo")
                .draw(DrawDecl::fullscreen(&[VERTEX, "shaders/logo.frag"])),
        );
    ctx.load(scene);

    ctx.render((64, 64), 4);
    let messages = ctx.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].text.contains("logo"));
    assert_eq!(
        ctx.renderer.surface("logo").unwrap().state(),
        AllocationState::Failed
    );
    assert!(!ctx.renderer.scene_valid());
}

#[test]
fn test_target_allocation_failure() {
    let mut ctx = TestContext::new();
    ctx.renderer.backend_mut().fail_texture_creation("color");
    ctx.load(single_pass_scene());

    assert!(!ctx.render((64, 64), 3));
    let messages = ctx.messages();
    // One for the surface, one for the pass that needs it
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.text.contains("color")));
    assert_eq!(
        ctx.renderer.surface("color").unwrap().state(),
        AllocationState::Failed
    );
}

#[test]
fn test_new_scene_clears_failures() {
    let mut ctx = TestContext::new();
    ctx.load(base_scene().with_pass(solid_pass("main", "color").sample_surface("gone")));
    ctx.render((64, 64), 2);
    assert_eq!(ctx.messages().len(), 1);

    ctx.load(single_pass_scene());
    assert!(!ctx.renderer.scene_valid());
    assert!(ctx.render((64, 64), 1));
    assert!(ctx.renderer.scene_valid());
    assert!(ctx.messages().is_empty());
}

#[test]
fn test_hung_fence_is_fatal() {
    let mut ctx = TestContext::with_fence_timeout(Duration::from_millis(20));
    ctx.load(single_pass_scene());
    ctx.renderer.backend_mut().set_hang_fences(true);

    // Both slots submit once before either has to be waited on
    assert!(ctx.renderer.render_frame((64, 64)).unwrap());
    assert!(ctx.renderer.render_frame((64, 64)).unwrap());
    let err = ctx.renderer.render_frame((64, 64)).unwrap_err();
    assert!(matches!(err, RenderError::FenceTimeout { ref pass, .. } if pass == "main"));
    assert!(err.is_device_lost());
    assert!(!ctx.renderer.scene_valid());
}

#[test]
fn test_fence_signaled_from_another_thread() {
    let mut ctx = TestContext::with_fence_timeout(Duration::from_secs(5));
    ctx.load(single_pass_scene());
    ctx.renderer.backend_mut().set_hang_fences(true);
    ctx.renderer.render_frame((64, 64)).unwrap();
    ctx.renderer.render_frame((64, 64)).unwrap();

    let signaler = ctx.renderer.backend().fence_signaler();
    let gpu = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        signaler.signal_all();
    });
    assert!(ctx.renderer.render_frame((64, 64)).unwrap());
    gpu.join().unwrap();
}

// ============================================================================
// Geometry and pass kinds
// ============================================================================

#[test]
fn test_mesh_draw_uploads_once() {
    let mut ctx = TestContext::new();
    let mesh = Arc::new(MeshData {
        path: "meshes/quad.obj".into(),
        vertices: vec![0; 4 * 16],
        vertex_stride: 16,
        indices: vec![0, 1, 2, 2, 1, 3],
    });
    let scene = base_scene()
        .with_surface("depth", SurfaceDecl::target(TextureFormat::Depth32Float))
        .with_pass(
            PassDecl::new("mesh")
                .target("color")
                .depth("depth")
                .draw(DrawDecl::mesh(mesh, &[VERTEX, SOLID]).instances(3)),
        );
    ctx.load(scene);

    ctx.render((64, 64), 3);
    let commands = ctx.last_commands();
    assert!(commands.contains(&RecordedCommand::DrawIndexed {
        indices: 0..6,
        base_vertex: 0,
        instances: 0..3,
    }));
    // uniforms x2 slots + vertex + index
    assert_eq!(ctx.stats().buffers_created, 4);
}

#[test]
fn test_ray_trace_pass_traces_target_size() {
    let mut ctx = TestContext::new();
    let raygen = CompiledShader::new("shaders/scene.rgen", ShaderStages::RAYGEN)
        .with_binding(0, 0, BindingKind::UniformBuffer, "frame", Some(2))
        .with_binding(0, 1, BindingKind::StorageImage, "traced", Some(3));
    let scene = SceneDescription::new(SCENE_PATH)
        .with_shader("shaders/scene.rgen", raygen)
        .with_surface(
            "traced",
            SurfaceDecl::target(TextureFormat::Rgba16Float).fixed(96, 54),
        )
        .with_pass(
            PassDecl::new("trace")
                .ray_trace()
                .target("traced")
                .draw(DrawDecl::fullscreen(&["shaders/scene.rgen"])),
        );
    ctx.load(scene);

    assert!(ctx.render((640, 480), 1));
    let commands = ctx.last_commands();
    assert!(commands.contains(&RecordedCommand::TraceRays {
        width: 96,
        height: 54,
        depth: 1,
    }));
    assert!(commands
        .iter()
        .any(|cmd| matches!(cmd, RecordedCommand::BindPipeline(PipelineBindPoint::RayTracing, _))));
    assert!(!commands
        .iter()
        .any(|cmd| matches!(cmd, RecordedCommand::BeginRenderPass(_))));
    assert_eq!(ctx.stats().framebuffers_created, 0);
}

// ============================================================================
// Lifecycle and hand-off
// ============================================================================

#[test]
fn test_destroy_scene_releases_everything() {
    let mut ctx = TestContext::new();
    ctx.load(feedback_scene());
    ctx.render((64, 64), 3);

    ctx.renderer.destroy_scene().unwrap();
    let stats = ctx.stats();
    assert_eq!(stats.framebuffers_created, stats.framebuffers_destroyed);
    assert_eq!(stats.pipelines_created, stats.pipelines_destroyed);
    assert_eq!(stats.textures_created, stats.textures_destroyed);
    assert_eq!(stats.invalid_destroys, 0);
    assert!(ctx.renderer.target_views().is_empty());
    assert!(!ctx.render((64, 64), 1));
}

#[test]
fn test_scene_handoff_keeps_newest() {
    let mut ctx = TestContext::new();
    let (sender, receiver) = scene_channel(2);

    let builder = thread::spawn(move || {
        for version in 1..=5 {
            let scene = SceneDescription::new(format!("scenes/v{version}.scenegraph"))
                .with_shader(VERTEX, common::fullscreen_vertex())
                .with_shader(SOLID, common::solid_fragment())
                .with_pass(solid_pass("main", "color"));
            assert!(sender.publish(scene));
        }
    });
    builder.join().unwrap();

    assert!(ctx.renderer.poll_scene_updates(&receiver).unwrap());
    let scene = ctx.renderer.scene().unwrap();
    assert_eq!(scene.path, std::path::Path::new("scenes/v5.scenegraph"));
    assert!(!ctx.renderer.poll_scene_updates(&receiver).unwrap());
    assert!(ctx.render((64, 64), 1));
}

#[test]
fn test_audio_bands_reach_uniforms() {
    let mut ctx = TestContext::new();
    ctx.load(single_pass_scene());
    ctx.renderer.audio().set_channel(1, [0.25, 0.5, 0.75, 1.0]);
    ctx.render((64, 64), 1);

    let backend = ctx.renderer.backend();
    let uniforms = backend
        .submissions()
        .last()
        .and_then(|s| {
            s.commands.iter().find_map(|cmd| match cmd {
                RecordedCommand::BindDescriptorSet { set, .. } => Some(*set),
                _ => None,
            })
        })
        .and_then(|set| backend.descriptor_set_contents(set))
        .and_then(|writes| {
            writes.iter().find_map(|write| match write.resource {
                DescriptorResource::UniformBuffer { buffer, .. } => Some(buffer),
                _ => None,
            })
        })
        .and_then(|buffer| backend.buffer_contents(buffer))
        .expect("uniform buffer");

    // view, projection, resolution, time, audio[0], audio[1]
    let offset = 64 * 2 + 16 * 3;
    let floats: [f32; 4] = bytemuck::pod_read_unaligned(&uniforms[offset..offset + 16]);
    assert_eq!(floats, [0.25, 0.5, 0.75, 1.0]);
}
