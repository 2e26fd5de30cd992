//! Headless render loop.
//!
//! A builder thread reflects WGSL shaders, assembles scene snapshots and hands
//! them to the render loop, breaking the scene for a while midway to show the
//! diagnostics path. The loop renders on the headless backend and prints what
//! the editor would see.
//!
//! ```bash
//! RUST_LOG=hotgraph=debug cargo run --example headless -- --frames 90 --resize-at 40
//! ```

use std::path::Path;
use std::thread;
use std::time::Duration;

use clap::Parser;

use hotgraph::backend::{HeadlessBackend, TextureFormat};
use hotgraph::scene::{
    scene_channel, DrawDecl, PassDecl, SamplerRef, SceneDescription, SceneSender, SourceLocation,
    SurfaceDecl,
};
use hotgraph::shader::{reflect_wgsl, CompiledShader, ReflectError};
use hotgraph::{RendererConfig, SceneRenderer};

const ACCUMULATE: &str = r#"
struct Frame {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    resolution: vec4<f32>,
    time: vec4<f32>,
    audio: array<vec4<f32>, 2>,
    compat: array<vec4<f32>, 4>,
}

@group(0) @binding(0) var<uniform> frame: Frame;
@group(0) @binding(1) var history: texture_2d<f32>;
@group(0) @binding(2) var history_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let previous = textureSample(history, history_sampler, in.uv);
    let pulse = 0.5 + 0.5 * sin(frame.time.x + frame.audio[0].x);
    return mix(previous, vec4<f32>(in.uv, pulse, 1.0), 0.1);
}
"#;

const PRESENT: &str = r#"
@group(0) @binding(1) var accum: texture_2d<f32>;
@group(0) @binding(2) var accum_sampler: sampler;

@fragment
fn fs_main(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {
    let size = vec2<f32>(textureDimensions(accum));
    return textureSample(accum, accum_sampler, position.xy / size);
}
"#;

#[derive(Parser, Debug)]
#[command(name = "headless", about = "Run the render graph on the headless backend", version)]
struct Args {
    /// Number of frames to render
    #[arg(long, default_value = "120")]
    frames: u64,

    /// Initial framebuffer width in pixels
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Initial framebuffer height in pixels
    #[arg(long, default_value = "720")]
    height: u32,

    /// Halve the framebuffer size at this frame
    #[arg(long)]
    resize_at: Option<u64>,

    /// Milliseconds between scene edits published by the builder thread
    #[arg(long, default_value = "400")]
    edit_interval: u64,

    /// Milliseconds per frame
    #[arg(long, default_value = "16")]
    frame_time: u64,
}

/// Shaders keyed `path:entry_point`
fn compile(path: &str, source: &str) -> Result<Vec<(String, CompiledShader)>, ReflectError> {
    Ok(reflect_wgsl(Path::new(path), source)?
        .into_iter()
        .map(|shader| (format!("{}:{}", path, shader.entry_point), shader))
        .collect())
}

fn build_scene(version: u32, broken: bool) -> Result<SceneDescription, ReflectError> {
    let path = "scenes/feedback.scenegraph";
    let mut scene = SceneDescription::new(format!("{path}@{version}"));
    for (name, shader) in compile("shaders/accumulate.wgsl", ACCUMULATE)?
        .into_iter()
        .chain(compile("shaders/present.wgsl", PRESENT)?)
    {
        scene = scene.with_shader(&name, shader);
    }

    let mut history = SamplerRef::new("accum");
    history.binding = Some("history".to_string());
    history.location = Some(SourceLocation::new(path, 9));

    let present_source = if broken { "acum" } else { "accum" };
    let mut present = SamplerRef::new(present_source);
    present.binding = Some("accum".to_string());
    present.location = Some(SourceLocation::new(path, 16));

    Ok(scene
        .with_surface(
            "accum",
            SurfaceDecl::target(TextureFormat::Rgba16Float)
                .relative(0.5, 0.5)
                .declared_at(SourceLocation::new(path, 2)),
        )
        .with_surface(
            "screen",
            SurfaceDecl::target(TextureFormat::Rgba8Unorm).declared_at(SourceLocation::new(path, 3)),
        )
        .with_pass(
            PassDecl::new("accumulate")
                .target("accum")
                .sample(history)
                .draw(DrawDecl::fullscreen(&[
                    "shaders/accumulate.wgsl:vs_main",
                    "shaders/accumulate.wgsl:fs_main",
                ]))
                .declared_at(SourceLocation::new(path, 6)),
        )
        .with_pass(
            PassDecl::new("present")
                .target("screen")
                .sample(present)
                .draw(DrawDecl::fullscreen(&[
                    "shaders/accumulate.wgsl:vs_main",
                    "shaders/present.wgsl:fs_main",
                ]))
                .declared_at(SourceLocation::new(path, 13)),
        ))
}

/// Publish a good scene, a broken edit, then the fix.
fn run_builder(sender: SceneSender, interval: Duration) {
    for (version, broken) in [(1, false), (2, true), (3, false)] {
        match build_scene(version, broken) {
            Ok(scene) => {
                log::info!("Builder: publishing scene version {}", version);
                if !sender.publish(scene) {
                    log::warn!("Builder: render side gone");
                    return;
                }
            }
            Err(err) => log::error!("Builder: {}", err),
        }
        thread::sleep(interval);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = RendererConfig::default();
    let (sender, receiver) = scene_channel(config.scene_queue_depth);
    let interval = Duration::from_millis(args.edit_interval);
    let builder = thread::spawn(move || run_builder(sender, interval));

    let mut renderer = SceneRenderer::new(HeadlessBackend::new(), config);
    let audio = renderer.audio();
    let mut size = (args.width, args.height);

    for frame in 0..args.frames {
        if renderer.poll_scene_updates(&receiver)? {
            log::info!("Frame {}: new scene loaded", frame);
        }
        if args.resize_at == Some(frame) {
            size = ((size.0 / 2).max(1), (size.1 / 2).max(1));
            log::info!("Frame {}: framebuffer resized to {}x{}", frame, size.0, size.1);
        }

        let t = frame as f32 * 0.1;
        audio.set_channel(0, [t.sin().abs(), t.cos().abs(), 0.5, 0.25]);

        let drawn = renderer.render_frame(size)?;
        // Stats are all the demo reports
        renderer.backend_mut().clear_submissions();
        while let Some(message) = renderer.diagnostics().drain_one() {
            println!("{message}");
        }
        if frame % 30 == 0 {
            let views = renderer.target_views();
            let shown: Vec<_> = views
                .iter()
                .map(|v| format!("{}{}", v.name, if v.rendered { "" } else { " (not rendered)" }))
                .collect();
            log::info!(
                "Frame {}: drawn={} valid={} targets=[{}]",
                frame,
                drawn,
                renderer.scene_valid(),
                shown.join(", ")
            );
        }
        thread::sleep(Duration::from_millis(args.frame_time));
    }

    if builder.join().is_err() {
        log::error!("Scene builder thread panicked");
    }
    renderer.destroy_scene()?;
    let stats = renderer.backend().stats();
    log::info!(
        "Done after {} frames: {} submits, {} framebuffers, {} pipelines, {} texture allocations",
        renderer.frame_counter(),
        stats.submits,
        stats.framebuffers_created,
        stats.pipelines_created,
        stats.textures_created
    );
    Ok(())
}
