use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Result;
use clap::ValueEnum;
use rayon::prelude::*;

use crate::renderer::timeline::{layer_state_at, LayerState};
use crate::renderer::{Compositor, FrameBuffer, GpuRenderer, Timeline};
use crate::storyboard::{Layer, Scene, Shape, Storyboard, Transition};

/// On-disk frame format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FrameFormat {
    #[default]
    Ppm,
    Png,
}

impl FrameFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FrameFormat::Ppm => "ppm",
            FrameFormat::Png => "png",
        }
    }

    /// ffmpeg-style input pattern for the numbered frames
    pub fn pattern(&self) -> String {
        format!("frame_%d.{}", self.extension())
    }
}

impl std::fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Main rendering engine
pub struct RenderEngine {
    storyboard: Storyboard,
    timeline: Timeline,
    frame_buffer: FrameBuffer,
    gpu_renderer: Option<GpuRenderer>,
}

impl RenderEngine {
    /// Create new render engine from a storyboard
    pub fn new(storyboard: Storyboard, use_gpu: bool) -> Self {
        let (width, height) = storyboard.metadata.resolution.dimensions();
        let timeline = Timeline::from_storyboard(&storyboard);
        let frame_buffer = FrameBuffer::new(width, height);

        // Try to initialize GPU renderer (optional - falls back to CPU if fails)
        let gpu_renderer = if use_gpu {
            match pollster::block_on(GpuRenderer::new(width, height)) {
                Ok(gpu) => Some(gpu),
                Err(e) => {
                    tracing::warn!("GPU renderer unavailable, falling back to CPU: {e}");
                    None
                }
            }
        } else {
            None
        };

        if gpu_renderer.is_some() {
            println!("✨ GPU renderer initialized successfully");
        } else {
            println!(
                "ℹ️  Using CPU rendering (GPU unavailable, initialization failed, or disabled)"
            );
        }

        Self {
            storyboard,
            timeline,
            frame_buffer,
            gpu_renderer,
        }
    }

    /// Opacity factor from the scene's outgoing transition at local time `t`.
    fn scene_fade(scene: &Scene, t: f32) -> f32 {
        match &scene.transition {
            Some(Transition::Fade { duration }) if *duration > 0.0 => {
                ((scene.duration - t) / duration).clamp(0.0, 1.0)
            }
            _ => 1.0,
        }
    }

    /// Render one frame of the storyboard into the given buffer, CPU only.
    fn draw_frame_cpu(
        storyboard: &Storyboard,
        timeline: &Timeline,
        frame: u32,
        fb: &mut FrameBuffer,
    ) {
        let Some((scene_idx, t)) = timeline.scene_at_frame(frame) else {
            fb.clear([0, 0, 0, 255]);
            return;
        };
        let scene = &storyboard.scenes[scene_idx];
        fb.clear(scene.background.as_rgba());
        let fade = Self::scene_fade(scene, t);

        for layer in &scene.layers {
            let state = layer_state_at(layer, t);
            let opacity = state.opacity * fade;
            if opacity <= 0.0 {
                continue;
            }
            Self::draw_layer(fb, layer, &state, opacity, false);
        }
    }

    /// Draw one layer at its resolved state. When `gpu_pass` is set, plain
    /// fills already landed in the buffer via the GPU batch and only the
    /// remaining detail (strokes, labels, lines, text) is drawn here.
    fn draw_layer(fb: &mut FrameBuffer, layer: &Layer, state: &LayerState, opacity: f32, gpu_pass: bool) {
        let dx = state.x - layer.position.x;
        let dy = state.y - layer.position.y;

        match &layer.shape {
            Shape::Rect {
                width,
                height,
                corner_radius,
                fill,
                stroke,
            } => {
                let w = width * state.scale;
                let h = height * state.scale;
                let plain = *corner_radius <= 0.0;
                if let Some(fill) = fill {
                    if !(gpu_pass && plain) {
                        Compositor::fill_rect(
                            fb,
                            state.x,
                            state.y,
                            w,
                            h,
                            *corner_radius,
                            Compositor::with_opacity(fill.as_rgba(), opacity),
                        );
                    }
                }
                if let Some(stroke) = stroke {
                    Compositor::stroke_rect(
                        fb,
                        state.x,
                        state.y,
                        w,
                        h,
                        *corner_radius,
                        stroke.width,
                        Compositor::with_opacity(stroke.color.as_rgba(), opacity),
                    );
                }
            }
            Shape::Circle {
                radius,
                fill,
                stroke,
            } => {
                let r = radius * state.scale;
                if let Some(fill) = fill {
                    if !gpu_pass {
                        Compositor::fill_circle(
                            fb,
                            state.x,
                            state.y,
                            r,
                            Compositor::with_opacity(fill.as_rgba(), opacity),
                        );
                    }
                }
                if let Some(stroke) = stroke {
                    Compositor::stroke_circle(
                        fb,
                        state.x,
                        state.y,
                        r,
                        stroke.width,
                        Compositor::with_opacity(stroke.color.as_rgba(), opacity),
                    );
                }
            }
            Shape::Token {
                radius,
                fill,
                label,
                label_color,
            } => {
                let r = radius * state.scale;
                if !gpu_pass {
                    Compositor::fill_circle(
                        fb,
                        state.x,
                        state.y,
                        r,
                        Compositor::with_opacity(fill.as_rgba(), opacity),
                    );
                }
                Compositor::draw_text(
                    fb,
                    label,
                    state.x,
                    state.y,
                    r * 0.8,
                    Compositor::with_opacity(label_color.as_rgba(), opacity),
                );
            }
            Shape::Line { end, stroke, dash } => {
                let color = Compositor::with_opacity(stroke.color.as_rgba(), opacity);
                match dash {
                    Some(dash) => Compositor::draw_dashed_line(
                        fb,
                        state.x,
                        state.y,
                        end.x + dx,
                        end.y + dy,
                        stroke.width,
                        *dash,
                        color,
                    ),
                    None => Compositor::draw_line(
                        fb,
                        state.x,
                        state.y,
                        end.x + dx,
                        end.y + dy,
                        stroke.width,
                        color,
                    ),
                }
            }
            Shape::Arrow { end, stroke } => {
                Compositor::draw_arrow(
                    fb,
                    state.x,
                    state.y,
                    end.x + dx,
                    end.y + dy,
                    stroke.width,
                    Compositor::with_opacity(stroke.color.as_rgba(), opacity),
                );
            }
            Shape::Polyline { points, stroke } => {
                let shifted: Vec<(f32, f32)> =
                    points.iter().map(|p| (p.x + dx, p.y + dy)).collect();
                Compositor::draw_polyline(
                    fb,
                    &shifted,
                    stroke.width,
                    Compositor::with_opacity(stroke.color.as_rgba(), opacity),
                );
            }
            Shape::Grid { spacing, stroke } => {
                Compositor::draw_grid(
                    fb,
                    *spacing,
                    stroke.width,
                    Compositor::with_opacity(stroke.color.as_rgba(), opacity),
                );
            }
            Shape::Text {
                content,
                size,
                color,
            } => {
                Compositor::draw_text(
                    fb,
                    content,
                    state.x,
                    state.y,
                    size * state.scale,
                    Compositor::with_opacity(color.as_rgba(), opacity),
                );
            }
        }
    }

    /// Render a single frame into the engine's internal buffer
    pub fn render_frame(&mut self, frame: u32) -> Result<()> {
        if self.gpu_renderer.is_none() {
            Self::draw_frame_cpu(
                &self.storyboard,
                &self.timeline,
                frame,
                &mut self.frame_buffer,
            );
            return Ok(());
        }

        let Some((scene_idx, t)) = self.timeline.scene_at_frame(frame) else {
            self.frame_buffer.clear([0, 0, 0, 255]);
            return Ok(());
        };
        let scene = &self.storyboard.scenes[scene_idx];
        let fade = Self::scene_fade(scene, t);
        let states: Vec<(usize, LayerState, f32)> = scene
            .layers
            .iter()
            .enumerate()
            .filter_map(|(i, layer)| {
                let state = layer_state_at(layer, t);
                let opacity = state.opacity * fade;
                (opacity > 0.0).then_some((i, state, opacity))
            })
            .collect();

        // Pass 1: batch the plain fills on the GPU; the flush clears the
        // target to the scene background and reads the result back.
        if let Some(gpu) = self.gpu_renderer.as_mut() {
            for (i, state, opacity) in &states {
                match &scene.layers[*i].shape {
                    Shape::Rect {
                        width,
                        height,
                        corner_radius,
                        fill: Some(fill),
                        ..
                    } if *corner_radius <= 0.0 => {
                        gpu.fill_rect(
                            state.x,
                            state.y,
                            width * state.scale,
                            height * state.scale,
                            Compositor::with_opacity(fill.as_rgba(), *opacity),
                        );
                    }
                    Shape::Circle {
                        radius,
                        fill: Some(fill),
                        ..
                    } => {
                        gpu.fill_circle(
                            state.x,
                            state.y,
                            radius * state.scale,
                            Compositor::with_opacity(fill.as_rgba(), *opacity),
                        );
                    }
                    Shape::Token { radius, fill, .. } => {
                        gpu.fill_circle(
                            state.x,
                            state.y,
                            radius * state.scale,
                            Compositor::with_opacity(fill.as_rgba(), *opacity),
                        );
                    }
                    _ => {}
                }
            }
            gpu.flush(&mut self.frame_buffer, scene.background.as_rgba())?;
        }

        // Pass 2: strokes, lines and text composite on the CPU.
        for (i, state, opacity) in &states {
            Self::draw_layer(&mut self.frame_buffer, &scene.layers[*i], state, *opacity, true);
        }
        Ok(())
    }

    /// Save current frame
    pub fn save_frame(&self, path: &Path, format: FrameFormat) -> Result<()> {
        match format {
            FrameFormat::Ppm => self.frame_buffer.save_ppm(path),
            FrameFormat::Png => self.frame_buffer.save_png(path),
        }
    }

    /// Render all frames to the output directory. CPU rendering fans the
    /// frames out across cores; the GPU path shares one device and stays
    /// sequential.
    pub fn render(&mut self, output_dir: &Path, format: FrameFormat) -> Result<()> {
        let total_frames = self.timeline.total_frames();

        if self.gpu_renderer.is_some() {
            for frame in 0..total_frames {
                if frame % 30 == 0 {
                    println!("  Rendering frame {}/{}", frame, total_frames);
                }
                self.render_frame(frame)?;
                let path = output_dir.join(format!("frame_{}.{}", frame, format.extension()));
                self.save_frame(&path, format)?;
            }
            return Ok(());
        }

        let (width, height) = self.storyboard.metadata.resolution.dimensions();
        let done = AtomicU32::new(0);
        (0..total_frames).into_par_iter().try_for_each(|frame| {
            let mut fb = FrameBuffer::new(width, height);
            Self::draw_frame_cpu(&self.storyboard, &self.timeline, frame, &mut fb);
            let path = output_dir.join(format!("frame_{}.{}", frame, format.extension()));
            let result = match format {
                FrameFormat::Ppm => fb.save_ppm(&path),
                FrameFormat::Png => fb.save_png(&path),
            };
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            if finished % 30 == 0 {
                println!("  Rendering frame {}/{}", finished, total_frames);
            }
            result
        })?;
        Ok(())
    }

    /// Get timeline
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Direct access to the last rendered frame
    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.frame_buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Language;
    use crate::storyboard::{palette, Layer, Metadata, Resolution, Scene, Shape};

    fn create_test_storyboard() -> Storyboard {
        Storyboard {
            metadata: Metadata {
                title: "Test".into(),
                resolution: Resolution::Dimensions {
                    width: 64,
                    height: 36,
                },
                fps: 10,
                duration: 2.0,
                language: Language::En,
                description: None,
            },
            scenes: vec![Scene {
                id: "only".into(),
                duration: 2.0,
                background: palette::BLACK,
                transition: None,
                layers: vec![Layer::new(
                    32.0,
                    18.0,
                    Shape::Rect {
                        width: 20.0,
                        height: 10.0,
                        corner_radius: 0.0,
                        fill: Some(palette::RED),
                        stroke: None,
                    },
                )],
            }],
        }
    }

    #[test]
    fn test_render_engine_creation() {
        let engine = RenderEngine::new(create_test_storyboard(), false);
        assert_eq!(engine.timeline().total_frames(), 20);
    }

    #[test]
    fn test_render_frame_draws_layer() {
        let mut engine = RenderEngine::new(create_test_storyboard(), false);
        engine.render_frame(0).unwrap();
        let center = engine.frame_buffer().get_pixel(32, 18).unwrap();
        assert_eq!(center, palette::RED.as_rgba());
        let corner = engine.frame_buffer().get_pixel(2, 2).unwrap();
        assert_eq!(corner, palette::BLACK.as_rgba());
    }

    #[test]
    fn test_render_writes_all_frames() {
        let mut engine = RenderEngine::new(create_test_storyboard(), false);
        let dir = tempfile::tempdir().unwrap();
        engine.render(dir.path(), FrameFormat::Ppm).unwrap();
        for frame in 0..20 {
            assert!(dir.path().join(format!("frame_{frame}.ppm")).exists());
        }
    }

    #[test]
    fn test_scene_fade_transition() {
        let mut storyboard = create_test_storyboard();
        storyboard.scenes[0].transition = Some(Transition::Fade { duration: 1.0 });
        let scene = &storyboard.scenes[0];
        assert_eq!(RenderEngine::scene_fade(scene, 0.0), 1.0);
        let late = RenderEngine::scene_fade(scene, 1.5);
        assert!((late - 0.5).abs() < 1e-5);
        assert_eq!(RenderEngine::scene_fade(scene, 2.0), 0.0);
    }

    #[test]
    fn test_frame_format_pattern() {
        assert_eq!(FrameFormat::Ppm.pattern(), "frame_%d.ppm");
        assert_eq!(FrameFormat::Png.extension(), "png");
    }

    #[test]
    fn test_gpu_request_does_not_panic() {
        // GPU may or may not exist where tests run; construction must
        // succeed either way via the CPU fallback.
        let engine = RenderEngine::new(create_test_storyboard(), true);
        assert_eq!(engine.timeline().total_frames(), 20);
    }
}
