use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use sysinfo::System;

use crate::renderer::VideoEncoder;
use crate::storyboard::{Animation, Layer, Shape, Storyboard};

/// Renders a storyboard by delegating to an external manim process: the
/// storyboard is compiled into a Python script with one Scene class per
/// storyboard scene, scenes render as separate jobs, and the clips are
/// concatenated into the final video.
pub struct ManimRenderer {
    storyboard: Storyboard,
    output_dir: PathBuf,
    cache_dir: PathBuf,
    parallel_jobs: usize,
}

impl ManimRenderer {
    pub fn new(storyboard: Storyboard, output_dir: PathBuf) -> Self {
        let cache_dir = PathBuf::from(".cache/manim");
        let parallel_jobs = std::cmp::min(num_cpus::get(), 2).max(1);
        Self {
            storyboard,
            output_dir,
            cache_dir,
            parallel_jobs,
        }
    }

    /// Check if the manim CLI is available
    pub fn is_available() -> bool {
        Command::new("manim").arg("--version").output().is_ok()
    }

    fn class_name(index: usize) -> String {
        format!("Board{:02}", index)
    }

    fn py_str(text: &str) -> String {
        format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
    }

    fn py_color(color: &crate::storyboard::Color) -> String {
        format!("'#{:02x}{:02x}{:02x}'", color.r, color.g, color.b)
    }

    /// Pixel position -> manim scene coordinates (center origin, y up,
    /// frame 8 units tall).
    fn coords(&self, x: f32, y: f32) -> (f32, f32) {
        let (w, h) = self.storyboard.metadata.resolution.dimensions();
        let unit = h as f32 / 8.0;
        ((x - w as f32 / 2.0) / unit, (h as f32 / 2.0 - y) / unit)
    }

    fn px_to_units(&self, px: f32) -> f32 {
        let (_, h) = self.storyboard.metadata.resolution.dimensions();
        px / (h as f32 / 8.0)
    }

    /// Mobject constructor expression for a layer.
    fn mobject_expr(&self, layer: &Layer) -> String {
        let (mx, my) = self.coords(layer.position.x, layer.position.y);
        let place = format!(".move_to([{:.3}, {:.3}, 0])", mx, my);

        let expr = match &layer.shape {
            Shape::Rect {
                width,
                height,
                corner_radius,
                fill,
                stroke,
            } => {
                let mut e = format!(
                    "RoundedRectangle(corner_radius={:.3}, width={:.3}, height={:.3})",
                    self.px_to_units(*corner_radius).max(0.001),
                    self.px_to_units(*width),
                    self.px_to_units(*height),
                );
                if let Some(fill) = fill {
                    e.push_str(&format!(
                        ".set_fill({}, opacity={:.3})",
                        Self::py_color(fill),
                        fill.a as f32 / 255.0
                    ));
                }
                match stroke {
                    Some(s) => e.push_str(&format!(
                        ".set_stroke({}, width={:.1})",
                        Self::py_color(&s.color),
                        s.width
                    )),
                    None => e.push_str(".set_stroke(width=0)"),
                }
                e + &place
            }
            Shape::Circle {
                radius,
                fill,
                stroke,
            } => {
                let mut e = format!("Circle(radius={:.3})", self.px_to_units(*radius));
                if let Some(fill) = fill {
                    e.push_str(&format!(
                        ".set_fill({}, opacity={:.3})",
                        Self::py_color(fill),
                        fill.a as f32 / 255.0
                    ));
                }
                match stroke {
                    Some(s) => e.push_str(&format!(
                        ".set_stroke({}, width={:.1})",
                        Self::py_color(&s.color),
                        s.width
                    )),
                    None => e.push_str(".set_stroke(width=0)"),
                }
                e + &place
            }
            Shape::Token {
                radius,
                fill,
                label,
                label_color,
            } => {
                let r = self.px_to_units(*radius);
                format!(
                    "VGroup(Circle(radius={:.3}).set_fill({}, opacity=0.9).set_stroke(width=2), Text({}, font_size={:.0}, color={})){}",
                    r,
                    Self::py_color(fill),
                    Self::py_str(label),
                    (r * 72.0).max(12.0),
                    Self::py_color(label_color),
                    place
                )
            }
            Shape::Line { end, stroke, dash } => {
                let (ex, ey) = self.coords(end.x, end.y);
                let ctor = if dash.is_some() { "DashedLine" } else { "Line" };
                format!(
                    "{}([{:.3}, {:.3}, 0], [{:.3}, {:.3}, 0], stroke_width={:.1}).set_color({})",
                    ctor,
                    mx,
                    my,
                    ex,
                    ey,
                    stroke.width,
                    Self::py_color(&stroke.color)
                )
            }
            Shape::Arrow { end, stroke } => {
                let (ex, ey) = self.coords(end.x, end.y);
                format!(
                    "Arrow([{:.3}, {:.3}, 0], [{:.3}, {:.3}, 0], buff=0, stroke_width={:.1}).set_color({})",
                    mx, my, ex, ey, stroke.width,
                    Self::py_color(&stroke.color)
                )
            }
            Shape::Polyline { points, stroke } => {
                let pts: Vec<String> = points
                    .iter()
                    .map(|p| {
                        let (px, py) = self.coords(p.x, p.y);
                        format!("[{:.3}, {:.3}, 0]", px, py)
                    })
                    .collect();
                format!(
                    "VMobject().set_points_as_corners([{}]).set_stroke({}, width={:.1})",
                    pts.join(", "),
                    Self::py_color(&stroke.color),
                    stroke.width
                )
            }
            Shape::Grid { stroke, .. } => format!(
                "NumberPlane(background_line_style={{'stroke_color': {}, 'stroke_width': {:.1}, 'stroke_opacity': {:.2}}})",
                Self::py_color(&stroke.color),
                stroke.width,
                layer.opacity
            ),
            Shape::Text {
                content,
                size,
                color,
            } => {
                let (_, h) = self.storyboard.metadata.resolution.dimensions();
                let font_size = size * 1080.0 / h as f32;
                format!(
                    "Text({}, font_size={:.0}, color={}){}",
                    Self::py_str(content),
                    font_size,
                    Self::py_color(color),
                    place
                )
            }
        };
        expr
    }

    fn animation_expr(&self, var: &str, animation: &Animation) -> String {
        match animation {
            Animation::FadeIn { .. } => format!("FadeIn({var})"),
            Animation::FadeOut { .. } => format!("FadeOut({var})"),
            Animation::FadeTo { opacity, .. } => {
                format!("{var}.animate.set_opacity({opacity:.3})")
            }
            Animation::MoveTo { x, y, .. } => {
                let (mx, my) = self.coords(*x, *y);
                format!("{var}.animate.move_to([{mx:.3}, {my:.3}, 0])")
            }
            Animation::MoveAlong { points, .. } => {
                let pts: Vec<String> = points
                    .iter()
                    .map(|p| {
                        let (px, py) = self.coords(p.x, p.y);
                        format!("[{px:.3}, {py:.3}, 0]")
                    })
                    .collect();
                format!(
                    "MoveAlongPath({var}, VMobject().set_points_as_corners([{}]), rate_func=linear)",
                    pts.join(", ")
                )
            }
            Animation::Pulse { scale, .. } => {
                format!("{var}.animate(rate_func=there_and_back).scale({scale:.3})")
            }
        }
    }

    /// Generate the Python script for manim
    pub fn generate_python_script(&self) -> String {
        let mut py = String::new();
        py.push_str("from manim import *\n\n");

        let (width, height) = self.storyboard.metadata.resolution.dimensions();
        py.push_str(&format!("config.pixel_width = {}\n", width));
        py.push_str(&format!("config.pixel_height = {}\n", height));
        py.push_str(&format!(
            "config.frame_rate = {}\n\n",
            self.storyboard.metadata.fps
        ));

        for (scene_idx, scene) in self.storyboard.scenes.iter().enumerate() {
            py.push_str(&format!(
                "\nclass {}(Scene):\n",
                Self::class_name(scene_idx)
            ));
            py.push_str("    def construct(self):\n");
            py.push_str(&format!(
                "        self.camera.background_color = {}\n",
                Self::py_color(&scene.background)
            ));

            // Mobjects
            let mut vars = Vec::new();
            for (layer_idx, layer) in scene.layers.iter().enumerate() {
                let expr = self.mobject_expr(layer);
                let var = format!("m{}", layer_idx);
                py.push_str(&format!("        {} = {}\n", var, expr));
                if layer.visible_from <= 0.0 && layer.opacity > 0.0 {
                    if (layer.opacity - 1.0).abs() > f32::EPSILON {
                        py.push_str(&format!(
                            "        {}.set_opacity({:.3})\n",
                            var, layer.opacity
                        ));
                    }
                    // Layers that fade in are added by their FadeIn play
                    let fades_in = layer
                        .animations
                        .iter()
                        .any(|a| matches!(a, Animation::FadeIn { .. }));
                    if !fades_in {
                        py.push_str(&format!("        self.add({})\n", var));
                    }
                }
                vars.push(var);
            }

            // Timed plays: group animation windows by start time
            let mut events: Vec<(f32, f32, String)> = Vec::new();
            for (layer_idx, layer) in scene.layers.iter().enumerate() {
                let var = &vars[layer_idx];
                // Instant appearances become zero-length add events
                if layer.visible_from > 0.0 {
                    let fades_in = layer
                        .animations
                        .iter()
                        .any(|a| matches!(a, Animation::FadeIn { .. }));
                    if !fades_in {
                        events.push((layer.visible_from, 0.0, format!("FadeIn({var})")));
                    }
                }
                for animation in &layer.animations {
                    events.push((
                        animation.start(),
                        animation.duration(),
                        self.animation_expr(var, animation),
                    ));
                }
            }
            events.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let mut cursor = 0.0f32;
            let mut i = 0;
            while i < events.len() {
                let start = events[i].0;
                let mut group = Vec::new();
                let mut run_time: f32 = 0.0;
                while i < events.len() && (events[i].0 - start).abs() < 0.01 {
                    group.push(events[i].2.clone());
                    run_time = run_time.max(events[i].1);
                    i += 1;
                }
                if start - cursor > 0.01 {
                    py.push_str(&format!("        self.wait({:.2})\n", start - cursor));
                }
                let run_time = run_time.max(0.05);
                py.push_str(&format!(
                    "        self.play({}, run_time={:.2})\n",
                    group.join(", "),
                    run_time
                ));
                cursor = start + run_time;
            }
            if scene.duration - cursor > 0.01 {
                py.push_str(&format!(
                    "        self.wait({:.2})\n",
                    scene.duration - cursor
                ));
            }
        }

        py
    }

    /// Calculate hash of the generated script
    fn calculate_hash(&self, python_script: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(python_script);
        format!("{:x}", hasher.finalize())
    }

    /// Find a rendered clip under the media directory by class name.
    fn find_clip(media_dir: &Path, class_name: &str) -> Option<PathBuf> {
        let target = format!("{}.mp4", class_name);
        let mut stack = vec![media_dir.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if path.file_name().is_some_and(|n| n.to_string_lossy() == target) {
                    return Some(path);
                }
            }
        }
        None
    }

    /// Render the video using manim
    pub fn render(&self) -> Result<PathBuf> {
        if !Self::is_available() {
            anyhow::bail!("manim not found. Install it to use the external renderer backend.");
        }

        fs::create_dir_all(&self.cache_dir)?;
        fs::create_dir_all(&self.output_dir)?;

        let python_script = self.generate_python_script();
        let script_hash = self.calculate_hash(&python_script);

        let script_file = self.cache_dir.join(format!("{}.py", script_hash));
        let hash_file = self.cache_dir.join("last_render.sha256");
        let media_dir = self.cache_dir.join("media");
        let output_video = self.output_dir.join("output.mp4");

        // Check cache
        if output_video.exists() && hash_file.exists() {
            let last_hash = fs::read_to_string(&hash_file).unwrap_or_default();
            if last_hash.trim() == script_hash {
                println!("✨ Cache hit! Skipping manim rendering.");
                return Ok(output_video);
            }
        }

        println!("🎨 Starting manim rendering...");
        fs::write(&script_file, &python_script)?;

        let scene_count = self.storyboard.scenes.len();
        println!(
            "🚀 Launching up to {} parallel manim jobs for {} scenes...",
            self.parallel_jobs, scene_count
        );

        let completed_scenes = Arc::new(Mutex::new(0usize));
        let start_time = Instant::now();

        // Safety Vault: Memory Monitor
        let _monitor_handle = thread::spawn(|| {
            let mut sys = System::new_all();
            loop {
                sys.refresh_memory();
                let used_memory = sys.used_memory();
                let total_memory = sys.total_memory();
                let usage_percent = (used_memory as f64 / total_memory as f64) * 100.0;

                if usage_percent > 99.0 {
                    eprintln!(
                        "🚨 CRITICAL: Memory usage at {:.1}%! Killing process to prevent crash.",
                        usage_percent
                    );
                    std::process::exit(1);
                }

                thread::sleep(Duration::from_secs(1));
            }
        });

        let mut success = true;
        for batch in (0..scene_count).collect::<Vec<_>>().chunks(self.parallel_jobs) {
            let mut handles = Vec::new();
            for &scene_idx in batch {
                let script_file = script_file.clone();
                let media_dir = media_dir.clone();
                let completed = Arc::clone(&completed_scenes);
                let class_name = Self::class_name(scene_idx);

                let handle = thread::spawn(move || -> Result<()> {
                    let mut child = Command::new("manim")
                        .arg("render")
                        .arg("--media_dir")
                        .arg(&media_dir)
                        .arg(&script_file)
                        .arg(&class_name)
                        .stdout(Stdio::piped())
                        .stderr(Stdio::piped())
                        .spawn()
                        .context("Failed to spawn manim process")?;

                    // Monitor progress
                    if let Some(stdout) = child.stdout.take() {
                        let reader = BufReader::new(stdout);
                        for line in reader.lines().map_while(Result::ok) {
                            if line.contains("File ready") || line.contains("Rendered") {
                                let mut count = completed.lock().unwrap();
                                *count += 1;
                            }
                        }
                    }

                    let status = child.wait()?;
                    if !status.success() {
                        anyhow::bail!("manim job for {} failed", class_name);
                    }
                    Ok(())
                });
                handles.push(handle);
            }

            for handle in handles {
                if let Err(e) = handle.join().unwrap() {
                    println!("❌ Job failed: {}", e);
                    success = false;
                }
            }
        }

        if !success {
            anyhow::bail!("One or more manim jobs failed");
        }

        // Stitch the per-scene clips together, in storyboard order
        let mut clips = Vec::new();
        for scene_idx in 0..scene_count {
            let class_name = Self::class_name(scene_idx);
            let clip = Self::find_clip(&media_dir, &class_name)
                .with_context(|| format!("Rendered clip not found for {}", class_name))?;
            clips.push(clip);
        }
        VideoEncoder::concat(&clips, &output_video)?;

        fs::write(&hash_file, &script_hash)?;
        let duration = start_time.elapsed();
        println!(
            "✅ manim rendering complete in {:.2}s",
            duration.as_secs_f32()
        );

        Ok(output_video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Language;
    use crate::storyboard::{self, Resolution, StoryboardKind};

    fn test_renderer() -> ManimRenderer {
        let board = storyboard::build(
            StoryboardKind::Pipeline,
            Language::En,
            7,
            Resolution::Named("1920x1080".into()),
            30,
        );
        ManimRenderer::new(board, PathBuf::from("output"))
    }

    #[test]
    fn test_generate_python_script() {
        let renderer = test_renderer();
        let py = renderer.generate_python_script();

        assert!(py.contains("from manim import *"));
        assert!(py.contains("config.pixel_width = 1920"));
        assert!(py.contains("config.pixel_height = 1080"));
        assert!(py.contains("class Board00(Scene):"));
        assert!(py.contains("def construct(self):"));
        assert!(py.contains("self.play("));
    }

    #[test]
    fn test_script_has_one_class_per_scene() {
        let renderer = test_renderer();
        let py = renderer.generate_python_script();
        let classes = py.matches("(Scene):").count();
        assert_eq!(classes, renderer.storyboard.scenes.len());
    }

    #[test]
    fn test_python_string_escaping() {
        assert_eq!(ManimRenderer::py_str("it's"), "'it\\'s'");
        assert_eq!(ManimRenderer::py_str("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn test_coords_round_trip() {
        let renderer = test_renderer();
        // Frame center maps to the origin
        let (x, y) = renderer.coords(960.0, 540.0);
        assert!(x.abs() < 1e-4 && y.abs() < 1e-4);
        // A point one unit right of center
        let (x, y) = renderer.coords(960.0 + 135.0, 540.0);
        assert!((x - 1.0).abs() < 1e-3 && y.abs() < 1e-4);
    }

    #[test]
    fn test_hash_is_stable() {
        let renderer = test_renderer();
        let py = renderer.generate_python_script();
        assert_eq!(renderer.calculate_hash(&py), renderer.calculate_hash(&py));
    }
}
