use crate::sim::clock::smooth;
use crate::storyboard::{Animation, Layer, Storyboard};

/// Timeline for managing scene playback
pub struct Timeline {
    fps: u32,
    total_frames: u32,
    scenes: Vec<SceneSegment>,
}

#[derive(Debug, Clone)]
struct SceneSegment {
    scene_id: String,
    start_frame: u32,
    end_frame: u32,
    duration: f32,
}

impl Timeline {
    /// Create timeline from a storyboard
    pub fn from_storyboard(storyboard: &Storyboard) -> Self {
        let fps = storyboard.metadata.fps;

        let mut segments = Vec::new();
        let mut current_frame = 0;

        for scene in &storyboard.scenes {
            let scene_frames = (scene.duration * fps as f32) as u32;
            segments.push(SceneSegment {
                scene_id: scene.id.clone(),
                start_frame: current_frame,
                end_frame: current_frame + scene_frames,
                duration: scene.duration,
            });
            current_frame += scene_frames;
        }

        Self {
            fps,
            total_frames: current_frame,
            scenes: segments,
        }
    }

    /// Scene id active at the given frame number
    pub fn scene_id_at_frame(&self, frame: u32) -> Option<&str> {
        self.scenes
            .iter()
            .find(|s| frame >= s.start_frame && frame < s.end_frame)
            .map(|s| s.scene_id.as_str())
    }

    /// Scene index and scene-local time in seconds for the given frame
    pub fn scene_at_frame(&self, frame: u32) -> Option<(usize, f32)> {
        self.scenes
            .iter()
            .enumerate()
            .find(|(_, s)| frame >= s.start_frame && frame < s.end_frame)
            .map(|(idx, s)| (idx, (frame - s.start_frame) as f32 / self.fps as f32))
    }

    /// Seconds left in the scene that is active at the given frame
    pub fn scene_time_remaining(&self, frame: u32) -> Option<f32> {
        self.scenes
            .iter()
            .find(|s| frame >= s.start_frame && frame < s.end_frame)
            .map(|s| s.duration - (frame - s.start_frame) as f32 / self.fps as f32)
    }

    /// Get total frame count
    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    /// Get FPS
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Convert frame number to time in seconds
    pub fn frame_to_time(&self, frame: u32) -> f32 {
        frame as f32 / self.fps as f32
    }
}

/// A layer's resolved draw parameters at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerState {
    pub x: f32,
    pub y: f32,
    pub opacity: f32,
    pub scale: f32,
}

fn progress(t: f32, start: f32, duration: f32) -> f32 {
    if duration <= f32::EPSILON {
        if t >= start {
            1.0
        } else {
            0.0
        }
    } else {
        ((t - start) / duration).clamp(0.0, 1.0)
    }
}

/// Up-and-back ease used by pulse animations.
fn there_and_back(t: f32) -> f32 {
    if t < 0.5 {
        smooth(t * 2.0)
    } else {
        smooth(2.0 - t * 2.0)
    }
}

/// Resolve a layer's position, opacity and scale at scene-local time `t` by
/// folding its animations in chronological order. Interpolating kinds ease
/// with smoothstep; path following is linear like the traced sweeps in the
/// source scenes.
pub fn layer_state_at(layer: &Layer, t: f32) -> LayerState {
    let mut state = LayerState {
        x: layer.position.x,
        y: layer.position.y,
        opacity: layer.opacity,
        scale: 1.0,
    };

    if t < layer.visible_from {
        state.opacity = 0.0;
        return state;
    }

    let mut order: Vec<&Animation> = layer.animations.iter().collect();
    order.sort_by(|a, b| a.start().partial_cmp(&b.start()).unwrap_or(std::cmp::Ordering::Equal));

    for anim in order {
        let p = progress(t, anim.start(), anim.duration());
        match anim {
            Animation::FadeIn { start, .. } => {
                if t <= *start {
                    state.opacity = 0.0;
                } else if p < 1.0 {
                    state.opacity *= smooth(p);
                }
            }
            Animation::FadeOut { .. } => {
                if p >= 1.0 {
                    state.opacity = 0.0;
                } else if p > 0.0 {
                    state.opacity *= 1.0 - smooth(p);
                }
            }
            Animation::FadeTo { opacity, .. } => {
                if p >= 1.0 {
                    state.opacity = *opacity;
                } else if p > 0.0 {
                    state.opacity += (*opacity - state.opacity) * smooth(p);
                }
            }
            Animation::MoveTo { x, y, .. } => {
                if p >= 1.0 {
                    state.x = *x;
                    state.y = *y;
                } else if p > 0.0 {
                    let eased = smooth(p);
                    state.x += (*x - state.x) * eased;
                    state.y += (*y - state.y) * eased;
                }
            }
            Animation::MoveAlong { points, .. } => {
                if p > 0.0 && !points.is_empty() {
                    if points.len() == 1 {
                        state.x = points[0].x;
                        state.y = points[0].y;
                    } else {
                        let s = p * (points.len() - 1) as f32;
                        let i = (s.floor() as usize).min(points.len() - 2);
                        let frac = s - i as f32;
                        state.x = points[i].x + (points[i + 1].x - points[i].x) * frac;
                        state.y = points[i].y + (points[i + 1].y - points[i].y) * frac;
                    }
                }
            }
            Animation::Pulse { scale, .. } => {
                if p > 0.0 && p < 1.0 {
                    state.scale *= 1.0 + (scale - 1.0) * there_and_back(p);
                }
            }
        }
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Language;
    use crate::storyboard::{
        palette, Layer, Metadata, Position, Resolution, Scene, Shape, Storyboard,
    };

    fn create_test_storyboard() -> Storyboard {
        let layer = |id: &str| Layer::new(
            0.0,
            0.0,
            Shape::Text {
                content: id.into(),
                size: 16.0,
                color: palette::WHITE,
            },
        );
        Storyboard {
            metadata: Metadata {
                title: "Test".into(),
                resolution: Resolution::Named("1920x1080".into()),
                fps: 30,
                duration: 10.0,
                language: Language::En,
                description: None,
            },
            scenes: vec![
                Scene {
                    id: "scene1".into(),
                    duration: 5.0,
                    background: palette::BLACK,
                    transition: None,
                    layers: vec![layer("a")],
                },
                Scene {
                    id: "scene2".into(),
                    duration: 5.0,
                    background: palette::BLACK,
                    transition: None,
                    layers: vec![layer("b")],
                },
            ],
        }
    }

    #[test]
    fn test_timeline_creation() {
        let timeline = Timeline::from_storyboard(&create_test_storyboard());
        assert_eq!(timeline.fps(), 30);
        assert_eq!(timeline.total_frames(), 300); // 10 seconds at 30fps
    }

    #[test]
    fn test_scene_at_frame() {
        let timeline = Timeline::from_storyboard(&create_test_storyboard());

        // First scene: 0-150 frames (5 seconds)
        assert_eq!(timeline.scene_id_at_frame(0), Some("scene1"));
        assert_eq!(timeline.scene_id_at_frame(100), Some("scene1"));

        // Second scene: 150-300 frames
        assert_eq!(timeline.scene_id_at_frame(150), Some("scene2"));
        assert_eq!(timeline.scene_id_at_frame(200), Some("scene2"));

        // Local time resets at the scene boundary
        let (idx, local) = timeline.scene_at_frame(180).unwrap();
        assert_eq!(idx, 1);
        assert!((local - 1.0).abs() < 1e-5);

        assert_eq!(timeline.scene_at_frame(300), None);
    }

    #[test]
    fn test_fade_in_ramp() {
        let layer = Layer::new(
            0.0,
            0.0,
            Shape::Circle {
                radius: 5.0,
                fill: Some(palette::BLUE),
                stroke: None,
            },
        )
        .fade_in(1.0, 1.0);

        assert_eq!(layer_state_at(&layer, 0.5).opacity, 0.0);
        let mid = layer_state_at(&layer, 1.5).opacity;
        assert!((mid - 0.5).abs() < 1e-5);
        assert_eq!(layer_state_at(&layer, 3.0).opacity, 1.0);
    }

    #[test]
    fn test_fade_out_completes_to_zero() {
        let layer = Layer::new(
            0.0,
            0.0,
            Shape::Circle {
                radius: 5.0,
                fill: Some(palette::BLUE),
                stroke: None,
            },
        )
        .fade_out(2.0, 0.5);

        assert_eq!(layer_state_at(&layer, 1.0).opacity, 1.0);
        assert_eq!(layer_state_at(&layer, 3.0).opacity, 0.0);
        let mid = layer_state_at(&layer, 2.25).opacity;
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn test_move_to_eases_between_endpoints() {
        let layer = Layer::new(
            10.0,
            10.0,
            Shape::Circle {
                radius: 5.0,
                fill: Some(palette::BLUE),
                stroke: None,
            },
        )
        .animate(Animation::MoveTo {
            start: 0.0,
            duration: 2.0,
            x: 110.0,
            y: 10.0,
        });

        assert_eq!(layer_state_at(&layer, 0.0).x, 10.0);
        let mid = layer_state_at(&layer, 1.0);
        assert!((mid.x - 60.0).abs() < 1e-3); // smoothstep(0.5) == 0.5
        assert_eq!(layer_state_at(&layer, 5.0).x, 110.0);
    }

    #[test]
    fn test_sequential_moves_chain() {
        let layer = Layer::new(
            0.0,
            0.0,
            Shape::Circle {
                radius: 5.0,
                fill: Some(palette::BLUE),
                stroke: None,
            },
        )
        .animate(Animation::MoveTo {
            start: 0.0,
            duration: 1.0,
            x: 100.0,
            y: 0.0,
        })
        .animate(Animation::MoveTo {
            start: 2.0,
            duration: 1.0,
            x: 100.0,
            y: 100.0,
        });

        let between = layer_state_at(&layer, 1.5);
        assert_eq!((between.x, between.y), (100.0, 0.0));
        let done = layer_state_at(&layer, 4.0);
        assert_eq!((done.x, done.y), (100.0, 100.0));
    }

    #[test]
    fn test_move_along_path() {
        let layer = Layer::new(
            0.0,
            0.0,
            Shape::Circle {
                radius: 5.0,
                fill: Some(palette::BLUE),
                stroke: None,
            },
        )
        .animate(Animation::MoveAlong {
            start: 0.0,
            duration: 4.0,
            points: vec![
                Position::new(0.0, 0.0),
                Position::new(100.0, 0.0),
                Position::new(100.0, 100.0),
            ],
        });

        let quarter = layer_state_at(&layer, 1.0);
        assert!((quarter.x - 50.0).abs() < 1e-3);
        assert!((quarter.y - 0.0).abs() < 1e-3);
        let end = layer_state_at(&layer, 4.0);
        assert_eq!((end.x, end.y), (100.0, 100.0));
    }

    #[test]
    fn test_pulse_returns_to_unit_scale() {
        let layer = Layer::new(
            0.0,
            0.0,
            Shape::Circle {
                radius: 5.0,
                fill: Some(palette::BLUE),
                stroke: None,
            },
        )
        .animate(Animation::Pulse {
            start: 0.0,
            duration: 1.0,
            scale: 2.0,
        });

        assert_eq!(layer_state_at(&layer, 0.0).scale, 1.0);
        let peak = layer_state_at(&layer, 0.5).scale;
        assert!((peak - 2.0).abs() < 1e-3);
        assert_eq!(layer_state_at(&layer, 1.5).scale, 1.0);
    }

    #[test]
    fn test_visible_from_hides_layer() {
        let layer = Layer::new(
            0.0,
            0.0,
            Shape::Circle {
                radius: 5.0,
                fill: Some(palette::BLUE),
                stroke: None,
            },
        )
        .appear(2.0);

        assert_eq!(layer_state_at(&layer, 1.9).opacity, 0.0);
        assert_eq!(layer_state_at(&layer, 2.0).opacity, 1.0);
    }
}
