pub mod clock;
pub mod network;
pub mod pipeline;

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::i18n::Language;

/// Main storyboard structure that defines an entire video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storyboard {
    pub metadata: Metadata,
    pub scenes: Vec<Scene>,
}

/// Video metadata and configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub resolution: Resolution,
    pub fps: u32,
    pub duration: f32,
    pub language: Language,
    #[serde(default)]
    pub description: Option<String>,
}

/// Video resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Resolution {
    Named(String), // e.g., "1920x1080", "1280x720"
    Dimensions { width: u32, height: u32 },
}

impl Resolution {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::Named(s) => {
                let parts: Vec<&str> = s.split('x').collect();
                if parts.len() == 2 {
                    let width = parts[0].parse().unwrap_or(1920);
                    let height = parts[1].parse().unwrap_or(1080);
                    (width, height)
                } else {
                    (1920, 1080) // Default to 1080p
                }
            }
            Resolution::Dimensions { width, height } => (*width, *height),
        }
    }
}

/// One sequential segment of the video. Layer animation times are seconds
/// relative to the scene start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub duration: f32,
    pub background: Color,
    #[serde(default)]
    pub transition: Option<Transition>,
    pub layers: Vec<Layer>,
}

/// Transition out of a scene
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Cut,
    Fade { duration: f32 },
}

/// A drawable element positioned in the frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub position: Position,
    pub shape: Shape,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Seconds into the scene before which the layer is not drawn.
    #[serde(default)]
    pub visible_from: f32,
    #[serde(default)]
    pub animations: Vec<Animation>,
}

fn default_opacity() -> f32 {
    1.0
}

impl Layer {
    pub fn new(x: f32, y: f32, shape: Shape) -> Self {
        Self {
            position: Position { x, y },
            shape,
            opacity: 1.0,
            visible_from: 0.0,
            animations: Vec::new(),
        }
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Show the layer instantly at `start`.
    pub fn appear(mut self, start: f32) -> Self {
        self.visible_from = start;
        self
    }

    /// Fade the layer in from nothing starting at `start`.
    pub fn fade_in(mut self, start: f32, duration: f32) -> Self {
        self.visible_from = start;
        self.animations.push(Animation::FadeIn { start, duration });
        self
    }

    pub fn fade_out(mut self, start: f32, duration: f32) -> Self {
        self.animations.push(Animation::FadeOut { start, duration });
        self
    }

    pub fn animate(mut self, animation: Animation) -> Self {
        self.animations.push(animation);
        self
    }
}

/// Position in the frame, pixels from the top-left corner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Shapes the compositor knows how to draw. Center-positioned except for
/// lines and arrows, whose layer position is the start point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Rect {
        width: f32,
        height: f32,
        #[serde(default)]
        corner_radius: f32,
        #[serde(default)]
        fill: Option<Color>,
        #[serde(default)]
        stroke: Option<Stroke>,
    },
    Circle {
        radius: f32,
        #[serde(default)]
        fill: Option<Color>,
        #[serde(default)]
        stroke: Option<Stroke>,
    },
    /// A value packet: filled circle with a short label inside.
    Token {
        radius: f32,
        fill: Color,
        label: String,
        label_color: Color,
    },
    Line {
        end: Position,
        stroke: Stroke,
        /// Dash length in pixels; solid when absent.
        #[serde(default)]
        dash: Option<f32>,
    },
    Arrow {
        end: Position,
        stroke: Stroke,
    },
    Polyline {
        points: Vec<Position>,
        stroke: Stroke,
    },
    /// Full-frame background grid.
    Grid {
        spacing: f32,
        stroke: Stroke,
    },
    Text {
        content: String,
        size: f32,
        color: Color,
    },
}

/// Keyframed change applied to a layer. Times are seconds from scene start;
/// interpolating kinds ease with the smoothstep rate function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Animation {
    FadeIn {
        start: f32,
        duration: f32,
    },
    FadeOut {
        start: f32,
        duration: f32,
    },
    FadeTo {
        start: f32,
        duration: f32,
        opacity: f32,
    },
    MoveTo {
        start: f32,
        duration: f32,
        x: f32,
        y: f32,
    },
    MoveAlong {
        start: f32,
        duration: f32,
        points: Vec<Position>,
    },
    /// Scale up and back, the emphasis beat used on labels and nodes.
    Pulse {
        start: f32,
        duration: f32,
        scale: f32,
    },
}

impl Animation {
    pub fn start(&self) -> f32 {
        match self {
            Animation::FadeIn { start, .. }
            | Animation::FadeOut { start, .. }
            | Animation::FadeTo { start, .. }
            | Animation::MoveTo { start, .. }
            | Animation::MoveAlong { start, .. }
            | Animation::Pulse { start, .. } => *start,
        }
    }

    pub fn duration(&self) -> f32 {
        match self {
            Animation::FadeIn { duration, .. }
            | Animation::FadeOut { duration, .. }
            | Animation::FadeTo { duration, .. }
            | Animation::MoveTo { duration, .. }
            | Animation::MoveAlong { duration, .. }
            | Animation::Pulse { duration, .. } => *duration,
        }
    }

    pub fn end(&self) -> f32 {
        self.start() + self.duration()
    }
}

/// Color representation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "default_alpha")]
    pub a: u8,
}

fn default_alpha() -> u8 {
    255
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(mut self, a: u8) -> Self {
        self.a = a;
        self
    }

    pub fn as_rgba(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Outline style for stroked shapes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
}

impl Stroke {
    pub fn new(color: Color, width: f32) -> Self {
        Self { color, width }
    }
}

/// The palette the storyboards draw from.
pub mod palette {
    use super::Color;

    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const GRAY: Color = Color::rgb(0x88, 0x88, 0x88);
    pub const LIGHT_GRAY: Color = Color::rgb(0xbb, 0xbb, 0xbb);
    pub const DARK_GRAY: Color = Color::rgb(0x44, 0x44, 0x44);
    pub const BLUE: Color = Color::rgb(0x58, 0xc4, 0xdd);
    pub const BLUE_DEEP: Color = Color::rgb(0x23, 0x64, 0x8a);
    pub const GREEN: Color = Color::rgb(0x83, 0xc1, 0x67);
    pub const RED: Color = Color::rgb(0xfc, 0x62, 0x55);
    pub const YELLOW: Color = Color::rgb(0xff, 0xff, 0x00);
    pub const GOLD: Color = Color::rgb(0xf0, 0xac, 0x5f);
    pub const ORANGE: Color = Color::rgb(0xff, 0x86, 0x2f);
    pub const PURPLE: Color = Color::rgb(0x9a, 0x72, 0xac);
    /// Producer-consumer scene background.
    pub const CHARCOAL: Color = Color::rgb(0x1a, 0x1a, 0x1a);
    /// Network scene background.
    pub const NEAR_BLACK: Color = Color::rgb(0x0f, 0x0f, 0x0f);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
}

/// Maps center-origin unit coordinates (y up, frame 8 units tall — the
/// convention the source scripts lay out in) to pixel positions for a
/// concrete resolution.
pub(crate) struct Frame {
    pub w: f32,
    pub h: f32,
    pub unit: f32,
}

impl Frame {
    pub fn new(resolution: &Resolution) -> Self {
        let (w, h) = resolution.dimensions();
        let (w, h) = (w as f32, h as f32);
        Self { w, h, unit: h / 8.0 }
    }

    /// Pixel position for a point `dx` units right and `dy` units above
    /// frame center.
    pub fn at(&self, dx: f32, dy: f32) -> Position {
        Position::new(self.w / 2.0 + dx * self.unit, self.h / 2.0 - dy * self.unit)
    }

    /// Length in pixels for a length in units.
    pub fn px(&self, units: f32) -> f32 {
        units * self.unit
    }

    /// Font size in pixels for a 1080p-relative point size.
    pub fn font(&self, size: f32) -> f32 {
        size * self.h / 1080.0
    }
}

/// Which of the built-in animations to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoryboardKind {
    /// CPU clock signal walkthrough
    Clock,
    /// Single producer/consumer with a bounded buffer
    Pipeline,
    /// Multi-producer network with a buffer layer and garbage collector
    Network,
}

/// Build one of the built-in storyboards at the given output geometry.
pub fn build(
    kind: StoryboardKind,
    language: Language,
    seed: u64,
    resolution: Resolution,
    fps: u32,
) -> Storyboard {
    let mut rng = StdRng::seed_from_u64(seed);
    match kind {
        StoryboardKind::Clock => clock::build(language, resolution, fps),
        StoryboardKind::Pipeline => pipeline::build(language, resolution, fps, &mut rng),
        StoryboardKind::Network => network::build(language, resolution, fps, &mut rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_parsing() {
        let res = Resolution::Named("1920x1080".to_string());
        assert_eq!(res.dimensions(), (1920, 1080));

        let res = Resolution::Dimensions {
            width: 1280,
            height: 720,
        };
        assert_eq!(res.dimensions(), (1280, 720));
    }

    #[test]
    fn test_resolution_invalid_format() {
        let res = Resolution::Named("invalid".to_string());
        assert_eq!(res.dimensions(), (1920, 1080));

        let res = Resolution::Named("".to_string());
        assert_eq!(res.dimensions(), (1920, 1080));
    }

    #[test]
    fn test_layer_builder_fade_in_sets_visibility() {
        let layer = Layer::new(10.0, 20.0, Shape::Text {
            content: "hi".into(),
            size: 24.0,
            color: palette::WHITE,
        })
        .fade_in(1.5, 0.5);

        assert_eq!(layer.visible_from, 1.5);
        assert_eq!(
            layer.animations,
            vec![Animation::FadeIn {
                start: 1.5,
                duration: 0.5
            }]
        );
    }

    #[test]
    fn test_animation_window() {
        let anim = Animation::MoveTo {
            start: 2.0,
            duration: 0.6,
            x: 0.0,
            y: 0.0,
        };
        assert_eq!(anim.start(), 2.0);
        assert!((anim.end() - 2.6).abs() < 1e-6);
    }

    #[test]
    fn test_storyboard_serde_round_trip() {
        let board = Storyboard {
            metadata: Metadata {
                title: "Test".into(),
                resolution: Resolution::Named("640x360".into()),
                fps: 30,
                duration: 1.0,
                language: Language::En,
                description: None,
            },
            scenes: vec![Scene {
                id: "only".into(),
                duration: 1.0,
                background: palette::BLACK,
                transition: None,
                layers: vec![Layer::new(
                    320.0,
                    180.0,
                    Shape::Circle {
                        radius: 20.0,
                        fill: Some(palette::BLUE),
                        stroke: None,
                    },
                )],
            }],
        };

        let json = serde_json::to_string(&board).unwrap();
        let back: Storyboard = serde_json::from_str(&json).unwrap();
        assert_eq!(back.scenes.len(), 1);
        assert_eq!(back.metadata.fps, 30);
    }
}
