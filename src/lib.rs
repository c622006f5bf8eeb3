pub mod config;
pub mod i18n;
pub mod parser;
pub mod renderer;
pub mod report;
pub mod sim;
pub mod storyboard;

pub use config::AppConfig;
pub use i18n::Language;
pub use parser::StoryboardParser;
pub use renderer::{Compositor, FrameBuffer, FrameFormat, ManimRenderer, RenderEngine, Timeline};
pub use report::SimulationReport;
pub use sim::BoundedQueue;
pub use storyboard::{Storyboard, StoryboardKind};
