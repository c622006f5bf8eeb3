pub mod compositor;
pub mod encoder;
pub mod engine;
pub mod frame_buffer;
pub mod gpu_context;
pub mod gpu_renderer;
pub mod manim;
pub mod timeline;

pub use compositor::Compositor;
pub use encoder::VideoEncoder;
pub use engine::{FrameFormat, RenderEngine};
pub use frame_buffer::FrameBuffer;
pub use gpu_context::GpuContext;
pub use gpu_renderer::GpuRenderer;
pub use manim::ManimRenderer;
pub use timeline::Timeline;
