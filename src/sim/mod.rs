pub mod clock;
pub mod network;
pub mod pipeline;
pub mod queue;

pub use clock::{smooth, ClockSignal, Edge, Level};
pub use network::{NetworkTrace, PacketOutcome};
pub use pipeline::{PipelineEvent, PipelineTrace};
pub use queue::BoundedQueue;
