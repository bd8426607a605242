// Bridge module - Forwarding between one serial device and one network stream
pub mod flow;
pub mod scope;
pub mod session;
pub mod writer;

pub use flow::{ControlLines, FlowMapping};
pub use scope::SessionScope;
pub use session::{ConnectionBridge, SessionReport, STATUS_POLL_INTERVAL};
pub use writer::FrameWriter;
