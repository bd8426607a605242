// Core module - Frame codec and the forwarding engine
pub mod bridge;
pub mod packet;
