// Serial module - Device capability and its implementations
pub mod adapter;
pub mod hardware;
pub mod mock;

pub use adapter::{ModemStatus, SerialOpener, SerialPortAdapter};
pub use hardware::{HardwareOpener, HardwarePort};
pub use mock::{LineEvent, MockOpener, MockSerialPort};
