//! Mapping between modem status lines and the flow-control byte.

use crate::domain::config::SerialLineConfig;
use crate::infrastructure::serial::ModemStatus;

pub const FLOW_CTS: u8 = 0x01;
pub const FLOW_DSR: u8 = 0x02;
pub const FLOW_DCD: u8 = 0x04;
pub const FLOW_RI: u8 = 0x08;

/// Polarity applied to the reported lines. Only CTS and DCD can be inverted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowMapping {
    pub invert_cts: bool,
    pub invert_dcd: bool,
}

impl FlowMapping {
    pub fn from_config(config: &SerialLineConfig) -> Self {
        Self {
            invert_cts: config.invert_cts,
            invert_dcd: config.invert_dcd,
        }
    }

    pub fn encode(&self, status: ModemStatus) -> u8 {
        let mut mask = 0;
        if status.cts != self.invert_cts {
            mask |= FLOW_CTS;
        }
        if status.dsr {
            mask |= FLOW_DSR;
        }
        if status.dcd != self.invert_dcd {
            mask |= FLOW_DCD;
        }
        if status.ri {
            mask |= FLOW_RI;
        }
        mask
    }

    /// Recover the device lines from a byte produced by [`FlowMapping::encode`]
    pub fn decode(&self, mask: u8) -> ModemStatus {
        ModemStatus {
            cts: (mask & FLOW_CTS != 0) != self.invert_cts,
            dsr: mask & FLOW_DSR != 0,
            dcd: (mask & FLOW_DCD != 0) != self.invert_dcd,
            ri: mask & FLOW_RI != 0,
        }
    }
}

/// Output lines to drive after receiving a flow byte from the peer.
///
/// The peer's DCD drives our DTR and its CTS drives our RTS, which is the
/// null-modem crossing of the two handshake pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlLines {
    pub dtr: bool,
    pub rts: bool,
}

impl ControlLines {
    pub fn from_flow_byte(mask: u8) -> Self {
        Self {
            dtr: mask & FLOW_DCD != 0,
            rts: mask & FLOW_CTS != 0,
        }
    }
}
