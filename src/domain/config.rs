use crate::domain::error::{ComTunnelError, ComTunnelResult};
use serde::{Deserialize, Serialize};

/// Serial line configuration shared by every session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialLineConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`
    pub address: String,
    /// Baud rate
    #[serde(rename = "baudrate", default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Data bits, passed through to the device as-is
    #[serde(rename = "databits", default = "default_data_bits")]
    pub data_bits: u8,
    /// Stop bits, 1 or 2
    #[serde(rename = "stopbits", default = "default_stop_bits")]
    pub stop_bits: u8,
    /// Parity letter: N, E or O
    #[serde(default = "default_parity")]
    pub parity: String,
    /// Report CTS inverted to the peer
    #[serde(default)]
    pub invert_cts: bool,
    /// Report DCD inverted to the peer
    #[serde(default)]
    pub invert_dcd: bool,
}

// Default value functions
fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_parity() -> String {
    "N".to_string()
}

impl SerialLineConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: default_parity(),
            invert_cts: false,
            invert_dcd: false,
        }
    }

    /// Build the device mode, rejecting stop bits and parity the line cannot use
    pub fn to_mode(&self) -> ComTunnelResult<SerialMode> {
        let stop_bits = match self.stop_bits {
            1 => StopBits::One,
            2 => StopBits::Two,
            other => {
                return Err(ComTunnelError::config(format!(
                    "unsupported stop bits: {}",
                    other
                )))
            }
        };

        let parity = match self.parity.as_str() {
            "N" => Parity::None,
            "E" => Parity::Even,
            "O" => Parity::Odd,
            other => {
                return Err(ComTunnelError::config(format!(
                    "unsupported parity: {}",
                    other
                )))
            }
        };

        Ok(SerialMode {
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            stop_bits,
            parity,
        })
    }
}

/// Line settings handed to the serial opener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialMode {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: StopBits,
    pub parity: Parity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
        }
    }
}

impl std::fmt::Display for SerialMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
        };
        let stop_bits = match self.stop_bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        };
        write!(f, "{} {}{}{}", self.baud_rate, self.data_bits, parity, stop_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(stop_bits: u8, parity: &str) -> SerialLineConfig {
        SerialLineConfig {
            stop_bits,
            parity: parity.to_string(),
            ..SerialLineConfig::new("/dev/ttyUSB0")
        }
    }

    #[test]
    fn test_mode_one_stop_bit_no_parity() {
        let mode = line(1, "N").to_mode().unwrap();
        assert_eq!(mode.stop_bits, StopBits::One);
        assert_eq!(mode.parity, Parity::None);
        assert_eq!(mode.baud_rate, 9600);
        assert_eq!(mode.data_bits, 8);
    }

    #[test]
    fn test_mode_two_stop_bits_even_and_odd() {
        assert_eq!(line(2, "E").to_mode().unwrap().parity, Parity::Even);
        assert_eq!(line(2, "O").to_mode().unwrap().stop_bits, StopBits::Two);
    }

    #[test]
    fn test_mode_rejects_three_stop_bits() {
        let err = line(3, "N").to_mode().unwrap_err();
        assert!(matches!(err, ComTunnelError::Config { .. }));
        assert!(err.to_string().contains("stop bits"));
    }

    #[test]
    fn test_mode_rejects_unknown_parity() {
        let err = line(1, "X").to_mode().unwrap_err();
        assert!(matches!(err, ComTunnelError::Config { .. }));
        assert!(err.to_string().contains("parity"));
    }

    #[test]
    fn test_data_bits_and_baud_pass_through() {
        let config = SerialLineConfig {
            baud_rate: 12345,
            data_bits: 3,
            ..SerialLineConfig::new("COM3")
        };
        let mode = config.to_mode().unwrap();
        assert_eq!(mode.baud_rate, 12345);
        assert_eq!(mode.data_bits, 3);
    }

    #[test]
    fn test_config_from_yaml_uses_wire_keys() {
        let config: SerialLineConfig = serde_yaml::from_str(
            "address: /dev/ttyS1\nbaudrate: 115200\ndatabits: 7\nstopbits: 2\nparity: E\ninvert_cts: true\n",
        )
        .unwrap();

        assert_eq!(config.address, "/dev/ttyS1");
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.data_bits, 7);
        assert_eq!(config.stop_bits, 2);
        assert_eq!(config.parity, "E");
        assert!(config.invert_cts);
        assert!(!config.invert_dcd);
    }

    #[test]
    fn test_mode_display() {
        let mode = line(1, "N").to_mode().unwrap();
        assert_eq!(mode.to_string(), "9600 8N1");
    }
}
