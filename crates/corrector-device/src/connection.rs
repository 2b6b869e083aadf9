//! # Connection Settings
//!
//! How to reach the register, translated into the driver's single settings.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Medium      "Port"   Address setting      Extra                        │
//! │  ──────────  ──────   ───────────────────  ──────────────────────────── │
//! │  serial        0      ComFile              -                            │
//! │  usb           1      UsbDevicePath        -                            │
//! │  network       2      IPAddress            IPPort (required)            │
//! │  bluetooth     3      MACAddress           -                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, DeviceResult};

/// Single-setting key selecting the medium.
pub const SETTING_PORT: &str = "Port";
/// Single-setting key for the network port.
pub const SETTING_IP_PORT: &str = "IPPort";

// =============================================================================
// Medium
// =============================================================================

/// Physical link to the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMedium {
    Serial,
    #[default]
    Usb,
    Network,
    Bluetooth,
}

impl ConnectionMedium {
    /// Value written to the `Port` setting.
    pub const fn code(self) -> u8 {
        match self {
            ConnectionMedium::Serial => 0,
            ConnectionMedium::Usb => 1,
            ConnectionMedium::Network => 2,
            ConnectionMedium::Bluetooth => 3,
        }
    }

    /// Setting key that receives the address.
    pub const fn address_setting(self) -> &'static str {
        match self {
            ConnectionMedium::Serial => "ComFile",
            ConnectionMedium::Usb => "UsbDevicePath",
            ConnectionMedium::Network => "IPAddress",
            ConnectionMedium::Bluetooth => "MACAddress",
        }
    }
}

impl std::fmt::Display for ConnectionMedium {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionMedium::Serial => write!(f, "serial"),
            ConnectionMedium::Usb => write!(f, "usb"),
            ConnectionMedium::Network => write!(f, "network"),
            ConnectionMedium::Bluetooth => write!(f, "bluetooth"),
        }
    }
}

impl std::str::FromStr for ConnectionMedium {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serial" | "com" => Ok(ConnectionMedium::Serial),
            "usb" => Ok(ConnectionMedium::Usb),
            "network" | "tcp" | "tcp_ip" => Ok(ConnectionMedium::Network),
            "bluetooth" | "bt" => Ok(ConnectionMedium::Bluetooth),
            other => Err(DeviceError::UnsupportedMedium(other.to_string())),
        }
    }
}

// =============================================================================
// Connection
// =============================================================================

/// Where the register is and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FiscalConnection {
    pub medium: ConnectionMedium,

    /// COM file, USB device path, IP address or MAC address.
    pub address: String,

    /// Network only.
    #[serde(default)]
    pub port: Option<u16>,
}

impl FiscalConnection {
    pub fn new(medium: ConnectionMedium, address: impl Into<String>) -> Self {
        FiscalConnection {
            medium,
            address: address.into(),
            port: None,
        }
    }

    /// Network connection to `address:port`.
    pub fn network(address: impl Into<String>, port: u16) -> Self {
        FiscalConnection {
            medium: ConnectionMedium::Network,
            address: address.into(),
            port: Some(port),
        }
    }

    /// Driver single settings for this connection, in write order.
    pub fn single_settings(&self) -> DeviceResult<Vec<(&'static str, String)>> {
        let mut settings = vec![
            (SETTING_PORT, self.medium.code().to_string()),
            (self.medium.address_setting(), self.address.clone()),
        ];

        if self.medium == ConnectionMedium::Network {
            let port = self.port.ok_or_else(|| DeviceError::MissingPort {
                address: self.address.clone(),
            })?;
            settings.push((SETTING_IP_PORT, port.to_string()));
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medium_parsing() {
        assert_eq!("usb".parse::<ConnectionMedium>().unwrap(), ConnectionMedium::Usb);
        assert_eq!("COM".parse::<ConnectionMedium>().unwrap(), ConnectionMedium::Serial);
        assert_eq!(
            "tcp".parse::<ConnectionMedium>().unwrap(),
            ConnectionMedium::Network
        );
        assert_eq!(
            "rs485".parse::<ConnectionMedium>(),
            Err(DeviceError::UnsupportedMedium("rs485".into()))
        );
    }

    #[test]
    fn test_serial_settings() {
        let conn = FiscalConnection::new(ConnectionMedium::Serial, "/dev/ttyS0");
        let settings = conn.single_settings().unwrap();
        assert_eq!(
            settings,
            vec![("Port", "0".to_string()), ("ComFile", "/dev/ttyS0".to_string())]
        );
    }

    #[test]
    fn test_network_settings_include_port() {
        let conn = FiscalConnection::network("192.168.1.10", 5555);
        let settings = conn.single_settings().unwrap();
        assert_eq!(settings.len(), 3);
        assert_eq!(settings[0], ("Port", "2".to_string()));
        assert_eq!(settings[1], ("IPAddress", "192.168.1.10".to_string()));
        assert_eq!(settings[2], ("IPPort", "5555".to_string()));
    }

    #[test]
    fn test_network_without_port_fails() {
        let conn = FiscalConnection::new(ConnectionMedium::Network, "10.0.0.1");
        assert!(matches!(
            conn.single_settings(),
            Err(DeviceError::MissingPort { .. })
        ));
    }

    #[test]
    fn test_port_ignored_off_network() {
        let mut conn = FiscalConnection::new(ConnectionMedium::Bluetooth, "00:11:22:33:44:55");
        conn.port = Some(1);
        let settings = conn.single_settings().unwrap();
        assert_eq!(settings.len(), 2);
        assert_eq!(settings[1].0, "MACAddress");
    }
}
