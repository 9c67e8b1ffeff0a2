use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::probe::DebugProbeInfo;

/// Describes which CMSIS-DAP probe to open.
///
/// Parsed from a string in the format `VID:PID[:SERIAL]`, with VID and PID
/// given as hexadecimal numbers. When a serial number is given, only a probe
/// reporting exactly that serial number matches; otherwise the first probe
/// with the right VID and PID is used.
///
/// ## Example:
///
/// ```
/// let selector: cmsis_swd::ProbeSelector = "0d28:0204:0240000034544e45".parse().unwrap();
///
/// assert_eq!(selector.vendor_id, 0x0d28);
/// assert_eq!(selector.product_id, 0x0204);
/// assert_eq!(selector.serial_number.as_deref(), Some("0240000034544e45"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeSelector {
    /// The USB vendor id of the debug probe to be used.
    pub vendor_id: u16,
    /// The USB product id of the debug probe to be used.
    pub product_id: u16,
    /// The serial number of the debug probe to be used.
    pub serial_number: Option<String>,
}

impl ProbeSelector {
    /// Check if the given probe info matches this selector.
    pub fn matches_probe(&self, info: &DebugProbeInfo) -> bool {
        self.match_probe_selector(
            info.vendor_id,
            info.product_id,
            info.serial_number.as_deref(),
        )
    }

    pub(crate) fn matches_hid(&self, info: &hidapi::DeviceInfo) -> bool {
        self.match_probe_selector(info.vendor_id(), info.product_id(), info.serial_number())
    }

    fn match_probe_selector(
        &self,
        vendor_id: u16,
        product_id: u16,
        serial_number: Option<&str>,
    ) -> bool {
        tracing::trace!(
            "Matching probe selector: {vendor_id:04x}:{product_id:04x} {serial_number:?} against {}",
            self
        );

        vendor_id == self.vendor_id
            && product_id == self.product_id
            && self
                .serial_number
                .as_ref()
                .map(|s| serial_number == Some(s.as_str()))
                .unwrap_or(true)
    }
}

impl std::str::FromStr for ProbeSelector {
    type Err = ProbeSelectorParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Serial numbers may contain colons themselves.
        let mut split = s.splitn(3, ':');

        let vendor_id = split.next().unwrap_or_default();
        let product_id = split.next().ok_or(ProbeSelectorParseError::Format)?;
        let serial_number = split
            .next()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        Ok(ProbeSelector {
            vendor_id: u16::from_str_radix(vendor_id, 16)?,
            product_id: u16::from_str_radix(product_id, 16)?,
            serial_number,
        })
    }
}

impl From<&DebugProbeInfo> for ProbeSelector {
    fn from(info: &DebugProbeInfo) -> Self {
        ProbeSelector {
            vendor_id: info.vendor_id,
            product_id: info.product_id,
            serial_number: info.serial_number.clone(),
        }
    }
}

impl fmt::Display for ProbeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)?;
        if let Some(ref sn) = self.serial_number {
            write!(f, ":{sn}")?;
        }
        Ok(())
    }
}

impl Serialize for ProbeSelector {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'a> Deserialize<'a> for ProbeSelector {
    fn deserialize<D>(deserializer: D) -> Result<ProbeSelector, D::Error>
    where
        D: Deserializer<'a>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An error which can occur while parsing a [`ProbeSelector`].
#[derive(thiserror::Error, Debug, docsplay::Display)]
pub enum ProbeSelectorParseError {
    /// Could not parse VID or PID: {0}
    ParseInt(#[from] std::num::ParseIntError),

    /// The format of the selector is invalid. Please use a string in the form `VID:PID:<Serial>`, where Serial is optional.
    Format,
}
