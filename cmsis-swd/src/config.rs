//! Settings for bringing up a debug session.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Parameters of the SWD link and the timeouts applied to a [`Session`](crate::Session).
///
/// Timeouts are given in milliseconds when (de)serialized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// SWD clock frequency in Hz.
    pub swj_clock_hz: u32,
    /// Idle cycles after every transfer.
    pub idle_cycles: u8,
    /// How often the probe retries a transfer answered with WAIT.
    pub wait_retry: u16,
    /// How often the probe retries a read with value match.
    pub match_retry: u16,
    /// The APSEL of the MEM-AP giving access to the system bus.
    pub ap_sel: u8,
    /// How long to wait for the probe to answer a command.
    #[serde(with = "duration_ms")]
    pub response_timeout: Duration,
    /// Deadline for power-up, debug reset and halt handshakes.
    #[serde(with = "duration_ms")]
    pub poll_timeout: Duration,
    /// Deadline for a single core register transfer.
    #[serde(with = "duration_ms")]
    pub register_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            swj_clock_hz: 10_000_000,
            idle_cycles: 0,
            wait_retry: 100,
            match_retry: 100,
            ap_sel: 0,
            response_timeout: Duration::from_secs(1),
            poll_timeout: Duration::from_secs(1),
            register_timeout: Duration::from_millis(100),
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.swj_clock_hz, 10_000_000);
        assert_eq!(config.idle_cycles, 0);
        assert_eq!(config.wait_retry, 100);
        assert_eq!(config.match_retry, 100);
        assert_eq!(config.ap_sel, 0);
        assert_eq!(config.response_timeout, Duration::from_secs(1));
        assert_eq!(config.register_timeout, Duration::from_millis(100));
    }
}
