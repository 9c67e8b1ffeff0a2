pub mod config;
pub mod logging;

use std::num::ParseIntError;

use anyhow::Context;
use cmsis_swd::probe::cmsisdap::tools::list_cmsisdap_devices;
use cmsis_swd::{ProbeSelector, Session, SessionConfig};

pub fn parse_u32(input: &str) -> Result<u32, ParseIntError> {
    parse_int::parse(input)
}

/// Pick the probe to use: the selector given by the user, or the only probe
/// connected.
pub fn resolve_probe(selector: Option<ProbeSelector>) -> anyhow::Result<ProbeSelector> {
    if let Some(selector) = selector {
        return Ok(selector);
    }

    let probes = list_cmsisdap_devices()?;
    match probes.as_slice() {
        [] => anyhow::bail!("No CMSIS-DAP probe found."),
        [probe] => Ok(ProbeSelector::from(probe)),
        _ => anyhow::bail!(
            "{} probes found, select one with --probe VID:PID[:SERIAL].",
            probes.len()
        ),
    }
}

/// Open the probe and attach to its target.
pub fn attach(selector: &ProbeSelector, config: &SessionConfig) -> anyhow::Result<Session> {
    Session::open(selector, config)
        .with_context(|| format!("Failed to attach to the target behind {selector}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(parse_u32("0x20000000").unwrap(), 0x2000_0000);
        assert_eq!(parse_u32("1024").unwrap(), 1024);
        assert!(parse_u32("0x100000000").is_err());
        assert!(parse_u32("twelve").is_err());
    }

    #[test]
    fn explicit_selector_is_used() {
        let selector: ProbeSelector = "0d28:0204:0240000034544e45".parse().unwrap();
        assert_eq!(resolve_probe(Some(selector.clone())).unwrap(), selector);
    }
}
