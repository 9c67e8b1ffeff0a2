use anyhow::Context;
use cmsis_swd::{CmsisDap, ProbeSelector, Session, SessionConfig};

use crate::util::resolve_probe;

#[derive(clap::Parser)]
pub struct Cmd {}

impl Cmd {
    pub fn run(self, probe: Option<ProbeSelector>, config: &SessionConfig) -> anyhow::Result<()> {
        let selector = resolve_probe(probe)?;
        let mut probe = CmsisDap::open(&selector, config.response_timeout)?;

        let field = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
        println!("Probe:");
        println!("  Vendor:           {}", field(probe.vendor_name()?));
        println!("  Product:          {}", field(probe.product_name()?));
        println!("  Serial number:    {}", field(probe.serial_number()?));
        println!("  Firmware version: {}", field(probe.firmware_version()?));
        println!("  Packet size:      {}", probe.packet_size());
        println!("  Packet count:     {}", probe.packet_count()?);

        let capabilities = probe.capabilities()?;
        println!("  SWD:              {}", capabilities.swd_implemented);
        println!("  JTAG:             {}", capabilities.jtag_implemented);

        let board_vendor = probe.target_vendor()?;
        let board_name = probe.target_name()?;
        if board_vendor.is_some() || board_name.is_some() {
            println!("  Board:            {} {}", field(board_vendor), field(board_name));
        }

        let session = Session::attach(probe, config)
            .with_context(|| format!("Failed to attach to the target behind {selector}"))?;
        let dp_id = session.dp_id();
        println!("Target:");
        println!("  Core:             {}", session.target_name());
        println!("  Debug port:       {}", dp_id);

        session.close()?;
        Ok(())
    }
}
