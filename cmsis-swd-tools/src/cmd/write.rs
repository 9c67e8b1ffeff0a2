use cmsis_swd::{ProbeSelector, SessionConfig, TargetMemWriter};

use crate::util::{attach, parse_u32, resolve_probe};

/// Write to target memory
///
/// e.g. cmsis-swd write 0x20000000 0xdeadbeef 0x12345678
///      Writes two 32-bit words starting at 0x20000000
#[derive(clap::Parser)]
#[clap(verbatim_doc_comment)]
pub struct Cmd {
    /// Word aligned start address
    #[clap(value_parser = parse_u32)]
    address: u32,
    /// The words to write
    #[clap(value_parser = parse_u32, num_args = 1.., required = true)]
    data: Vec<u32>,
}

impl Cmd {
    pub fn run(self, probe: Option<ProbeSelector>, config: &SessionConfig) -> anyhow::Result<()> {
        let mut session = attach(&resolve_probe(probe)?, config)?;
        session.memory().write_target_mem(self.address, &self.data)?;
        session.close()?;
        Ok(())
    }
}
