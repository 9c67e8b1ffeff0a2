use cmsis_swd::{ProbeSelector, SessionConfig, Target};

use crate::util::{attach, resolve_probe};

#[derive(clap::Parser)]
pub struct Cmd {
    /// Halt the core on the reset vector instead of letting it run
    #[clap(long)]
    halt: bool,
}

impl Cmd {
    pub fn run(self, probe: Option<ProbeSelector>, config: &SessionConfig) -> anyhow::Result<()> {
        let mut session = attach(&resolve_probe(probe)?, config)?;

        if self.halt {
            session.core().reset_halt(config.poll_timeout)?;
            let pc = session.core().get_reg(cmsis_swd::architecture::arm::core::PC)?;
            println!("Core halted at {pc:#010x}");
        } else {
            session.core().reset_run()?;
        }

        session.close()?;
        Ok(())
    }
}
