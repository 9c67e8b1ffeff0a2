use cmsis_swd::{CortexRegFile, ProbeSelector, SessionConfig, Target};

use crate::util::{attach, resolve_probe};

#[derive(clap::Parser)]
pub struct Cmd {
    /// Let the core continue after the registers were read
    #[clap(long)]
    resume: bool,
}

impl Cmd {
    pub fn run(self, probe: Option<ProbeSelector>, config: &SessionConfig) -> anyhow::Result<()> {
        let mut session = attach(&resolve_probe(probe)?, config)?;
        let core = session.core();

        core.halt(config.poll_timeout)?;
        let mut regs = CortexRegFile::default();
        core.get_regs(&mut regs)?;

        for (i, value) in regs.r[..13].iter().enumerate() {
            println!("R{i:<5} {value:#010x}");
        }
        println!("SP     {:#010x}", regs.sp());
        println!("LR     {:#010x}", regs.lr());
        println!("PC     {:#010x}", regs.pc());
        println!("xPSR   {:#010x}", regs.xpsr);
        println!("MSP    {:#010x}", regs.msp);
        println!("PSP    {:#010x}", regs.psp);

        if self.resume {
            core.run(None)?;
        }
        session.close()?;
        Ok(())
    }
}
