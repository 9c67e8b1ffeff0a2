mod cmd;
mod util;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use cmsis_swd::ProbeSelector;

use crate::util::config::{load_config, Config};
use crate::util::logging::{setup_logging, LevelFilter};

#[derive(clap::Parser)]
#[clap(
    name = "cmsis-swd",
    about = "Control Cortex-M targets through a CMSIS-DAP probe",
    version
)]
struct Cli {
    /// The probe to use, as VID:PID or VID:PID:SERIAL (hex VID and PID)
    #[clap(long, global = true, env = "CMSIS_SWD_PROBE")]
    probe: Option<ProbeSelector>,

    /// Path to a TOML configuration file
    #[clap(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level, overriding RUST_LOG
    #[clap(long, global = true, value_enum, help_heading = "LOG CONFIGURATION")]
    log_level: Option<LevelFilter>,

    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(clap::Subcommand)]
enum Subcommand {
    /// List all connected CMSIS-DAP probes
    List(cmd::list::Cmd),
    /// Show probe and target information
    Info(cmd::info::Cmd),
    /// Reset the target
    Reset(cmd::reset::Cmd),
    /// Halt the core and print its registers
    Regs(cmd::regs::Cmd),
    /// Read 32 bit words from target memory
    Read(cmd::read::Cmd),
    /// Write 32 bit words to target memory
    Write(cmd::write::Cmd),
}

impl Cli {
    fn run(self, config: Config) -> Result<()> {
        let probe = self.probe.or(config.probe);
        let session = &config.session;

        match self.subcommand {
            Subcommand::List(cmd) => cmd.run(),
            Subcommand::Info(cmd) => cmd.run(probe, session),
            Subcommand::Reset(cmd) => cmd.run(probe, session),
            Subcommand::Regs(cmd) => cmd.run(probe, session),
            Subcommand::Read(cmd) => cmd.run(probe, session),
            Subcommand::Write(cmd) => cmd.run(probe, session),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    setup_logging(cli.log_level.or(config.log_level));

    cli.run(config)
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cmsis-swd",
            "read",
            "0x20000000",
            "16",
            "--probe",
            "0d28:0204",
            "--log-level",
            "DEBUG",
        ])
        .unwrap();

        assert_eq!(cli.probe, Some("0d28:0204".parse().unwrap()));
        assert_eq!(cli.log_level, Some(LevelFilter::Debug));
        assert!(matches!(cli.subcommand, Subcommand::Read(_)));
    }

    #[test]
    fn write_needs_data() {
        assert!(Cli::try_parse_from(["cmsis-swd", "write", "0x20000000"]).is_err());
    }
}
