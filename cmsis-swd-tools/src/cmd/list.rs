use cmsis_swd::probe::cmsisdap::tools::list_cmsisdap_devices;

#[derive(clap::Parser)]
pub struct Cmd {}

impl Cmd {
    pub fn run(self) -> anyhow::Result<()> {
        let probes = list_cmsisdap_devices()?;

        if probes.is_empty() {
            println!("No CMSIS-DAP probes were found.");
            return Ok(());
        }

        println!("The following CMSIS-DAP probes were found:");
        for (num, probe) in probes.iter().enumerate() {
            println!("[{num}]: {probe}");
        }
        Ok(())
    }
}
