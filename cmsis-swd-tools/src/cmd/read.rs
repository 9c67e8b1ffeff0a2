use cmsis_swd::{ProbeSelector, SessionConfig, TargetMemReader};

use crate::util::{attach, parse_u32, resolve_probe};

/// Words printed per line.
const WORDS_PER_LINE: usize = 4;

/// Read from target memory
///
/// e.g. cmsis-swd read 0x20000000 8
///      Reads 8 32-bit words starting at 0x20000000
#[derive(clap::Parser)]
#[clap(verbatim_doc_comment)]
pub struct Cmd {
    /// Word aligned start address
    #[clap(value_parser = parse_u32)]
    address: u32,
    /// Number of words to read
    words: usize,
}

impl Cmd {
    pub fn run(self, probe: Option<ProbeSelector>, config: &SessionConfig) -> anyhow::Result<()> {
        let mut session = attach(&resolve_probe(probe)?, config)?;
        let data = session.memory().read_target_mem(self.address, self.words)?;

        print!("{}", format_words(self.address, &data));
        session.close()?;
        Ok(())
    }
}

fn format_words(address: u32, data: &[u32]) -> String {
    let mut out = String::new();
    for (line, chunk) in data.chunks(WORDS_PER_LINE).enumerate() {
        let line_address = address.wrapping_add((line * WORDS_PER_LINE * 4) as u32);
        let words: Vec<String> = chunk.iter().map(|w| format!("{w:08x}")).collect();
        out.push_str(&format!("{line_address:#010x}: {}\n", words.join(" ")));
    }
    out
}
