//! Human-readable assembly listing (feature: "listing")

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Bytes shown per line before eliding the rest.
const MAX_BYTES: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLine {
    /// Program counter at the start of the line, if an origin was set.
    pub address: Option<u16>,
    pub bytes: Vec<u8>,
    pub source: String,
}

/// Pass 2 view of every assembled line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    lines: Vec<ListingLine>,
}

impl Listing {
    pub fn push(&mut self, address: Option<u16>, bytes: Vec<u8>, source: &str) {
        self.lines.push(ListingLine {
            address,
            bytes,
            source: source.to_string(),
        });
    }

    pub fn lines(&self) -> &[ListingLine] {
        &self.lines
    }

    pub fn print(&self) {
        print!("{}", self);
    }

    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut f = File::create(path)?;
        write!(f, "{}", self)?;
        f.flush()
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Assembly Listing:")?;
        writeln!(f, "Address:  Machine Code              Source")?;
        writeln!(f, "{}", "-".repeat(60))?;
        for line in &self.lines {
            let address = match line.address {
                Some(pc) => format!("${:04X}:", pc),
                None => "      ".to_string(),
            };
            let mut hex = line
                .bytes
                .iter()
                .take(MAX_BYTES)
                .map(|b| format!("${:02X}", b))
                .collect::<Vec<_>>()
                .join(" ");
            if line.bytes.len() > MAX_BYTES {
                hex.push_str("...");
            }
            writeln!(f, "{}  {:<26}{}", address, hex, line.source.trim_end())?;
        }
        Ok(())
    }
}
