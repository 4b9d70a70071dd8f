// Mon Oct 19 2026 - Alex

use crate::memory::{page_size, Address, MemoryMapping};
use crate::symbol::{SymbolError, SymbolSource};
use goblin::elf::program_header::PT_LOAD;
use goblin::elf::section_header::SHN_UNDEF;
use goblin::elf::sym::{STT_FUNC, STT_NOTYPE, STT_OBJECT};
use goblin::elf::Elf;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Static and dynamic symbol tables of an ELF image that is mapped into the
/// running process, relocated by the image's load bias.
pub struct ImageSymbols {
    label: String,
    bias: u64,
    symbols: HashMap<String, u64>,
}

impl ImageSymbols {
    pub fn current_exe() -> Result<Self, SymbolError> {
        let path = fs::read_link("/proc/self/exe")?;
        Self::load_mapped(&path)
    }

    pub fn load_mapped(path: &Path) -> Result<Self, SymbolError> {
        let label = path.to_string_lossy().to_string();
        let data = fs::read(path)?;
        let (symbols, link_base) = parse_image(&label, &data)?;

        let map = MemoryMapping::current().map_err(|e| SymbolError::InvalidImage {
            path: label.clone(),
            reason: e.to_string(),
        })?;
        let load_base = map.image_base(&label).ok_or_else(|| SymbolError::InvalidImage {
            path: label.clone(),
            reason: "image is not mapped in this process".to_string(),
        })?;

        Ok(Self {
            bias: load_base.as_u64().wrapping_sub(link_base),
            label,
            symbols,
        })
    }

    /// Builds a table from raw image bytes with an explicit load bias.
    pub fn from_bytes(label: &str, data: &[u8], bias: u64) -> Result<Self, SymbolError> {
        let (symbols, _) = parse_image(label, data)?;
        Ok(Self {
            label: label.to_string(),
            bias,
            symbols,
        })
    }

    pub fn bias(&self) -> u64 {
        self.bias
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolSource for ImageSymbols {
    fn label(&self) -> &str {
        &self.label
    }

    fn lookup(&self, name: &str) -> Option<Address> {
        self.symbols
            .get(name)
            .map(|value| Address::new(value.wrapping_add(self.bias)))
    }
}

fn parse_image(label: &str, data: &[u8]) -> Result<(HashMap<String, u64>, u64), SymbolError> {
    let elf = Elf::parse(data).map_err(|e| SymbolError::InvalidImage {
        path: label.to_string(),
        reason: e.to_string(),
    })?;

    let link_base = elf
        .program_headers
        .iter()
        .filter(|ph| ph.p_type == PT_LOAD)
        .map(|ph| ph.p_vaddr.wrapping_sub(ph.p_offset))
        .min()
        .map(|vaddr| Address::new(vaddr).align_down(page_size()).as_u64())
        .unwrap_or(0);

    let mut symbols = HashMap::new();
    for (table, strings) in [(&elf.syms, &elf.strtab), (&elf.dynsyms, &elf.dynstrtab)] {
        for sym in table.iter() {
            if sym.st_value == 0 || sym.st_shndx == SHN_UNDEF as usize {
                continue;
            }
            if !matches!(sym.st_type(), STT_FUNC | STT_OBJECT | STT_NOTYPE) {
                continue;
            }
            match strings.get_at(sym.st_name) {
                Some(name) if !name.is_empty() => {
                    symbols.entry(name.to_string()).or_insert(sym.st_value);
                }
                _ => {}
            }
        }
    }

    Ok((symbols, link_base))
}
