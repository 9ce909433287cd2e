//! DWARF address resolution for the pc column
//!
//! Maps the dominant program counter of a serial section to source
//! file:line and function name. Uses the addr2line crate.

use crate::error::{Result, SerialsumError};
use object::{Object, ObjectSection, SectionKind};
use std::fs::File;
use std::path::Path;

/// Source location information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Source file path
    pub file: String,
    /// Line number
    pub line: u32,
    /// Function name (if available)
    pub function: Option<String>,
}

/// Translates program counters to source locations
pub trait AddressResolver {
    /// Source location for `pc`, or `None` if the address is unknown
    fn resolve(&self, pc: u64) -> Option<SourceLocation>;
}

/// DWARF debug info context for the traced executable
pub struct DwarfResolver {
    context: addr2line::Context<gimli::EndianRcSlice<gimli::RunTimeEndian>>,
    /// `[start, end)` address ranges of the executable's text sections
    text_ranges: Vec<(u64, u64)>,
}

fn resolver_error(binary_path: &Path, what: impl std::fmt::Display) -> SerialsumError {
    SerialsumError::Resolver(format!("{}: {}", binary_path.display(), what))
}

impl DwarfResolver {
    /// Load DWARF debug info from an ELF executable
    pub fn load(binary_path: &Path) -> Result<Self> {
        let file = File::open(binary_path).map_err(|e| resolver_error(binary_path, e))?;

        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| resolver_error(binary_path, e))?;

        let object = object::File::parse(&*mmap).map_err(|e| resolver_error(binary_path, e))?;

        // DWARF keeps entries at address 0 for code the linker discarded
        let text_ranges: Vec<(u64, u64)> = object
            .sections()
            .filter(|section| section.kind() == SectionKind::Text && section.size() > 0)
            .map(|section| (section.address(), section.address() + section.size()))
            .collect();

        let endian = if object.is_little_endian() {
            gimli::RunTimeEndian::Little
        } else {
            gimli::RunTimeEndian::Big
        };

        let load_section = |id: gimli::SectionId| -> std::result::Result<
            gimli::EndianRcSlice<gimli::RunTimeEndian>,
            gimli::Error,
        > {
            let data = object
                .section_by_name(id.name())
                .and_then(|section| section.uncompressed_data().ok())
                .unwrap_or(std::borrow::Cow::Borrowed(&[]));
            let bytes: std::rc::Rc<[u8]> = std::rc::Rc::from(data.into_owned());
            Ok(gimli::EndianRcSlice::new(bytes, endian))
        };

        let dwarf = gimli::Dwarf::load(&load_section).map_err(|e| {
            resolver_error(binary_path, format!("failed to load DWARF sections: {}", e))
        })?;

        let context = addr2line::Context::from_dwarf(dwarf).map_err(|e| resolver_error(binary_path, e))?;

        tracing::debug!(
            exefile = %binary_path.display(),
            text_sections = text_ranges.len(),
            "loaded DWARF context"
        );
        Ok(Self { context, text_ranges })
    }

    fn in_text(&self, pc: u64) -> bool {
        self.text_ranges.iter().any(|&(start, end)| pc >= start && pc < end)
    }
}

impl AddressResolver for DwarfResolver {
    fn resolve(&self, pc: u64) -> Option<SourceLocation> {
        if !self.in_text(pc) {
            return None;
        }

        let location = self.context.find_location(pc).ok()??;
        let file = location.file?.to_string();
        let line = location.line.unwrap_or(0);
        if line == 0 {
            return None;
        }

        let mut function = None;
        if let Ok(mut frames) = self.context.find_frames(pc).skip_all_loads() {
            if let Ok(Some(frame)) = frames.next() {
                if let Some(func) = frame.function {
                    function = func.raw_name().ok().map(|name| name.to_string());
                }
            }
        }

        Some(SourceLocation { file, line, function })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object::ObjectSymbol;
    use std::fs;
    use std::process::Command;
    use tempfile::TempDir;

    fn compile_test_binary() -> (TempDir, std::path::PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let src_file = temp_dir.path().join("test.rs");
        let bin_file = temp_dir.path().join("test_bin");

        fs::write(&src_file, "fn main() { println!(\"test\"); }").unwrap();

        Command::new("rustc")
            .arg(&src_file)
            .arg("-o")
            .arg(&bin_file)
            .arg("-g")
            .status()
            .unwrap();

        (temp_dir, bin_file)
    }

    #[test]
    fn test_dwarf_resolver_loads() {
        let (_temp_dir, bin_file) = compile_test_binary();
        let result = DwarfResolver::load(&bin_file);
        assert!(result.is_ok(), "Should load DWARF context: {:?}", result.err());
    }

    #[test]
    fn test_unknown_address_is_none() {
        let (_temp_dir, bin_file) = compile_test_binary();
        let resolver = DwarfResolver::load(&bin_file).unwrap();
        assert!(resolver.resolve(0x1).is_none());
    }

    #[test]
    fn test_address_past_text_is_none() {
        let (_temp_dir, bin_file) = compile_test_binary();
        let resolver = DwarfResolver::load(&bin_file).unwrap();
        assert!(!resolver.text_ranges.is_empty());

        let end = resolver.text_ranges.iter().map(|&(_, end)| end).max().unwrap();
        assert!(resolver.resolve(end).is_none());
        assert!(resolver.resolve(u64::MAX).is_none());
    }

    #[test]
    fn test_user_function_resolves_to_source() {
        let (_temp_dir, bin_file) = compile_test_binary();
        let resolver = DwarfResolver::load(&bin_file).unwrap();

        let data = fs::read(&bin_file).unwrap();
        let object = object::File::parse(&*data).unwrap();
        let main = object
            .symbols()
            .find(|symbol| symbol.name().map(|name| name.contains("4test4main")).unwrap_or(false))
            .expect("test binary should contain test::main");

        let location = resolver.resolve(main.address()).unwrap();
        assert!(location.file.ends_with("test.rs"), "unexpected file {}", location.file);
        assert_eq!(location.line, 1);
    }

    #[test]
    fn test_missing_binary_is_resolver_error() {
        let dir = TempDir::new().unwrap();
        let err = DwarfResolver::load(&dir.path().join("missing")).err().unwrap();
        assert!(matches!(err, SerialsumError::Resolver(_)));
    }

    #[test]
    fn test_non_elf_is_resolver_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("not_elf");
        fs::write(&path, b"plain text").unwrap();
        assert!(DwarfResolver::load(&path).is_err());
    }
}
