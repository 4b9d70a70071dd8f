// Mon Oct 19 2026 - Alex

use crate::memory::Address;
use crate::symbol::{ImageSymbols, SymbolCache, SymbolError};
use log::debug;
use std::ffi::CString;
use std::path::Path;

pub trait SymbolSource: Send + Sync {
    fn label(&self) -> &str;
    fn lookup(&self, name: &str) -> Option<Address>;
}

/// Exported symbols visible to the dynamic linker.
pub struct DynamicSymbols;

impl SymbolSource for DynamicSymbols {
    fn label(&self) -> &str {
        "dynamic"
    }

    fn lookup(&self, name: &str) -> Option<Address> {
        let name = CString::new(name).ok()?;
        let ptr = unsafe { libc::dlsym(libc::RTLD_DEFAULT, name.as_ptr()) };
        if ptr.is_null() {
            None
        } else {
            Some(Address::from_ptr(ptr as *const u8))
        }
    }
}

pub struct SymbolResolver {
    sources: Vec<Box<dyn SymbolSource>>,
    cache: SymbolCache,
}

impl SymbolResolver {
    pub fn new() -> Self {
        Self {
            sources: vec![Box::new(DynamicSymbols)],
            cache: SymbolCache::new(),
        }
    }

    pub fn with_fallback<S: SymbolSource + 'static>(mut self, source: S) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Adds the static symbol table of a mapped image (the running
    /// executable when `path` is `None`) as a secondary lookup.
    pub fn with_image_fallback(self, path: Option<&Path>) -> Result<Self, SymbolError> {
        let image = match path {
            Some(path) => ImageSymbols::load_mapped(path)?,
            None => ImageSymbols::current_exe()?,
        };
        debug!("image fallback {} loaded with {} symbols", image.label(), image.len());
        Ok(self.with_fallback(image))
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn resolve(&self, name: &str) -> Result<Address, SymbolError> {
        if name.is_empty() || name.contains('\0') {
            return Err(SymbolError::InvalidName(name.to_string()));
        }
        if let Some(address) = self.cache.get(name) {
            return Ok(address);
        }

        for source in &self.sources {
            if let Some(address) = source.lookup(name).filter(|a| !a.is_null()) {
                debug!("resolved {} to {} via {}", name, address, source.label());
                self.cache.insert(name, address);
                return Ok(address);
            }
        }

        Err(SymbolError::NotFound(name.to_string()))
    }
}

impl Default for SymbolResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixedSymbols(HashMap<&'static str, u64>);

    impl SymbolSource for FixedSymbols {
        fn label(&self) -> &str {
            "fixed"
        }

        fn lookup(&self, name: &str) -> Option<Address> {
            self.0.get(name).map(|v| Address::new(*v))
        }
    }

    #[no_mangle]
    #[inline(never)]
    pub extern "C" fn memhook_resolver_sample() -> u32 {
        7
    }

    #[test]
    fn test_resolves_libc_export() {
        let resolver = SymbolResolver::new();
        let address = resolver.resolve("getpid").unwrap();
        assert!(!address.is_null());
    }

    #[test]
    fn test_fallback_is_consulted() {
        let resolver = SymbolResolver::new()
            .with_fallback(FixedSymbols(HashMap::from([("memhook_fixed_symbol", 0x4000)])));
        assert_eq!(resolver.resolve("memhook_fixed_symbol").unwrap(), Address::new(0x4000));
        assert_eq!(resolver.source_count(), 2);
    }

    #[test]
    fn test_image_fallback_finds_unexported_function() {
        let resolver = SymbolResolver::new().with_image_fallback(None).unwrap();
        let address = resolver.resolve("memhook_resolver_sample").unwrap();
        assert_eq!(address, Address::new(memhook_resolver_sample as usize as u64));
        assert_eq!(memhook_resolver_sample(), 7);
    }

    #[test]
    fn test_missing_symbol_is_not_found() {
        let resolver = SymbolResolver::new();
        let err = resolver.resolve("memhook_definitely_missing").unwrap_err();
        assert!(matches!(err, SymbolError::NotFound(_)));
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn test_invalid_names() {
        let resolver = SymbolResolver::new();
        assert!(matches!(resolver.resolve(""), Err(SymbolError::InvalidName(_))));
        assert!(matches!(resolver.resolve("a\0b"), Err(SymbolError::InvalidName(_))));
    }
}
