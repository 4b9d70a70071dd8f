// Mon Oct 19 2026 - Alex

use crate::config::Config;
use crate::hook::{HookDescriptor, HookEngine, HookError};
use crate::memory::Address;
use crate::symbol::SymbolResolver;
use log::{debug, error};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Installed hooks keyed by target address. At most one hook per target;
/// whatever is still installed when the registry drops is removed.
pub struct HookRegistry {
    engine: HookEngine,
    resolver: Option<Arc<SymbolResolver>>,
    hooks: Mutex<HashMap<u64, HookDescriptor>>,
}

impl HookRegistry {
    pub fn new(engine: HookEngine) -> Self {
        Self {
            engine,
            resolver: None,
            hooks: Mutex::new(HashMap::new()),
        }
    }

    /// Engine and resolver as configured: prologue verification and the
    /// optional symbol image used after the dynamic symbols.
    pub fn from_config(config: &Config) -> Result<Self, HookError> {
        let engine = HookEngine::new().with_prologue_check(config.verify_prologue);
        let resolver = SymbolResolver::new().with_image_fallback(config.symbol_image.as_deref())?;
        Ok(Self::new(engine).with_resolver(Arc::new(resolver)))
    }

    pub fn with_resolver(mut self, resolver: Arc<SymbolResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Hooks `target` and returns the trampoline entry that calls the
    /// original.
    ///
    /// # Safety
    ///
    /// Same contract as [`HookEngine::install`].
    pub unsafe fn install(&self, target: Address, replacement: Address) -> Result<Address, HookError> {
        let mut hooks = self.hooks.lock();
        if hooks.contains_key(&target.as_u64()) {
            return Err(HookError::InvalidState(format!("{} is already hooked", target)));
        }

        let descriptor = self.engine.install(target, replacement)?;
        let entry = descriptor.trampoline_entry().ok_or_else(|| {
            HookError::InvalidState(format!("hook on {} has no trampoline", target))
        })?;
        hooks.insert(target.as_u64(), descriptor);
        debug!("{} hooks registered", hooks.len());
        Ok(entry)
    }

    /// Resolves `name` and hooks it.
    ///
    /// # Safety
    ///
    /// Same contract as [`HookEngine::install`].
    pub unsafe fn install_symbol(&self, name: &str, replacement: Address) -> Result<Address, HookError> {
        let target = match &self.resolver {
            Some(resolver) => resolver.resolve(name)?,
            None => SymbolResolver::new().resolve(name)?,
        };
        self.install(target, replacement)
    }

    /// # Safety
    ///
    /// Same contract as [`HookEngine::remove`].
    pub unsafe fn remove(&self, target: Address) -> Result<(), HookError> {
        let mut hooks = self.hooks.lock();
        let descriptor = hooks
            .get_mut(&target.as_u64())
            .ok_or_else(|| HookError::InvalidArgument(format!("{} is not hooked", target)))?;
        self.engine.remove(descriptor)?;
        hooks.remove(&target.as_u64());
        Ok(())
    }

    pub fn trampoline(&self, target: Address) -> Option<Address> {
        self.hooks
            .lock()
            .get(&target.as_u64())
            .and_then(|d| d.trampoline_entry())
    }

    pub fn is_hooked(&self, target: Address) -> bool {
        self.hooks.lock().contains_key(&target.as_u64())
    }

    pub fn len(&self) -> usize {
        self.hooks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.lock().is_empty()
    }

    /// Removes every hook, returning how many could not be removed.
    ///
    /// # Safety
    ///
    /// Same contract as [`HookEngine::remove`].
    pub unsafe fn remove_all(&self) -> usize {
        let mut hooks = self.hooks.lock();
        let mut failed = 0;
        for (target, mut descriptor) in hooks.drain() {
            if let Err(e) = self.engine.remove(&mut descriptor) {
                error!("failed to remove hook on 0x{:x}: {}", target, e);
                failed += 1;
            }
        }
        failed
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new(HookEngine::new())
    }
}

impl Drop for HookRegistry {
    fn drop(&mut self) {
        if !self.is_empty() {
            unsafe {
                self.remove_all();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    std::arch::global_asm!(
        ".pushsection .text",
        ".p2align 4",
        ".globl memhook_registry_target_dup",
        "memhook_registry_target_dup:",
        "mov eax, 1",
        "ret",
        "int3",
        ".p2align 4",
        ".globl memhook_registry_target_drop",
        "memhook_registry_target_drop:",
        "mov eax, 1",
        "ret",
        "int3",
        ".p2align 4",
        ".globl memhook_registry_target_named",
        "memhook_registry_target_named:",
        "mov eax, 1",
        "ret",
        "int3",
        ".popsection",
    );

    extern "C" {
        fn memhook_registry_target_dup() -> u32;
        fn memhook_registry_target_drop() -> u32;
        fn memhook_registry_target_named() -> u32;
    }

    extern "C" fn replacement() -> u32 {
        2
    }

    fn addr(f: unsafe extern "C" fn() -> u32) -> Address {
        Address::from_ptr(f as *const u8)
    }

    fn replacement_addr() -> Address {
        Address::from_ptr(replacement as extern "C" fn() -> u32 as *const u8)
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let registry = HookRegistry::default();
        let target = addr(memhook_registry_target_dup);
        unsafe {
            registry.install(target, replacement_addr()).unwrap();
            let err = registry.install(target, replacement_addr()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidState);
            assert_eq!(registry.len(), 1);

            registry.remove(target).unwrap();
            assert!(!registry.is_hooked(target));
            assert_eq!(
                registry.remove(target).unwrap_err().kind(),
                ErrorKind::InvalidArgument
            );
            assert_eq!(memhook_registry_target_dup(), 1);
        }
    }

    #[test]
    fn test_drop_removes_hooks() {
        let target = addr(memhook_registry_target_drop);
        {
            let registry = HookRegistry::default();
            let entry = unsafe { registry.install(target, replacement_addr()).unwrap() };
            assert_eq!(registry.trampoline(target), Some(entry));
            assert_eq!(unsafe { memhook_registry_target_drop() }, 2);
        }
        assert_eq!(unsafe { memhook_registry_target_drop() }, 1);
    }

    #[test]
    fn test_install_by_symbol_name() {
        let registry = HookRegistry::from_config(&Config::default()).unwrap();
        unsafe {
            registry
                .install_symbol("memhook_registry_target_named", replacement_addr())
                .unwrap();
            assert!(registry.is_hooked(addr(memhook_registry_target_named)));
            assert_eq!(memhook_registry_target_named(), 2);
            assert_eq!(registry.remove_all(), 0);
            assert_eq!(memhook_registry_target_named(), 1);

            let err = registry
                .install_symbol("memhook_registry_missing_symbol", replacement_addr())
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }
}
