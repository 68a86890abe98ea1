//! Cached program-counter → (symbol, file, line) resolution.

use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;

use super::address_map::AddressMap;
use crate::domain::SymbolLocation;

/// A symbolization backend.
///
/// Returns `None` for any failure; the resolver substitutes the sentinel.
pub trait Symbolize {
    fn symbolize(&self, addr: u64) -> Option<SymbolLocation>;
}

/// Backend used when no executable image is available
pub struct NullSymbolizer;

impl Symbolize for NullSymbolizer {
    fn symbolize(&self, _addr: u64) -> Option<SymbolLocation> {
        None
    }
}

/// Resolves addresses through a backend, caching every answer.
///
/// Both successful and sentinel results are cached under the post-transform
/// address, so the backend sees each distinct address at most once per
/// session. The cache never evicts.
pub struct SymbolResolver {
    backend: Box<dyn Symbolize>,
    transform: Option<AddressMap>,
    /// Cache of resolved locations by (transformed) address
    cache: RefCell<HashMap<u64, SymbolLocation>>,
}

impl SymbolResolver {
    #[must_use]
    pub fn new(backend: Box<dyn Symbolize>) -> Self {
        Self { backend, transform: None, cache: RefCell::new(HashMap::new()) }
    }

    /// Resolver that always yields the sentinel
    #[must_use]
    pub fn unresolved() -> Self {
        Self::new(Box::new(NullSymbolizer))
    }

    /// Apply `map` to every address before lookup
    #[must_use]
    pub fn with_transform(mut self, map: AddressMap) -> Self {
        self.transform = (!map.is_empty()).then_some(map);
        self
    }

    /// Resolve an address. Never fails; unresolvable addresses give the sentinel.
    pub fn resolve(&self, addr: u64) -> SymbolLocation {
        let addr = self.transform.as_ref().map_or(addr, |map| map.apply(addr));

        if let Some(cached) = self.cache.borrow().get(&addr) {
            return cached.clone();
        }

        let location = self.backend.symbolize(addr).unwrap_or_else(|| {
            debug!("No symbol for 0x{addr:x}");
            SymbolLocation::sentinel()
        });

        self.cache.borrow_mut().insert(addr, location.clone());
        location
    }

    /// Number of distinct addresses resolved so far
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }
}
