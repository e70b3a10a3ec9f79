// Rawfilter Provider Slot
// Explicit "is the real provider available yet" state

use std::fmt;
use std::sync::OnceLock;

/// A value installed at most once, readable from any thread.
///
/// An empty slot is a normal state: [`ProviderSlot::get`] returns `None`
/// until something installs the provider.
pub struct ProviderSlot<T> {
    cell: OnceLock<T>,
}

impl<T> ProviderSlot<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// The installed provider, if any
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Install `value`; gives it back if a provider is already installed
    pub fn install(&self, value: T) -> Result<(), T> {
        self.cell.set(value)
    }

    /// Return the installed provider, creating it with `init` if the slot is empty.
    ///
    /// A failed `init` leaves the slot empty so a later call can retry. If
    /// two threads race, the first installed value wins.
    pub fn get_or_try_init<E, F>(&self, init: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        let value = init()?;
        Ok(self.cell.get_or_init(|| value))
    }
}

impl<T> Default for ProviderSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ProviderSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSlot")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// A provider slot paired with the function that fills it.
pub struct LazyProvider<T, E> {
    slot: ProviderSlot<T>,
    init: Box<dyn Fn() -> Result<T, E> + Send + Sync>,
}

impl<T, E> LazyProvider<T, E> {
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            slot: ProviderSlot::new(),
            init: Box::new(init),
        }
    }

    /// The provider if it has been acquired already
    pub fn get(&self) -> Option<&T> {
        self.slot.get()
    }

    pub fn is_ready(&self) -> bool {
        self.slot.is_ready()
    }

    /// Acquire the provider now if it is not yet available
    pub fn force(&self) -> Result<&T, E> {
        self.slot.get_or_try_init(|| (self.init)())
    }
}

impl<T, E> fmt::Debug for LazyProvider<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyProvider")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_slot_starts_empty() {
        let slot: ProviderSlot<u32> = ProviderSlot::new();
        assert!(slot.get().is_none());
        assert!(!slot.is_ready());
    }

    #[test]
    fn test_install_once() {
        let slot = ProviderSlot::new();
        assert_eq!(slot.install(1), Ok(()));
        assert_eq!(slot.install(2), Err(2));
        assert_eq!(slot.get(), Some(&1));
    }

    #[test]
    fn test_failed_init_can_retry() {
        let slot: ProviderSlot<u32> = ProviderSlot::new();
        assert_eq!(slot.get_or_try_init(|| Err::<u32, _>("not yet")), Err("not yet"));
        assert!(!slot.is_ready());
        assert_eq!(slot.get_or_try_init(|| Ok::<_, &str>(7)), Ok(&7));
        assert_eq!(slot.get_or_try_init(|| Ok::<_, &str>(8)), Ok(&7));
    }

    #[test]
    fn test_lazy_provider_runs_init_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let provider: LazyProvider<String, ()> = LazyProvider::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("user32".to_string())
        });

        assert!(provider.get().is_none());
        assert_eq!(provider.force().map(String::as_str), Ok("user32"));
        assert_eq!(provider.force().map(String::as_str), Ok("user32"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
