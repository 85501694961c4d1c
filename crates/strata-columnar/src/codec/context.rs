//! Thread-scoped codec registry slot.
//!
//! Connector code that runs on pooled worker threads sometimes wants a
//! per-thread default registry. This slot holds one. The sink, writer and
//! reader never look at it: they only use the registry handed to their
//! constructors, so an empty or missing slot cannot affect them.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use super::CodecRegistry;

thread_local! {
    static SCOPED_REGISTRY: RefCell<Option<Arc<CodecRegistry>>> = const { RefCell::new(None) };
}

/// Returns the registry installed on the current thread, if any.
pub fn scoped_registry() -> Option<Arc<CodecRegistry>> {
    SCOPED_REGISTRY.with(|slot| slot.borrow().clone())
}

/// Guard that installs a registry into the current thread's slot.
///
/// The previous occupant is restored when the guard drops, so scopes nest.
/// The guard is tied to the thread that created it.
#[must_use = "the registry is uninstalled as soon as the scope is dropped"]
#[derive(Debug)]
pub struct ThreadCodecScope {
    previous: Option<Arc<CodecRegistry>>,
    _not_send: PhantomData<*const ()>,
}

impl ThreadCodecScope {
    /// Installs `registry` for the lifetime of the guard.
    pub fn enter(registry: Arc<CodecRegistry>) -> Self {
        Self::replace(Some(registry))
    }

    /// Empties the slot for the lifetime of the guard.
    pub fn cleared() -> Self {
        Self::replace(None)
    }

    fn replace(next: Option<Arc<CodecRegistry>>) -> Self {
        let previous = SCOPED_REGISTRY.with(|slot| slot.replace(next));
        Self {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for ThreadCodecScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        SCOPED_REGISTRY.with(|slot| {
            *slot.borrow_mut() = previous;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CompressionKind;

    #[test]
    fn test_scopes_nest_and_restore() {
        assert!(scoped_registry().is_none());

        let outer = ThreadCodecScope::enter(Arc::new(CodecRegistry::builtin()));
        assert!(scoped_registry()
            .map(|r| r.contains(CompressionKind::Lz4))
            .unwrap_or(false));

        {
            let _inner = ThreadCodecScope::enter(Arc::new(CodecRegistry::empty()));
            let current = scoped_registry().unwrap();
            assert!(current.kinds().is_empty());

            {
                let _cleared = ThreadCodecScope::cleared();
                assert!(scoped_registry().is_none());
            }
            assert!(scoped_registry().unwrap().kinds().is_empty());
        }

        assert!(scoped_registry().unwrap().contains(CompressionKind::Zstd));
        drop(outer);
        assert!(scoped_registry().is_none());
    }

    #[test]
    fn test_slot_is_per_thread() {
        let _scope = ThreadCodecScope::enter(Arc::new(CodecRegistry::builtin()));
        let seen = std::thread::spawn(|| scoped_registry().is_some())
            .join()
            .unwrap();
        assert!(!seen);
        assert!(scoped_registry().is_some());
    }
}
