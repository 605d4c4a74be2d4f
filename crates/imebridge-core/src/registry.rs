use std::collections::HashMap;
use std::rc::Rc;

use crate::{ContextRef, RouterError, WeakContextRef, WindowHandle};

/// Handle → context lookup table.
///
/// Entries are `Weak`, so a context dropped without unregistering reads as
/// absent. Dead entries are swept lazily on lookup and by [`prune`].
///
/// [`prune`]: ContextRegistry::prune
#[derive(Default)]
pub struct ContextRegistry {
    contexts: HashMap<WindowHandle, WeakContextRef>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `context` under its own handle.
    ///
    /// Re-registering the same context is a no-op. A different live context
    /// on the same handle is rejected; a dead one is replaced. A context that
    /// is mutably borrowed (e.g. registering from inside its own callback)
    /// cannot report its handle and is rejected.
    pub fn insert(&mut self, context: &ContextRef) -> Result<WindowHandle, RouterError> {
        let handle = context
            .try_borrow()
            .map_err(|_| RouterError::ContextBorrowed)?
            .handle();
        let weak = Rc::downgrade(context);

        if let Some(existing) = self.contexts.get(&handle)
            && existing.strong_count() > 0
        {
            if existing.ptr_eq(&weak) {
                return Ok(handle);
            }
            return Err(RouterError::HandleInUse(handle));
        }

        self.contexts.insert(handle, weak);
        Ok(handle)
    }

    /// Removes `context` wherever it is registered. Matching is by identity,
    /// so the context does not need to be borrowable (it may be mid-teardown).
    pub fn remove(&mut self, context: &ContextRef) -> Option<WindowHandle> {
        let weak = Rc::downgrade(context);
        let handle = self
            .contexts
            .iter()
            .find(|(_, w)| w.ptr_eq(&weak))
            .map(|(h, _)| *h)?;
        self.contexts.remove(&handle);
        Some(handle)
    }

    pub fn lookup(&mut self, handle: WindowHandle) -> Option<ContextRef> {
        let weak = self.contexts.get(&handle)?;
        match weak.upgrade() {
            Some(context) => Some(context),
            None => {
                log::trace!("sweeping dead input context for {handle}");
                self.contexts.remove(&handle);
                None
            }
        }
    }

    pub fn contains(&self, handle: WindowHandle) -> bool {
        self.contexts
            .get(&handle)
            .is_some_and(|w| w.strong_count() > 0)
    }

    /// Drops entries whose context is gone. Returns how many were removed.
    pub fn prune(&mut self) -> usize {
        let before = self.contexts.len();
        self.contexts.retain(|_, w| w.strong_count() > 0);
        before - self.contexts.len()
    }

    /// Live handles, sorted.
    pub fn handles(&self) -> Vec<WindowHandle> {
        let mut out: Vec<WindowHandle> = self
            .contexts
            .iter()
            .filter(|(_, w)| w.strong_count() > 0)
            .map(|(h, _)| *h)
            .collect();
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.contexts
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::InputContext;

    struct Stub(WindowHandle);

    impl InputContext for Stub {
        fn handle(&self) -> WindowHandle {
            self.0
        }
        fn commit(&mut self, _text: &str) {}
        fn preedit_changed(&mut self, _text: &str, _commit: &str) {}
        fn delete_range(&mut self, _index: i32, _length: u32) {}
    }

    fn stub(h: u32) -> ContextRef {
        Rc::new(RefCell::new(Stub(WindowHandle(h))))
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut reg = ContextRegistry::new();
        let a = stub(1);
        assert_eq!(reg.insert(&a).unwrap(), WindowHandle(1));
        let found = reg.lookup(WindowHandle(1)).unwrap();
        assert!(Rc::ptr_eq(&found, &a));
        assert!(reg.lookup(WindowHandle(2)).is_none());
    }

    #[test]
    fn test_duplicate_live_handle_rejected() {
        let mut reg = ContextRegistry::new();
        let a = stub(1);
        let b = stub(1);
        reg.insert(&a).unwrap();
        // same context again is fine
        reg.insert(&a).unwrap();
        assert!(matches!(
            reg.insert(&b),
            Err(RouterError::HandleInUse(WindowHandle(1)))
        ));
    }

    #[test]
    fn test_dead_entry_is_replaced_and_swept() {
        let mut reg = ContextRegistry::new();
        {
            let a = stub(3);
            reg.insert(&a).unwrap();
        }
        assert!(!reg.contains(WindowHandle(3)));
        assert!(reg.is_empty());

        let b = stub(3);
        reg.insert(&b).unwrap();
        assert!(reg.contains(WindowHandle(3)));

        drop(b);
        assert!(reg.lookup(WindowHandle(3)).is_none());
        assert_eq!(reg.prune(), 0);
    }

    #[test]
    fn test_insert_while_borrowed_is_rejected() {
        let mut reg = ContextRegistry::new();
        let a = stub(6);
        {
            let _guard = a.borrow_mut();
            assert!(matches!(reg.insert(&a), Err(RouterError::ContextBorrowed)));
        }
        assert!(!reg.contains(WindowHandle(6)));
        assert_eq!(reg.insert(&a).unwrap(), WindowHandle(6));
    }

    #[test]
    fn test_remove_by_identity() {
        let mut reg = ContextRegistry::new();
        let a = stub(4);
        let other = stub(4);
        reg.insert(&a).unwrap();

        assert_eq!(reg.remove(&other), None);
        assert!(reg.contains(WindowHandle(4)));

        // held mutably, still removable
        let _guard = a.borrow_mut();
        assert_eq!(reg.remove(&a), Some(WindowHandle(4)));
        assert_eq!(reg.remove(&a), None);
    }

    #[test]
    fn test_prune_and_handles() {
        let mut reg = ContextRegistry::new();
        let keep = stub(9);
        let gone = stub(2);
        reg.insert(&keep).unwrap();
        reg.insert(&gone).unwrap();
        let another = stub(5);
        reg.insert(&another).unwrap();
        drop(gone);

        assert_eq!(reg.handles(), vec![WindowHandle(5), WindowHandle(9)]);
        assert_eq!(reg.prune(), 1);
        assert_eq!(reg.len(), 2);
    }
}
