//! Subsystem ownership and typed lookup
//!
//! The registry owns every subsystem for the life of the process. Routines and
//! callers refer to a subsystem through a [`SubsystemHandle<T>`], a copyable
//! index that resolves back to the concrete type on lookup.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use super::Subsystem;
use crate::intent::Intent;

/// Untyped position of a subsystem in its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubsystemId(usize);

impl SubsystemId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Typed, non-owning reference to a registered subsystem
pub struct SubsystemHandle<T> {
    id: SubsystemId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SubsystemHandle<T> {
    pub fn id(&self) -> SubsystemId {
        self.id
    }
}

impl<T> Clone for SubsystemHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SubsystemHandle<T> {}

impl<T> PartialEq for SubsystemHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for SubsystemHandle<T> {}

impl<T> fmt::Debug for SubsystemHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubsystemHandle({})", self.id.0)
    }
}

/// Owner of all subsystems, in registration order
#[derive(Default)]
pub struct SubsystemRegistry {
    subsystems: Vec<Box<dyn Subsystem>>,
}

impl SubsystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subsystem and return its typed handle
    pub fn add<T: Subsystem>(&mut self, subsystem: T) -> SubsystemHandle<T> {
        let id = SubsystemId(self.subsystems.len());
        self.subsystems.push(Box::new(subsystem));
        SubsystemHandle {
            id,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.subsystems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subsystems.is_empty()
    }

    pub fn get<T: Subsystem>(&self, handle: SubsystemHandle<T>) -> Option<&T> {
        self.subsystems
            .get(handle.id.0)
            .and_then(|s| s.as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: Subsystem>(&mut self, handle: SubsystemHandle<T>) -> Option<&mut T> {
        self.subsystems
            .get_mut(handle.id.0)
            .and_then(|s| s.as_any_mut().downcast_mut::<T>())
    }

    /// Untyped access by id
    pub fn get_dyn(&self, id: SubsystemId) -> Option<&dyn Subsystem> {
        self.subsystems.get(id.0).map(|s| s.as_ref())
    }

    pub fn get_dyn_mut(&mut self, id: SubsystemId) -> Option<&mut (dyn Subsystem + 'static)> {
        self.subsystems.get_mut(id.0).map(|s| s.as_mut())
    }

    /// Look a subsystem up by its name
    pub fn find(&self, name: &str) -> Option<SubsystemId> {
        self.subsystems
            .iter()
            .position(|s| s.name() == name)
            .map(SubsystemId)
    }

    /// Lock a subsystem. Returns `true` only if it was unlocked before.
    pub fn lock<T: Subsystem>(&mut self, handle: SubsystemHandle<T>) -> bool {
        self.get_dyn_mut(handle.id).is_some_and(|s| s.lock())
    }

    /// Unlock a subsystem. Returns `true` only if it was locked before.
    pub fn unlock<T: Subsystem>(&mut self, handle: SubsystemHandle<T>) -> bool {
        self.get_dyn_mut(handle.id).is_some_and(|s| s.unlock())
    }

    pub fn is_locked<T: Subsystem>(&self, handle: SubsystemHandle<T>) -> bool {
        self.get_dyn(handle.id).is_some_and(|s| s.is_locked())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Subsystem> {
        self.subsystems.iter().map(|s| s.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut (dyn Subsystem + 'static)> {
        self.subsystems.iter_mut().map(|s| s.as_mut())
    }

    /// Run every pipeline in registration order
    pub fn pipeline_all(&mut self, intent: &Intent) {
        for subsystem in self.subsystems.iter_mut() {
            subsystem.pipeline(intent);
        }
    }

    pub fn reset_all(&mut self) {
        for subsystem in self.subsystems.iter_mut() {
            subsystem.reset();
        }
    }

    /// Number of currently locked subsystems
    pub fn locked_count(&self) -> usize {
        self.subsystems.iter().filter(|s| s.is_locked()).count()
    }
}

impl fmt::Debug for SubsystemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.subsystems.iter().map(|s| s.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystem::tests::Probe;
    use crate::subsystem::SubsystemConfig;

    #[test]
    fn test_typed_lookup() {
        let mut registry = SubsystemRegistry::new();
        let probe = registry.add(Probe::new(SubsystemConfig::default()));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(probe).map(|p| p.name()), Some("Probe"));
        assert_eq!(registry.find("Probe"), Some(probe.id()));
        assert_eq!(registry.find("Elevator"), None);
    }

    #[test]
    fn test_lock_through_registry() {
        let mut registry = SubsystemRegistry::new();
        let probe = registry.add(Probe::new(SubsystemConfig::default()));

        assert!(registry.lock(probe));
        assert!(!registry.lock(probe));
        assert!(registry.is_locked(probe));
        assert_eq!(registry.locked_count(), 1);
        assert_eq!(registry.get(probe).unwrap().locks, 1);

        assert!(registry.unlock(probe));
        assert_eq!(registry.locked_count(), 0);
    }

    #[test]
    fn test_pipeline_all_in_registration_order() {
        let mut registry = SubsystemRegistry::new();
        let first = registry.add(Probe::new(SubsystemConfig::default()));
        let second = registry.add(Probe::new(SubsystemConfig::default()));

        registry.pipeline_all(&Intent::default());

        assert_eq!(registry.get(first).unwrap().core().sequence(), 1);
        assert_eq!(registry.get(second).unwrap().core().sequence(), 1);
    }

    #[test]
    fn test_reset_all() {
        let mut registry = SubsystemRegistry::new();
        let probe = registry.add(Probe::new(SubsystemConfig::default()));
        registry.lock(probe);
        registry.pipeline_all(&Intent::default());

        registry.reset_all();

        let probe = registry.get(probe).unwrap();
        assert!(!probe.is_locked());
        assert_eq!(probe.resets, 1);
    }
}
