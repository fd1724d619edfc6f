//! Directory of live sphere and panel handles.
//!
//! Keyed by sphere id and `(sphere id, panel index)`. Registration
//! happens at sphere creation; the coordinator removes its entries at
//! teardown. Lookups are concurrent (short read locks), and the registry
//! itself is cheap to clone and share.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::panel::PanelHandle;
use crate::sphere::{SphereError, SphereHandle, SphereId};

/// Concurrent name-to-handle directory for spheres and their panels.
pub struct Registry<T, D = ()> {
    inner: Arc<Inner<T, D>>,
}

struct Inner<T, D> {
    spheres: RwLock<HashMap<SphereId, SphereHandle<T, D>>>,
    panels: RwLock<HashMap<(SphereId, u8), PanelHandle<T, D>>>,
}

impl<T, D> Clone for Registry<T, D> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T, D> Default for Registry<T, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, D> Registry<T, D> {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                spheres: RwLock::new(HashMap::new()),
                panels: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Handle of a registered sphere.
    #[must_use]
    pub fn sphere(&self, id: SphereId) -> Option<SphereHandle<T, D>> {
        self.inner.spheres.read().unwrap_or_else(PoisonError::into_inner).get(&id).cloned()
    }

    /// Like [`Registry::sphere`] but with the unknown-sphere error.
    ///
    /// # Errors
    /// `UnknownSphere` if `id` is not registered.
    pub fn get(&self, id: SphereId) -> Result<SphereHandle<T, D>, SphereError> {
        self.sphere(id).ok_or(SphereError::UnknownSphere(id))
    }

    /// Handle of one panel worker of a registered sphere.
    #[must_use]
    pub fn panel(&self, id: SphereId, panel: u8) -> Option<PanelHandle<T, D>> {
        self.inner
            .panels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(id, panel))
            .cloned()
    }

    /// Ids of all registered spheres, in unspecified order.
    #[must_use]
    pub fn sphere_ids(&self) -> Vec<SphereId> {
        self.inner
            .spheres
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    pub(crate) fn register(&self, sphere: SphereHandle<T, D>, panels: Vec<PanelHandle<T, D>>) {
        let id = sphere.id();
        {
            let mut map = self.inner.panels.write().unwrap_or_else(PoisonError::into_inner);
            for p in panels {
                map.insert((id, p.panel_index()), p);
            }
        }
        self.inner.spheres.write().unwrap_or_else(PoisonError::into_inner).insert(id, sphere);
    }

    pub(crate) fn remove_sphere(&self, id: SphereId) {
        self.inner.spheres.write().unwrap_or_else(PoisonError::into_inner).remove(&id);
        self.inner
            .panels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|&(sid, _), _| sid != id);
    }
}
