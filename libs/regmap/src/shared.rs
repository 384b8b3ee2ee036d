//! Shared device model
//!
//! Readers and the poll cycle share one model behind a `parking_lot` read/write
//! lock. The poller never decodes under the lock: it decodes into a private
//! staging copy and publishes the finished copy with one short write-locked
//! `refresh`, so readers see either the previous cycle or the next, never a mix.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::Result;
use crate::model::{DeviceModel, DeviceSnapshot};
use crate::schema::DeviceKind;
use crate::status::{Status, StatusCode};

/// Cloneable handle to a lock-guarded device model
pub struct SharedModel<K: DeviceKind> {
    inner: Arc<RwLock<DeviceModel<K>>>,
}

impl<K: DeviceKind> SharedModel<K> {
    pub fn new() -> Result<Self> {
        Ok(Self::from_model(DeviceModel::new()?))
    }

    pub fn from_model(model: DeviceModel<K>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(model)),
        }
    }

    /// Run `f` against a consistent view of the model
    ///
    /// Hold the closure short; the poller waits on it to publish.
    pub fn read<R>(&self, f: impl FnOnce(&DeviceModel<K>) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` with exclusive access
    pub fn write<R>(&self, f: impl FnOnce(&mut DeviceModel<K>) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Private copy to decode into
    pub fn staging(&self) -> DeviceModel<K> {
        self.inner.read().clone()
    }

    /// Replace values and status with a fully decoded staging copy
    pub fn publish(&self, staged: &DeviceModel<K>) {
        self.inner.write().refresh(Some(staged));
    }

    /// Record a failed cycle: values kept, status set to `code`
    pub fn mark(&self, code: StatusCode) {
        self.inner.write().mark(code);
    }

    pub fn status(&self) -> Status {
        self.inner.read().status().clone()
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        self.inner.read().snapshot()
    }
}

impl<K: DeviceKind> Clone for SharedModel<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
