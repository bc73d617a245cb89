//! Exclusive ownership of kernel objects by display pipelines.
//!
//! The registry maps every claimed object to the pipeline that owns it and to
//! a weak reference to the [`BindingOwner`] handle. The claim lives exactly as
//! long as some strong reference to that handle exists.

use {
    crate::{
        hwc::{
            device::DeviceId,
            pipeline::PipelineId,
            resources::{KmsConnector, KmsCrtc, KmsEncoder, KmsPlane},
        },
        video::drm::{DrmConnector, DrmCrtc, DrmEncoder, DrmPlane},
    },
    ahash::AHashMap,
    parking_lot::Mutex,
    std::{
        fmt::{Debug, Formatter},
        ops::Deref,
        sync::{Arc, Weak},
    },
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ResourceKey {
    Connector(DeviceId, DrmConnector),
    Encoder(DeviceId, DrmEncoder),
    Crtc(DeviceId, DrmCrtc),
    Plane(DeviceId, DrmPlane),
}

pub trait Bindable {
    fn resource_key(&self) -> ResourceKey;
}

impl Bindable for KmsConnector {
    fn resource_key(&self) -> ResourceKey {
        ResourceKey::Connector(self.dev, self.id)
    }
}

impl Bindable for KmsEncoder {
    fn resource_key(&self) -> ResourceKey {
        ResourceKey::Encoder(self.dev, self.id)
    }
}

impl Bindable for KmsCrtc {
    fn resource_key(&self) -> ResourceKey {
        ResourceKey::Crtc(self.dev, self.id)
    }
}

impl Bindable for KmsPlane {
    fn resource_key(&self) -> ResourceKey {
        ResourceKey::Plane(self.dev, self.id)
    }
}

#[derive(Default)]
struct RegistryTable {
    entries: AHashMap<ResourceKey, Entry>,
    next_claim: u64,
}

struct Entry {
    pipeline: PipelineId,
    claim: u64,
    owner: Weak<BindingOwner>,
}

#[derive(Clone, Default)]
pub struct BindingRegistry {
    table: Arc<Mutex<RegistryTable>>,
}

impl Debug for BindingRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("entries", &self.table.lock().entries.len())
            .finish()
    }
}

impl BindingRegistry {
    /// Claims `res` for `pipeline`.
    ///
    /// Fails if a live owner exists and either belongs to another pipeline or
    /// `allow_rebind` is not set. Otherwise returns the existing owner handle
    /// or a new one.
    pub fn bind<T: Bindable>(
        &self,
        res: &Arc<T>,
        pipeline: PipelineId,
        allow_rebind: bool,
    ) -> Option<Bound<T>> {
        let key = res.resource_key();
        // Must be dropped after the guard. Dropping the last reference to an
        // owner takes the lock.
        let existing;
        let mut table = self.table.lock();
        existing = table.entries.get(&key).and_then(|e| e.owner.upgrade());
        if let Some(owner) = &existing {
            if owner.pipeline != pipeline || !allow_rebind {
                return None;
            }
            return Some(Bound {
                resource: res.clone(),
                owner: owner.clone(),
            });
        }
        table.next_claim += 1;
        let claim = table.next_claim;
        let owner = Arc::new(BindingOwner {
            key,
            pipeline,
            claim,
            registry: Arc::downgrade(&self.table),
        });
        table.entries.insert(
            key,
            Entry {
                pipeline,
                claim,
                owner: Arc::downgrade(&owner),
            },
        );
        Some(Bound {
            resource: res.clone(),
            owner,
        })
    }

    /// The pipeline that currently owns the resource, if any.
    pub fn owner_of(&self, key: ResourceKey) -> Option<PipelineId> {
        let table = self.table.lock();
        table
            .entries
            .get(&key)
            .filter(|e| e.owner.strong_count() > 0)
            .map(|e| e.pipeline)
    }

    pub fn is_bound(&self, key: ResourceKey) -> bool {
        self.owner_of(key).is_some()
    }

    pub fn len(&self) -> usize {
        let table = self.table.lock();
        table
            .entries
            .values()
            .filter(|e| e.owner.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ends every claim of `pipeline` even if handles to it are still alive.
    pub fn release_pipeline(&self, pipeline: PipelineId) {
        self.table
            .lock()
            .entries
            .retain(|_, e| e.pipeline != pipeline);
    }
}

/// A live claim on a resource. Dropping the last reference releases it.
pub struct BindingOwner {
    key: ResourceKey,
    pipeline: PipelineId,
    claim: u64,
    registry: Weak<Mutex<RegistryTable>>,
}

impl Debug for BindingOwner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingOwner")
            .field("key", &self.key)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl BindingOwner {
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    pub fn pipeline(&self) -> PipelineId {
        self.pipeline
    }
}

impl Drop for BindingOwner {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut table = registry.lock();
        if let Some(entry) = table.entries.get(&self.key)
            && entry.claim == self.claim
        {
            table.entries.remove(&self.key);
        }
    }
}

/// A resource together with the claim that makes it ours.
pub struct Bound<T> {
    resource: Arc<T>,
    owner: Arc<BindingOwner>,
}

impl<T> Clone for Bound<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            owner: self.owner.clone(),
        }
    }
}

impl<T> Deref for Bound<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.resource
    }
}

impl<T: Debug> Debug for Bound<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bound")
            .field("resource", &self.resource)
            .field("pipeline", &self.owner.pipeline)
            .finish()
    }
}

impl<T> Bound<T> {
    pub fn resource(&self) -> &Arc<T> {
        &self.resource
    }

    pub fn owner(&self) -> &Arc<BindingOwner> {
        &self.owner
    }
}
