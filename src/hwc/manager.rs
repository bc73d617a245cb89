//! Device ownership and the mapping of connected connectors to displays.

use {
    crate::{
        hwc::{
            HwcError,
            atomic::AtomicCommitArgs,
            binding::BindingRegistry,
            device::{DeviceId, DeviceIds, KmsDevice, scan_devices},
            hotplug::HotplugListener,
            layer::LayerData,
            pipeline::{DisplayPipeline, PipelineId, PipelineIds, create_pipeline},
            plan::CompositionPlan,
            resources::{KmsConnector, KmsMode},
            vsync::VsyncCallback,
        },
        utils::errorfmt::ErrorFmt,
        video::drm::{DrmConnector, DrmDevice},
    },
    indexmap::IndexMap,
    parking_lot::Mutex,
    std::{
        mem,
        sync::{Arc, Weak},
    },
};

/// The consumer of display lifecycle events.
///
/// Callbacks are invoked without any lock of the manager held and may call
/// back into the manager.
pub trait Frontend: Send + Sync {
    /// Returns whether the frontend accepted the display.
    fn on_display_attached(&self, pipeline: &Arc<DisplayPipeline>) -> bool;

    /// Returns whether the frontend knew the display.
    fn on_display_detached(&self, pipeline: &Arc<DisplayPipeline>) -> bool;

    fn on_reconciliation_finished(&self) {}
}

enum Event {
    Attached(Arc<DisplayPipeline>),
    Detached(Arc<DisplayPipeline>),
}

type ConnectorKey = (DeviceId, DrmConnector);

#[derive(Default)]
struct ManagerState {
    devices: Vec<Arc<KmsDevice>>,
    attached: IndexMap<ConnectorKey, Arc<DisplayPipeline>>,
    primary: Option<PipelineId>,
    /// Detached pipelines that might still be referenced elsewhere.
    retired: Vec<Arc<DisplayPipeline>>,
}

struct ManagerShared {
    state: Mutex<ManagerState>,
    frontend: Arc<dyn Frontend>,
    registry: BindingRegistry,
    device_ids: DeviceIds,
    pipeline_ids: PipelineIds,
    use_overlay_planes: bool,
}

/// Owns the DRM devices and keeps one [`DisplayPipeline`] per connected
/// connector.
pub struct ResourceManager {
    shared: Arc<ManagerShared>,
    hotplug: Mutex<Option<HotplugListener>>,
}

impl ResourceManager {
    pub fn new(frontend: Arc<dyn Frontend>, use_overlay_planes: bool) -> Self {
        Self {
            shared: Arc::new(ManagerShared {
                state: Default::default(),
                frontend,
                registry: Default::default(),
                device_ids: Default::default(),
                pipeline_ids: Default::default(),
                use_overlay_planes,
            }),
            hotplug: Default::default(),
        }
    }

    /// Opens the given device nodes or, if there are none, every node in
    /// /dev/dri. Devices that cannot be used are skipped.
    pub fn open_devices(&self, paths: &[String]) -> Result<usize, HwcError> {
        let scanned;
        let paths = match paths.is_empty() {
            true => {
                scanned = scan_devices()?;
                &scanned[..]
            }
            false => paths,
        };
        let mut opened = 0;
        for path in paths {
            let id = self.shared.device_ids.next();
            match KmsDevice::open(id, path) {
                Ok(dev) => {
                    self.shared.state.lock().devices.push(Arc::new(dev));
                    opened += 1;
                }
                Err(e) => log::warn!("Could not use {}: {}", path, ErrorFmt(e)),
            }
        }
        if opened == 0 {
            return Err(HwcError::NoDevices);
        }
        Ok(opened)
    }

    /// Adds a device that has already been opened.
    pub fn add_device(&self, name: &str, drm: Arc<dyn DrmDevice>) -> Result<DeviceId, HwcError> {
        let id = self.shared.device_ids.next();
        let dev = KmsDevice::new(id, name, drm)?;
        self.shared.state.lock().devices.push(Arc::new(dev));
        Ok(id)
    }

    pub fn devices(&self) -> Vec<Arc<KmsDevice>> {
        self.shared.state.lock().devices.clone()
    }

    /// Starts reconciling on every DRM hotplug event.
    pub fn start_hotplug(&self) -> Result<(), HwcError> {
        let shared = Arc::downgrade(&self.shared);
        let listener = HotplugListener::start(move || {
            if let Some(shared) = Weak::upgrade(&shared) {
                shared.reconcile();
            }
        })?;
        *self.hotplug.lock() = Some(listener);
        Ok(())
    }

    /// Brings the displays in line with the connection state of every
    /// connector.
    pub fn reconcile(&self) {
        self.shared.reconcile();
    }

    pub fn pipeline(&self, id: PipelineId) -> Result<Arc<DisplayPipeline>, HwcError> {
        self.shared.state.lock().pipeline(id).cloned()
    }

    pub fn primary_display(&self) -> Option<Arc<DisplayPipeline>> {
        let state = self.shared.state.lock();
        let id = state.primary?;
        state.pipeline(id).ok().cloned()
    }

    /// The attached displays, internal panels first.
    pub fn displays(&self) -> Vec<Arc<DisplayPipeline>> {
        let state = self.shared.state.lock();
        let mut displays: Vec<_> = state.attached.values().cloned().collect();
        displays.sort_by_key(|p| !p.connector.is_internal());
        displays
    }

    pub fn modes(&self, id: PipelineId) -> Result<Vec<Arc<KmsMode>>, HwcError> {
        Ok(self.shared.state.lock().pipeline(id)?.modes())
    }

    /// Maps `layers` onto the planes of a display. Returns `None` if the
    /// hardware cannot show them.
    pub fn create_plan(
        &self,
        id: PipelineId,
        layers: &[LayerData],
    ) -> Result<Option<CompositionPlan>, HwcError> {
        Ok(self.shared.state.lock().pipeline(id)?.create_plan(layers))
    }

    pub fn commit(&self, id: PipelineId, args: AtomicCommitArgs) -> Result<(), HwcError> {
        let state = self.shared.state.lock();
        state.pipeline(id)?.commit(args)
    }

    pub fn set_vsync_callback(
        &self,
        id: PipelineId,
        callback: Option<VsyncCallback>,
    ) -> Result<(), HwcError> {
        self.shared
            .state
            .lock()
            .pipeline(id)?
            .set_vsync_callback(callback);
        Ok(())
    }

    pub fn enable_vsync(&self, id: PipelineId, enabled: bool) -> Result<(), HwcError> {
        self.shared.state.lock().pipeline(id)?.enable_vsync(enabled);
        Ok(())
    }

    /// The number of detached displays still referenced elsewhere.
    pub fn retired_len(&self) -> usize {
        self.shared.state.lock().retired.len()
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        let listener = self.hotplug.lock().take();
        drop(listener);
    }
}

impl ManagerState {
    fn pipeline(&self, id: PipelineId) -> Result<&Arc<DisplayPipeline>, HwcError> {
        if let Some(p) = self.attached.values().find(|p| p.id == id) {
            return Ok(p);
        }
        if self.retired.iter().any(|p| p.id == id) {
            return Err(HwcError::DisplayRetired(id));
        }
        Err(HwcError::UnknownDisplay(id))
    }

    /// Every non-writeback connector, internal ones first.
    fn connectors(&self) -> Vec<(Arc<KmsDevice>, Arc<KmsConnector>)> {
        let mut connectors = vec![];
        for dev in &self.devices {
            for connector in &dev.res.connectors {
                if !connector.is_writeback() {
                    connectors.push((dev.clone(), connector.clone()));
                }
            }
        }
        connectors.sort_by_key(|(_, c)| !c.is_internal());
        connectors
    }

    fn reconcile(&mut self, shared: &ManagerShared, events: &mut Vec<Event>) {
        for dev in &self.devices {
            for encoder in &dev.res.encoders {
                if let Err(e) = encoder.refresh(&*dev.drm) {
                    log::error!(
                        "Could not update encoder {}: {}",
                        encoder.id,
                        ErrorFmt(HwcError::QueryEncoder(e)),
                    );
                }
            }
        }
        let connectors = self.connectors();
        for (dev, connector) in &connectors {
            if let Err(e) = connector.update_modes(&*dev.drm) {
                log::error!(
                    "Could not update connector {}: {}",
                    connector.name(),
                    ErrorFmt(HwcError::QueryConnector(e)),
                );
            }
        }
        // Detach first so that the objects of removed displays can be reused.
        for (dev, connector) in &connectors {
            let key = (dev.id, connector.id);
            if connector.is_connected() {
                continue;
            }
            let Some(pipeline) = self.attached.shift_remove(&key) else {
                continue;
            };
            log::info!("Display {} ({}) disconnected", pipeline.id, connector.name());
            pipeline.retire();
            if self.primary == Some(pipeline.id) {
                self.primary = None;
            }
            self.retired.push(pipeline.clone());
            events.push(Event::Detached(pipeline));
        }
        for (dev, connector) in &connectors {
            let key = (dev.id, connector.id);
            if !connector.is_connected() || self.attached.contains_key(&key) {
                continue;
            }
            let id = shared.pipeline_ids.next();
            let Some(pipeline) = create_pipeline(
                id,
                dev,
                connector,
                &shared.registry,
                shared.use_overlay_planes,
            ) else {
                continue;
            };
            self.attached.insert(key, pipeline.clone());
            events.push(Event::Attached(pipeline));
        }
        if self.primary.is_none() {
            self.primary = connectors
                .iter()
                .find_map(|(dev, c)| self.attached.get(&(dev.id, c.id)))
                .map(|p| p.id);
            if let Some(id) = self.primary {
                log::info!("Display {} is now the primary display", id);
            }
        }
    }

    /// Takes the retired pipelines nobody else references.
    fn take_unreferenced(&mut self) -> Vec<Arc<DisplayPipeline>> {
        let (dead, alive): (Vec<_>, Vec<_>) = mem::take(&mut self.retired)
            .into_iter()
            .partition(|p| Arc::strong_count(p) == 1);
        self.retired = alive;
        dead
    }
}

impl ManagerShared {
    fn reconcile(&self) {
        let mut events = vec![];
        self.state.lock().reconcile(self, &mut events);
        for event in &events {
            match event {
                Event::Attached(p) => {
                    if !self.frontend.on_display_attached(p) {
                        log::warn!("The frontend did not accept display {}", p.id);
                    }
                }
                Event::Detached(p) => {
                    if !self.frontend.on_display_detached(p) {
                        log::warn!("The frontend did not know display {}", p.id);
                    }
                }
            }
        }
        self.frontend.on_reconciliation_finished();
        drop(events);
        // Dropping a pipeline joins its vsync thread. Do it without the lock.
        let dead = self.state.lock().take_unreferenced();
        drop(dead);
    }
}
