use {
    crate::{
        hwc::{
            HwcError,
            atomic::{AtomicCommitArgs, AtomicStateManager},
            binding::{BindingRegistry, Bound},
            device::KmsDevice,
            layer::LayerData,
            plan::CompositionPlan,
            resources::{KmsConnector, KmsCrtc, KmsEncoder, KmsMode, KmsPlane, PlaneType},
            vsync::{VsyncCallback, VsyncWorker},
        },
        utils::errorfmt::ErrorFmt,
    },
    parking_lot::Mutex,
    std::{
        fmt::{Debug, Formatter},
        sync::{
            Arc,
            atomic::{AtomicBool, AtomicI64, Ordering::Relaxed},
        },
    },
};

linear_ids!(PipelineIds, PipelineId);

/// A connector driven by an encoder and a CRTC with its primary plane.
///
/// All four objects are claimed for the lifetime of the pipeline.
pub struct DisplayPipeline {
    pub id: PipelineId,
    pub device: Arc<KmsDevice>,
    pub connector: Bound<KmsConnector>,
    pub encoder: Bound<KmsEncoder>,
    pub crtc: Bound<KmsCrtc>,
    pub primary_plane: Bound<KmsPlane>,
    pub(super) frame_period: Arc<AtomicI64>,
    atomic: Mutex<AtomicStateManager>,
    vsync: VsyncWorker,
    registry: BindingRegistry,
    use_overlay_planes: bool,
    retired: AtomicBool,
}

impl Debug for DisplayPipeline {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayPipeline")
            .field("id", &self.id)
            .field("connector", &self.connector.name())
            .field("encoder", &self.encoder.id)
            .field("crtc", &self.crtc.id)
            .field("primary_plane", &self.primary_plane.id)
            .finish_non_exhaustive()
    }
}

/// Finds and claims a usable encoder, CRTC and primary plane for
/// `connector`.
///
/// The routing the kernel currently uses is preferred. Returns `None` if no
/// combination can be claimed.
pub fn create_pipeline(
    id: PipelineId,
    device: &Arc<KmsDevice>,
    connector: &Arc<KmsConnector>,
    registry: &BindingRegistry,
    use_overlay_planes: bool,
) -> Option<Arc<DisplayPipeline>> {
    let res = &device.res;
    let Some(bound_connector) = registry.bind(connector, id, false) else {
        log::warn!("Connector {} is already in use", connector.name());
        return None;
    };
    let mut encoders = vec![];
    if let Some(e) = res.encoder(connector.current_encoder()) {
        encoders.push(e);
    }
    for enc in &connector.encoders {
        if let Some(e) = res.encoder(*enc)
            && !encoders.iter().any(|o| o.id == e.id)
        {
            encoders.push(e);
        }
    }
    for encoder in encoders {
        let Some(bound_encoder) = registry.bind(encoder, id, false) else {
            continue;
        };
        let mut crtcs = vec![];
        if let Some(c) = res.crtc(encoder.current_crtc())
            && encoder.supports_crtc(c)
        {
            crtcs.push(c);
        }
        for c in &res.crtcs {
            if encoder.supports_crtc(c) && !crtcs.iter().any(|o| o.id == c.id) {
                crtcs.push(c);
            }
        }
        for crtc in crtcs {
            let Some(bound_crtc) = registry.bind(crtc, id, false) else {
                continue;
            };
            let primaries: Vec<_> = res
                .planes
                .iter()
                .filter(|p| p.ty == PlaneType::Primary && p.supports_crtc(crtc))
                .collect();
            if primaries.len() != 1 {
                log::error!(
                    "CRTC {} has {} primary planes, expected exactly 1",
                    crtc.id,
                    primaries.len()
                );
                continue;
            }
            let Some(bound_primary) = registry.bind(primaries[0], id, false) else {
                continue;
            };
            let frame_period = Arc::new(AtomicI64::new(0));
            let vsync = match VsyncWorker::new(&device.drm, crtc.index, &frame_period) {
                Ok(v) => v,
                Err(e) => {
                    log::error!("Could not create a vsync worker: {}", ErrorFmt(e));
                    return None;
                }
            };
            log::info!(
                "Display {}: connector {} -> encoder {} -> CRTC {} (primary plane {})",
                id,
                connector.name(),
                encoder.id,
                crtc.id,
                primaries[0].id,
            );
            return Some(Arc::new(DisplayPipeline {
                id,
                device: device.clone(),
                connector: bound_connector,
                encoder: bound_encoder,
                crtc: bound_crtc,
                primary_plane: bound_primary,
                frame_period,
                atomic: Default::default(),
                vsync,
                registry: registry.clone(),
                use_overlay_planes,
                retired: AtomicBool::new(false),
            }));
        }
    }
    log::error!(
        "Could not find a usable encoder and CRTC for connector {}",
        connector.name()
    );
    None
}

impl DisplayPipeline {
    pub fn name(&self) -> String {
        self.connector.name()
    }

    /// The planes this pipeline may use for the next frame, primary first.
    ///
    /// Overlay planes not owned by another display are claimed as a side
    /// effect. The claim ends when the last handle is dropped.
    pub fn usable_planes(&self) -> Vec<Bound<KmsPlane>> {
        let mut planes = vec![self.primary_plane.clone()];
        if self.use_overlay_planes {
            for plane in &self.device.res.planes {
                if plane.ty != PlaneType::Overlay || !plane.supports_crtc(&self.crtc) {
                    continue;
                }
                if let Some(bound) = self.registry.bind(plane, self.id, true) {
                    planes.push(bound);
                }
            }
        }
        planes
    }

    pub fn create_plan(&self, layers: &[LayerData]) -> Option<CompositionPlan> {
        // Holding the commit lock orders this against `retire`.
        let _atomic = self.atomic.lock();
        if self.is_retired() {
            return None;
        }
        CompositionPlan::create(layers, self.usable_planes())
    }

    /// Commits a frame. A failed real commit is followed by a commit that
    /// disables all planes.
    pub fn commit(&self, args: AtomicCommitArgs) -> Result<(), HwcError> {
        let mut atomic = self.atomic.lock();
        if self.is_retired() {
            return Err(HwcError::DisplayRetired(self.id));
        }
        atomic.execute_atomic_commit(self, args)
    }

    pub fn is_active(&self) -> bool {
        self.atomic.lock().is_active()
    }

    pub fn modes(&self) -> Vec<Arc<KmsMode>> {
        self.connector.modes()
    }

    pub fn active_mode(&self) -> Option<Arc<KmsMode>> {
        self.connector.active_mode()
    }

    pub fn frame_period_ns(&self) -> i64 {
        self.frame_period.load(Relaxed)
    }

    pub fn set_vsync_callback(&self, callback: Option<VsyncCallback>) {
        self.vsync.set_callback(callback);
    }

    pub fn enable_vsync(&self, enabled: bool) {
        self.vsync.enable(enabled);
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Relaxed)
    }

    /// Detaches the pipeline from the display. Further operations fail with
    /// `DisplayRetired` and the claimed objects become available to new
    /// pipelines.
    pub(super) fn retire(&self) {
        {
            let mut atomic = self.atomic.lock();
            if self.retired.swap(true, Relaxed) {
                return;
            }
            self.vsync.enable(false);
            self.vsync.set_callback(None);
            if atomic.is_active() {
                let args = AtomicCommitArgs {
                    active: Some(false),
                    composition: Some(Arc::new(CompositionPlan::empty())),
                    ..Default::default()
                };
                if let Err(e) = atomic.commit_frame(self, args) {
                    log::warn!("Could not disable display {}: {}", self.name(), ErrorFmt(e));
                }
            }
        }
        self.registry.release_pipeline(self.id);
    }
}
