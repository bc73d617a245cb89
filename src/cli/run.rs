use {
    crate::{
        cli::{GlobalArgs, RunArgs, setup},
        format::XRGB8888,
        hwc::{
            HwcError,
            atomic::AtomicCommitArgs,
            layer::LayerData,
            manager::{Frontend, ResourceManager},
            pipeline::{DisplayPipeline, PipelineId},
        },
        utils::errorfmt::ErrorFmt,
        video::drm::DrmError,
    },
    ahash::AHashMap,
    parking_lot::Mutex,
    std::{sync::Arc, thread},
    thiserror::Error,
};

/// The colors of the test pattern, one per display in attach order.
const COLORS: [u32; 4] = [0x00_33_66_99, 0x00_99_33_66, 0x00_66_99_33, 0x00_80_80_80];

#[derive(Debug, Error)]
enum LightUpError {
    #[error("The connector has no modes")]
    NoMode,
    #[error("The device was not opened from a device node")]
    NoMaster,
    #[error("Could not allocate a framebuffer")]
    CreateFb(#[source] DrmError),
    #[error("The primary plane cannot show the framebuffer")]
    NoPlan,
    #[error(transparent)]
    Commit(#[from] HwcError),
}

/// Shows a solid color on every display it is given.
#[derive(Default)]
struct TestPatternFrontend {
    displays: Mutex<AHashMap<PipelineId, Arc<DisplayPipeline>>>,
    attached: Mutex<usize>,
}

impl TestPatternFrontend {
    fn light_up(&self, pipe: &DisplayPipeline) -> Result<(), LightUpError> {
        let mode = pipe.connector.preferred_mode().ok_or(LightUpError::NoMode)?;
        let master = pipe.device.master.as_ref().ok_or(LightUpError::NoMaster)?;
        let width = mode.info.hdisplay as u32;
        let height = mode.info.vdisplay as u32;
        let mut fb = master
            .create_dumb_framebuffer(width, height)
            .map_err(LightUpError::CreateFb)?;
        let color = {
            let mut attached = self.attached.lock();
            *attached += 1;
            COLORS[(*attached - 1) % COLORS.len()]
        };
        fb.fill(color);
        let layer = LayerData::new(Arc::new(fb), XRGB8888.drm, width as i32, height as i32);
        let plan = pipe.create_plan(&[layer]).ok_or(LightUpError::NoPlan)?;
        pipe.commit(AtomicCommitArgs {
            display_mode: Some(mode.clone()),
            composition: Some(Arc::new(plan)),
            ..Default::default()
        })?;
        log::info!("Display {}: {}", pipe.name(), mode.info);
        let name = pipe.name();
        pipe.set_vsync_callback(Some(Arc::new(move |ts| {
            log::trace!("{}: vsync at {}", name, ts);
        })));
        pipe.enable_vsync(true);
        Ok(())
    }
}

impl Frontend for TestPatternFrontend {
    fn on_display_attached(&self, pipeline: &Arc<DisplayPipeline>) -> bool {
        log::info!("Display {} ({}) attached", pipeline.id, pipeline.name());
        if let Err(e) = self.light_up(pipeline) {
            log::error!("Could not light up {}: {}", pipeline.name(), ErrorFmt(e));
            return false;
        }
        self.displays.lock().insert(pipeline.id, pipeline.clone());
        true
    }

    fn on_display_detached(&self, pipeline: &Arc<DisplayPipeline>) -> bool {
        log::info!("Display {} ({}) detached", pipeline.id, pipeline.name());
        self.displays.lock().remove(&pipeline.id).is_some()
    }

    fn on_reconciliation_finished(&self) {
        log::info!("{} displays lit", self.displays.lock().len());
    }
}

pub fn main(global: GlobalArgs, args: RunArgs) {
    let (_logger, mut config) = setup(&global);
    if !args.device.is_empty() {
        config.devices = args.device;
    }
    if args.no_overlay_planes {
        config.use_overlay_planes = false;
    }
    if args.no_hotplug {
        config.hotplug = false;
    }
    let frontend = Arc::new(TestPatternFrontend::default());
    let manager = ResourceManager::new(frontend, config.use_overlay_planes);
    if let Err(e) = manager.open_devices(&config.devices) {
        fatal!("Could not open a DRM device: {}", ErrorFmt(e));
    }
    manager.reconcile();
    if config.hotplug
        && let Err(e) = manager.start_hotplug()
    {
        log::error!("Hotplug is unavailable: {}", ErrorFmt(e));
    }
    if let Some(primary) = manager.primary_display() {
        log::info!("Primary display: {}", primary.name());
    }
    loop {
        thread::park();
    }
}
