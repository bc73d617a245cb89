use {
    crate::{
        hwc::{
            HwcError,
            binding::Bound,
            buffer::Framebuffer,
            pipeline::DisplayPipeline,
            plan::CompositionPlan,
            resources::{KmsMode, KmsPlane},
        },
        utils::errorfmt::ErrorFmt,
        video::drm::{
            Change, DRM_MODE_ATOMIC_ALLOW_MODESET, DRM_MODE_ATOMIC_TEST_ONLY, PropBlob,
        },
    },
    std::sync::{Arc, atomic::Ordering::Relaxed},
    uapi::{OwnedFd, c},
};

/// The changes to apply in one atomic commit. Unset fields keep their
/// current state.
#[derive(Clone, Debug, Default)]
pub struct AtomicCommitArgs {
    pub active: Option<bool>,
    pub display_mode: Option<Arc<KmsMode>>,
    pub composition: Option<Arc<CompositionPlan>>,
    /// Only ask the kernel whether the commit would succeed.
    pub test_only: bool,
}

impl AtomicCommitArgs {
    pub fn has_inputs(&self) -> bool {
        self.active.is_some() || self.display_mode.is_some() || self.composition.is_some()
    }
}

/// The state of the last successful commit.
#[derive(Clone, Default)]
struct KmsState {
    used_planes: Vec<Bound<KmsPlane>>,
    /// Kept until a later frame replaces them on screen.
    used_framebuffers: Vec<Arc<dyn Framebuffer>>,
    mode_blob: Option<Arc<PropBlob>>,
    active_mode: Option<Arc<KmsMode>>,
    crtc_active: bool,
}

#[derive(Default)]
pub struct AtomicStateManager {
    state: KmsState,
}

impl AtomicStateManager {
    pub fn is_active(&self) -> bool {
        self.state.crtc_active
    }

    /// Builds and submits one atomic commit for `pipe`.
    ///
    /// Test-only commits never modify the stored state.
    pub fn commit_frame(
        &mut self,
        pipe: &DisplayPipeline,
        mut args: AtomicCommitArgs,
    ) -> Result<(), HwcError> {
        if args.active == Some(self.state.crtc_active) {
            args.active = None;
        }
        if !args.has_inputs() {
            return Ok(());
        }
        if !self.state.crtc_active {
            args.active = Some(true);
        }

        let drm = &pipe.device.drm;
        let crtc = &pipe.crtc;
        let connector = &pipe.connector;
        let mut new = self.state.clone();
        let mut change = Change::new();

        if let Some(active) = args.active {
            new.crtc_active = active;
            change.change_object(crtc.id, |c| crtc.active.set(c, active as u64));
        }

        if let Some(mode) = &args.display_mode {
            let blob = mode.info.create_blob(drm).map_err(HwcError::CreateModeBlob)?;
            change.change_object(crtc.id, |c| crtc.mode_id.set(c, blob.id().0 as u64));
            change.change_object(connector.id, |c| {
                connector.crtc_id.set(c, crtc.id.0 as u64)
            });
            new.mode_blob = Some(Arc::new(blob));
            new.active_mode = Some(mode.clone());
        }

        let mut out_fence: c::c_int = -1;
        if let Some(prop) = &crtc.out_fence_ptr
            && new.crtc_active
            && !args.test_only
        {
            let ptr = &raw mut out_fence;
            change.change_object(crtc.id, |c| prop.set(c, ptr as usize as u64));
        }

        if let Some(plan) = &args.composition {
            let mut used_planes = Vec::with_capacity(plan.entries.len());
            new.used_framebuffers.clear();
            for entry in &plan.entries {
                entry
                    .plane
                    .atomic_set(&mut change, crtc, &entry.layer, entry.zpos)?;
                used_planes.push(entry.plane.clone());
                new.used_framebuffers.push(entry.layer.fb.clone());
            }
            for old in &self.state.used_planes {
                if !used_planes.iter().any(|p| p.id == old.id) {
                    old.atomic_disable(&mut change);
                }
            }
            new.used_planes = used_planes;
        }

        let mut flags = DRM_MODE_ATOMIC_ALLOW_MODESET;
        if args.test_only {
            flags |= DRM_MODE_ATOMIC_TEST_ONLY;
        }
        let res = drm.commit(&change, flags);
        if out_fence >= 0 {
            // Nothing waits on the CRTC's fences.
            drop(OwnedFd::new(out_fence));
        }
        res.map_err(HwcError::Commit)?;

        if !args.test_only {
            if args.display_mode.is_some()
                && let Some(mode) = &new.active_mode
            {
                pipe.frame_period.store(mode.info.frame_period_ns(), Relaxed);
                connector.set_active_mode(Some(mode.clone()));
            }
            self.state = new;
        }
        Ok(())
    }

    /// Like [`Self::commit_frame`], but a failed real commit is followed by a
    /// commit with an empty composition. This disables all planes and
    /// signals the release fences of the buffers they showed.
    pub fn execute_atomic_commit(
        &mut self,
        pipe: &DisplayPipeline,
        args: AtomicCommitArgs,
    ) -> Result<(), HwcError> {
        let test_only = args.test_only;
        let Err(e) = self.commit_frame(pipe, args) else {
            return Ok(());
        };
        if test_only {
            return Err(e);
        }
        log::error!("Commit on display {} failed: {}", pipe.name(), ErrorFmt(&e));
        let cleanup = AtomicCommitArgs {
            composition: Some(Arc::new(CompositionPlan::empty())),
            ..Default::default()
        };
        if let Err(e) = self.commit_frame(pipe, cleanup) {
            log::error!(
                "Could not disable the planes of display {}: {}",
                pipe.name(),
                ErrorFmt(e)
            );
        }
        Err(e)
    }
}

#[cfg(test)]
mod tests;
