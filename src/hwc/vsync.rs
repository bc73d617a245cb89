use {
    crate::{
        hwc::HwcError,
        time::{self, now_nsec},
        utils::errorfmt::ErrorFmt,
        video::drm::DrmDevice,
    },
    parking_lot::{Condvar, Mutex},
    std::{
        sync::{
            Arc,
            atomic::{AtomicI64, Ordering::Relaxed},
        },
        thread::{self, JoinHandle},
    },
};

/// Used for synthetic vsyncs before a mode has been committed.
pub const DEFAULT_FRAME_PERIOD_NS: i64 = 16_666_667;

pub type VsyncCallback = Arc<dyn Fn(i64) + Send + Sync>;

/// The smallest `last + k * frame` strictly after `now`, or `now + frame` if
/// there is no previous timestamp.
pub fn next_phased_vsync(last: Option<i64>, frame: i64, now: i64) -> i64 {
    match last {
        None => now + frame,
        Some(last) => frame * ((now - last).div_euclid(frame) + 1) + last,
    }
}

#[derive(Default)]
struct VsyncState {
    enabled: bool,
    exit: bool,
    last: Option<i64>,
    /// Incremented by every `enable` call. Timestamps observed across a
    /// change are discarded.
    generation: u64,
    callback: Option<VsyncCallback>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<VsyncState>,
    cond: Condvar,
}

/// Produces vsync timestamps for one CRTC on a dedicated thread.
pub struct VsyncWorker {
    shared: Arc<Shared>,
    frame_period: Arc<AtomicI64>,
    thread: Option<JoinHandle<()>>,
}

impl VsyncWorker {
    pub fn new(
        drm: &Arc<dyn DrmDevice>,
        crtc_index: usize,
        frame_period: &Arc<AtomicI64>,
    ) -> Result<Self, HwcError> {
        let shared = Arc::new(Shared::default());
        let thread = thread::Builder::new()
            .name(format!("vsync-{}", crtc_index))
            .spawn({
                let shared = shared.clone();
                let drm = drm.clone();
                let frame_period = frame_period.clone();
                move || run(&shared, &*drm, crtc_index, &frame_period)
            })
            .map_err(|e| HwcError::SpawnThread("vsync", e))?;
        Ok(Self {
            shared,
            frame_period: frame_period.clone(),
            thread: Some(thread),
        })
    }

    /// Starts or stops the timestamp stream. Phase is re-established from
    /// scratch in both cases.
    pub fn enable(&self, enabled: bool) {
        let mut state = self.shared.state.lock();
        state.enabled = enabled;
        state.last = None;
        state.generation += 1;
        self.shared.cond.notify_all();
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.state.lock().enabled
    }

    pub fn set_callback(&self, callback: Option<VsyncCallback>) {
        self.shared.state.lock().callback = callback;
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.shared.state.lock().last
    }

    pub fn frame_period_ns(&self) -> i64 {
        self.frame_period.load(Relaxed)
    }
}

impl Drop for VsyncWorker {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.exit = true;
            state.callback = None;
        }
        self.shared.cond.notify_all();
        if let Some(thread) = self.thread.take() {
            // The last reference might be released by the callback itself.
            if thread.thread().id() == thread::current().id() {
                return;
            }
            if thread.join().is_err() {
                log::error!("The vsync thread panicked");
            }
        }
    }
}

fn run(shared: &Shared, drm: &dyn DrmDevice, crtc_index: usize, frame_period: &AtomicI64) {
    let mut logged_hw_failure = false;
    loop {
        let (last, generation) = {
            let mut state = shared.state.lock();
            while !state.enabled && !state.exit {
                shared.cond.wait(&mut state);
            }
            if state.exit {
                return;
            }
            (state.last, state.generation)
        };
        let timestamp = match drm.wait_vblank(crtc_index) {
            Ok(ts) => {
                logged_hw_failure = false;
                Some(ts)
            }
            Err(e) => {
                if !logged_hw_failure {
                    log::debug!(
                        "Falling back to synthetic vsync on CRTC {}: {}",
                        crtc_index,
                        ErrorFmt(e)
                    );
                    logged_hw_failure = true;
                }
                None
            }
        };
        let mut state = shared.state.lock();
        let timestamp = match timestamp {
            Some(ts) => ts,
            None => {
                let mut frame = frame_period.load(Relaxed);
                if frame <= 0 {
                    frame = DEFAULT_FRAME_PERIOD_NS;
                }
                let target = next_phased_vsync(last, frame, now_nsec());
                while !state.exit && state.generation == generation {
                    match time::until(target) {
                        Some(d) => {
                            shared.cond.wait_for(&mut state, d);
                        }
                        None => break,
                    }
                }
                target
            }
        };
        if state.exit || !state.enabled || state.generation != generation {
            continue;
        }
        state.last = Some(timestamp);
        let callback = state.callback.clone();
        drop(state);
        if let Some(cb) = callback {
            cb(timestamp);
        }
    }
}

#[cfg(test)]
mod tests;
