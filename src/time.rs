use {
    std::{
        fmt::{Debug, Formatter},
        time::Duration,
    },
    uapi::c,
};

/// A CLOCK_MONOTONIC timestamp. This is the clock the kernel uses for vblank
/// timestamps.
#[derive(Copy, Clone)]
pub struct Time(pub c::timespec);

impl Debug for Time {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Time")
            .field("tv_sec", &self.0.tv_sec)
            .field("tv_nsec", &self.0.tv_nsec)
            .finish()
    }
}

impl Time {
    pub fn now_unchecked() -> Time {
        let mut time = uapi::pod_zeroed();
        let _ = uapi::clock_gettime(c::CLOCK_MONOTONIC, &mut time);
        Self(time)
    }

    pub fn nsec(self) -> i64 {
        self.0.tv_sec as i64 * 1_000_000_000 + self.0.tv_nsec as i64
    }
}

pub fn now_nsec() -> i64 {
    Time::now_unchecked().nsec()
}

/// The time left until the monotonic instant `target_ns`, or `None` if it has
/// already passed.
pub fn until(target_ns: i64) -> Option<Duration> {
    let now = now_nsec();
    if target_ns <= now {
        return None;
    }
    Some(Duration::from_nanos((target_ns - now) as u64))
}
