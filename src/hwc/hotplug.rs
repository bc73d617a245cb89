//! Listens for kernel uevents announcing connector changes.

use {
    crate::{
        hwc::HwcError,
        utils::{errorfmt::ErrorFmt, oserror::OsError},
    },
    bstr::ByteSlice,
    std::{
        mem,
        slice,
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering::Relaxed},
        },
        thread::{self, JoinHandle},
    },
    uapi::{Errno, OwnedFd, c},
};

/// The multicast group of events emitted by the kernel itself.
const KERNEL_GROUP: u32 = 1;

/// How often the thread checks whether it has been stopped.
const POLL_TIMEOUT_MS: c::c_int = 500;

const BUF_SIZE: usize = 8192;

/// Whether a raw uevent announces a change of the connectors of a DRM
/// device.
///
/// Kernel uevents have the form `action@devpath\0KEY=VALUE\0...`.
pub fn is_drm_hotplug(msg: &[u8]) -> bool {
    let mut fields = msg.split(|&b| b == 0);
    match fields.next() {
        Some(header) if header.contains(&b'@') => {}
        _ => return false,
    }
    let mut change = false;
    let mut drm = false;
    let mut hotplug = false;
    for field in fields {
        let Some((key, value)) = field.split_once_str("=") else {
            continue;
        };
        match key {
            b"ACTION" => change = value == b"change",
            b"SUBSYSTEM" => drm = value == b"drm",
            b"HOTPLUG" => hotplug = value == b"1",
            _ => {}
        }
    }
    change && drm && hotplug
}

fn open_socket() -> Result<OwnedFd, HwcError> {
    let fd = uapi::socket(
        c::AF_NETLINK,
        c::SOCK_DGRAM | c::SOCK_CLOEXEC,
        c::NETLINK_KOBJECT_UEVENT,
    )
    .map_err(|e| HwcError::UeventSocket(e.into()))?;
    // sockaddr_nl has private padding.
    let mut addr: c::sockaddr_nl = unsafe { mem::zeroed() };
    addr.nl_family = c::AF_NETLINK as _;
    addr.nl_groups = KERNEL_GROUP;
    let res = unsafe {
        c::bind(
            fd.raw(),
            &addr as *const c::sockaddr_nl as *const c::sockaddr,
            mem::size_of::<c::sockaddr_nl>() as c::socklen_t,
        )
    };
    if res != 0 {
        return Err(HwcError::UeventBind(OsError::default()));
    }
    Ok(fd)
}

/// A thread invoking a callback for every DRM hotplug event.
///
/// Dropping the listener stops the thread.
pub struct HotplugListener {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl HotplugListener {
    pub fn start<F>(on_hotplug: F) -> Result<Self, HwcError>
    where
        F: Fn() + Send + 'static,
    {
        let fd = open_socket()?;
        let stop = Arc::new(AtomicBool::new(false));
        let stop2 = stop.clone();
        let thread = thread::Builder::new()
            .name("hotplug".to_string())
            .spawn(move || run(fd, &stop2, on_hotplug))
            .map_err(|e| HwcError::SpawnThread("hotplug", e))?;
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }
}

impl Drop for HotplugListener {
    fn drop(&mut self) {
        self.stop.store(true, Relaxed);
        if let Some(thread) = self.thread.take()
            && thread.thread().id() != thread::current().id()
        {
            let _ = thread.join();
        }
    }
}

fn run(fd: OwnedFd, stop: &AtomicBool, on_hotplug: impl Fn()) {
    let mut buf = vec![0u8; BUF_SIZE];
    while !stop.load(Relaxed) {
        let mut pollfd = c::pollfd {
            fd: fd.raw(),
            events: c::POLLIN,
            revents: 0,
        };
        match uapi::poll(slice::from_mut(&mut pollfd), POLL_TIMEOUT_MS) {
            Ok(0) | Err(Errno(c::EINTR)) => continue,
            Ok(_) => {}
            Err(e) => {
                log::error!("Could not poll the uevent socket: {}", ErrorFmt(OsError::from(e)));
                return;
            }
        }
        let msg = match uapi::read(fd.raw(), &mut buf[..]) {
            Ok(msg) => msg,
            Err(Errno(c::EINTR | c::EAGAIN)) => continue,
            Err(Errno(c::ENOBUFS)) => {
                // Events were lost. Reconcile in case one of them mattered.
                log::warn!("The uevent socket overflowed");
                on_hotplug();
                continue;
            }
            Err(e) => {
                log::error!("Could not read a uevent: {}", ErrorFmt(OsError::from(e)));
                return;
            }
        };
        if is_drm_hotplug(msg) {
            log::info!("DRM hotplug event");
            on_hotplug();
        }
    }
}
