use {
    crate::utils::{errorfmt::ErrorFmt, oserror::OsError},
    backtrace::Backtrace,
    log::{Level, Log, Metadata, Record},
    std::{
        cell::RefCell,
        io::Write,
        sync::{
            Arc,
            atomic::{AtomicU32, Ordering::Relaxed},
        },
        time::SystemTime,
    },
    uapi::{Fd, OwnedFd},
};

thread_local! {
    static BUFFER: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

pub struct Logger {
    level: AtomicU32,
    file: OwnedFd,
}

impl Logger {
    /// Installs a logger writing to a duplicate of stderr and a panic hook
    /// that logs the panic with a backtrace.
    pub fn install_stderr(level: Level) -> Arc<Self> {
        let file = match uapi::fcntl_dupfd_cloexec(2, 0) {
            Ok(fd) => fd,
            Err(e) => {
                let e = OsError::from(e);
                fatal!("Error: Could not dup stderr: {}", ErrorFmt(e));
            }
        };
        std::panic::set_hook(Box::new(|p| {
            if let Some(loc) = p.location() {
                log::error!(
                    "Panic at {} line {} column {}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                );
            } else {
                log::error!("Panic at unknown location");
            }
            if let Some(msg) = p.payload().downcast_ref::<&str>() {
                log::error!("Message: {}", msg);
            }
            if let Some(msg) = p.payload().downcast_ref::<String>() {
                log::error!("Message: {}", msg);
            }
            log::error!("Backtrace:\n{:?}", Backtrace::new());
        }));
        let slf = Arc::new(Self {
            level: AtomicU32::new(level as _),
            file,
        });
        let res = log::set_boxed_logger(Box::new(LogWrapper {
            logger: slf.clone(),
        }));
        if res.is_err() {
            eprintln!("Error: A logger has already been installed");
        }
        log::set_max_level(level.to_level_filter());
        slf
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as _, Relaxed);
        log::set_max_level(level.to_level_filter());
    }
}

struct LogWrapper {
    logger: Arc<Logger>,
}

fn format_record(buffer: &mut Vec<u8>, now: SystemTime, record: &Record) {
    buffer.clear();
    let _ = if let Some(mp) = record.module_path() {
        writeln!(
            buffer,
            "[{} {:5} {}] {}",
            humantime::format_rfc3339_millis(now),
            record.level(),
            mp,
            record.args(),
        )
    } else {
        writeln!(
            buffer,
            "[{} {:5}] {}",
            humantime::format_rfc3339_millis(now),
            record.level(),
            record.args(),
        )
    };
}

impl Log for LogWrapper {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() as u32 <= self.logger.level.load(Relaxed)
    }

    fn log(&self, record: &Record) {
        if record.level() as u32 > self.logger.level.load(Relaxed) {
            return;
        }
        BUFFER.with_borrow_mut(|buffer| {
            format_record(buffer, SystemTime::now(), record);
            let mut fd = Fd::new(self.logger.file.raw());
            let _ = fd.write_all(buffer);
        });
    }

    fn flush(&self) {
        // nothing
    }
}

#[cfg(test)]
mod tests {
    use {
        super::format_record,
        log::{Level, Record},
        std::time::{Duration, SystemTime},
    };

    #[test]
    fn line_format() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        let mut buf = vec![];
        format_record(
            &mut buf,
            now,
            &Record::builder()
                .level(Level::Warn)
                .module_path(Some("drmhwc::hwc"))
                .args(format_args!("plane {} rejected", 31))
                .build(),
        );
        assert_eq!(
            buf,
            b"[2023-11-14T22:13:20.123Z WARN  drmhwc::hwc] plane 31 rejected\n"
        );
        format_record(
            &mut buf,
            now,
            &Record::builder()
                .level(Level::Info)
                .args(format_args!("x"))
                .build(),
        );
        assert_eq!(buf, b"[2023-11-14T22:13:20.123Z INFO ] x\n");
    }
}
