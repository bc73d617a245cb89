macro_rules! fatal {
    ($($arg:tt)+) => {{
        log::error!($($arg)+);
        std::process::exit(1);
    }};
}

/// Declares an id type and the allocator that issues it. Ids start at 1 and
/// are never reused by the same allocator.
macro_rules! linear_ids {
    ($ids:ident, $id:ident) => {
        #[derive(Debug)]
        pub struct $ids {
            next: std::sync::atomic::AtomicU64,
        }

        impl Default for $ids {
            fn default() -> Self {
                Self {
                    next: std::sync::atomic::AtomicU64::new(1),
                }
            }
        }

        impl $ids {
            pub fn next(&self) -> $id {
                $id(self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
            }
        }

        #[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
        pub struct $id(u64);

        #[allow(dead_code)]
        impl $id {
            pub fn raw(self) -> u64 {
                self.0
            }

            pub fn from_raw(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $id {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}
