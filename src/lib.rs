#![allow(
    clippy::len_zero,
    clippy::needless_lifetimes,
    clippy::enum_variant_names,
    clippy::new_without_default,
    clippy::too_many_arguments
)]

#[macro_use]
mod macros;
pub mod cli;
pub mod config;
pub mod format;
pub mod hwc;
pub mod logger;
pub mod time;
pub mod utils;
pub mod video;
