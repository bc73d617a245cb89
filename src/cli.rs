mod probe;
mod run;

use {
    crate::{config::Config, logger::Logger, utils::errorfmt::ErrorFmt},
    ::log::Level,
    clap::{Args, Parser, Subcommand, ValueEnum},
    serde::{Deserialize, Serialize},
    std::{path::PathBuf, sync::Arc},
};

/// Drives displays through the atomic KMS interface.
#[derive(Parser, Debug)]
struct DrmHwc {
    #[clap(flatten)]
    global: GlobalArgs,
    #[clap(subcommand)]
    command: Cmd,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// The log level. Overrides the level in the config file.
    #[clap(value_enum, long)]
    pub log_level: Option<CliLogLevel>,
    /// A JSON config file.
    #[clap(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Light up every connected display and follow hotplug events.
    Run(RunArgs),
    /// Print the resources of the DRM devices.
    Probe(ProbeArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// A device node to use. Can be given multiple times.
    #[clap(long)]
    pub device: Vec<String>,
    /// Only use primary planes.
    #[clap(long)]
    pub no_overlay_planes: bool,
    /// Do not listen for hotplug events.
    #[clap(long)]
    pub no_hotplug: bool,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// A device node to use. Can be given multiple times.
    #[clap(long)]
    pub device: Vec<String>,
}

#[derive(ValueEnum, Serialize, Deserialize, Debug, Copy, Clone, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CliLogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<CliLogLevel> for Level {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Trace => Level::Trace,
            CliLogLevel::Debug => Level::Debug,
            CliLogLevel::Info => Level::Info,
            CliLogLevel::Warn => Level::Warn,
            CliLogLevel::Error => Level::Error,
        }
    }
}

/// Installs the logger and loads the config. The log level from the command
/// line wins over the one from the config.
fn setup(global: &GlobalArgs) -> (Arc<Logger>, Config) {
    let level = global.log_level.map(Level::from).unwrap_or(Level::Info);
    let logger = Logger::install_stderr(level);
    let config = match Config::load(global.config.as_deref()) {
        Ok(c) => c,
        Err(e) => fatal!("Could not load the config: {}", ErrorFmt(e)),
    };
    if global.log_level.is_none()
        && let Some(level) = config.log_level
    {
        logger.set_level(level.into());
    }
    (logger, config)
}

pub fn main() {
    let cli = DrmHwc::parse();
    match cli.command {
        Cmd::Run(a) => run::main(cli.global, a),
        Cmd::Probe(a) => probe::main(cli.global, a),
    }
}
