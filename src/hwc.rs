//! Binding of kernel display resources to displays and atomic composition.
//!
//! The [`manager::ResourceManager`] discovers [`device::KmsDevice`]s, builds a
//! [`pipeline::DisplayPipeline`] for every connected connector and hands it to
//! a [`manager::Frontend`]. Frames are described as ordered
//! [`layer::LayerData`] lists, mapped onto hardware planes by
//! [`plan::CompositionPlan`] and committed by the pipeline's
//! [`atomic::AtomicStateManager`].

pub mod atomic;
pub mod binding;
pub mod buffer;
pub mod device;
pub mod hotplug;
pub mod layer;
pub mod manager;
pub mod pipeline;
pub mod plan;
pub mod resources;
#[cfg(test)]
pub(crate) mod test_drm;
pub mod vsync;

use {
    crate::{
        hwc::pipeline::PipelineId,
        utils::oserror::OsError,
        video::drm::{DrmError, DrmPlane},
    },
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum HwcError {
    #[error("Could not open the DRM device")]
    Open(#[source] DrmError),
    #[error("{0} is not the DRM master")]
    NotMaster(String),
    #[error("The device does not support universal planes")]
    UniversalPlanes(#[source] DrmError),
    #[error("The device does not support atomic modesetting")]
    AtomicModesetting(#[source] DrmError),
    #[error("Could not discover the resources of the device")]
    Discovery(#[source] DrmError),
    #[error("Could not query a connector")]
    QueryConnector(#[source] DrmError),
    #[error("Could not query an encoder")]
    QueryEncoder(#[source] DrmError),
    #[error("Could not create a mode blob")]
    CreateModeBlob(#[source] DrmError),
    #[error("The atomic commit failed")]
    Commit(#[source] DrmError),
    #[error("Plane {0} cannot display the requested transform")]
    UnsupportedTransform(DrmPlane),
    #[error("Display {0} does not exist")]
    UnknownDisplay(PipelineId),
    #[error("Display {0} has been detached")]
    DisplayRetired(PipelineId),
    #[error("Could not import a buffer")]
    Import(#[source] DrmError),
    #[error("Could not create the uevent socket")]
    UeventSocket(#[source] OsError),
    #[error("Could not bind the uevent socket")]
    UeventBind(#[source] OsError),
    #[error("Could not spawn the {0} thread")]
    SpawnThread(&'static str, #[source] std::io::Error),
    #[error("Could not read /dev/dri")]
    ScanDevices(#[source] std::io::Error),
    #[error("No usable DRM device was found")]
    NoDevices,
}
