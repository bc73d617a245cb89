use {
    crate::{
        hwc::HwcError,
        video::{
            dmabuf::DmaBuf,
            drm::{DrmDevice, DrmFb, DrmFramebuffer, DumbFramebuffer},
        },
    },
    std::{fmt::Debug, sync::Arc},
};

/// A kernel framebuffer that stays valid while a reference to it exists.
pub trait Framebuffer: Send + Sync + Debug {
    fn id(&self) -> DrmFb;
}

impl Framebuffer for DrmFramebuffer {
    fn id(&self) -> DrmFb {
        self.id()
    }
}

impl Framebuffer for DumbFramebuffer {
    fn id(&self) -> DrmFb {
        self.id()
    }
}

/// Turns generic buffer descriptors into framebuffers.
pub trait BufferImporter: Send + Sync {
    fn import(&self, buf: &DmaBuf) -> Result<Arc<dyn Framebuffer>, HwcError>;
}

pub struct DrmFbImporter {
    drm: Arc<dyn DrmDevice>,
}

impl DrmFbImporter {
    pub fn new(drm: &Arc<dyn DrmDevice>) -> Self {
        Self { drm: drm.clone() }
    }
}

impl BufferImporter for DrmFbImporter {
    fn import(&self, buf: &DmaBuf) -> Result<Arc<dyn Framebuffer>, HwcError> {
        let fb = DrmFramebuffer::new(&self.drm, buf).map_err(HwcError::Import)?;
        Ok(Arc::new(fb))
    }
}
