use {
    crate::{
        hwc::{
            HwcError,
            buffer::DrmFbImporter,
            resources::KmsResources,
        },
        utils::errorfmt::ErrorFmt,
        video::drm::{
            DRM_CLIENT_CAP_ATOMIC, DRM_CLIENT_CAP_UNIVERSAL_PLANES,
            DRM_CLIENT_CAP_WRITEBACK_CONNECTORS, DrmDevice, DrmMaster,
        },
    },
    bstr::ByteSlice,
    std::{
        fmt::{Debug, Formatter},
        os::unix::ffi::OsStrExt,
        sync::Arc,
    },
};

linear_ids!(DeviceIds, DeviceId);

const DRI_DIR: &str = "/dev/dri";

pub struct KmsDevice {
    pub id: DeviceId,
    pub name: String,
    pub drm: Arc<dyn DrmDevice>,
    /// Set if the device was opened from a device node.
    pub master: Option<Arc<DrmMaster>>,
    pub res: KmsResources,
    /// Whether the kernel exposes writeback connectors to us.
    pub writeback: bool,
}

impl Debug for KmsDevice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KmsDevice")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("writeback", &self.writeback)
            .finish_non_exhaustive()
    }
}

impl KmsDevice {
    pub fn open(id: DeviceId, path: &str) -> Result<Self, HwcError> {
        let master = Arc::new(DrmMaster::open(path).map_err(HwcError::Open)?);
        let drm: Arc<dyn DrmDevice> = master.clone();
        let mut dev = Self::new(id, path, drm)?;
        dev.master = Some(master);
        Ok(dev)
    }

    /// Claims the atomic interface of `drm` and discovers its resources.
    pub fn new(id: DeviceId, name: &str, drm: Arc<dyn DrmDevice>) -> Result<Self, HwcError> {
        if !drm.is_master() {
            return Err(HwcError::NotMaster(name.to_string()));
        }
        drm.set_client_cap(DRM_CLIENT_CAP_UNIVERSAL_PLANES, 1)
            .map_err(HwcError::UniversalPlanes)?;
        drm.set_client_cap(DRM_CLIENT_CAP_ATOMIC, 1)
            .map_err(HwcError::AtomicModesetting)?;
        let writeback = match drm.set_client_cap(DRM_CLIENT_CAP_WRITEBACK_CONNECTORS, 1) {
            Ok(()) => true,
            Err(e) => {
                log::info!("{}: No writeback connectors: {}", name, ErrorFmt(e));
                false
            }
        };
        let res = KmsResources::discover(id, &*drm, writeback).map_err(HwcError::Discovery)?;
        log::info!(
            "{}: {} connectors, {} encoders, {} crtcs, {} planes",
            name,
            res.connectors.len(),
            res.encoders.len(),
            res.crtcs.len(),
            res.planes.len(),
        );
        Ok(Self {
            id,
            name: name.to_string(),
            drm,
            master: None,
            res,
            writeback,
        })
    }

    pub fn importer(&self) -> DrmFbImporter {
        DrmFbImporter::new(&self.drm)
    }
}

/// Lists the primary nodes in /dev/dri in name order.
pub fn scan_devices() -> Result<Vec<String>, HwcError> {
    let dir = std::fs::read_dir(DRI_DIR).map_err(HwcError::ScanDevices)?;
    let mut nodes = vec![];
    for entry in dir {
        let entry = entry.map_err(HwcError::ScanDevices)?;
        let name = entry.file_name();
        if name.as_bytes().starts_with_str("card") {
            nodes.push(entry.path().as_os_str().as_bytes().as_bstr().to_string());
        }
    }
    nodes.sort();
    Ok(nodes)
}
