//! A scripted DRM device for unit tests.

use {
    crate::{
        hwc::buffer::Framebuffer,
        utils::oserror::OsError,
        video::{
            dmabuf::DmaBuf,
            drm::{
                Change, ConnectorType, DRM_MODE_TYPE_PREFERRED, DrmBlob, DrmCardResources,
                DrmConnector, DrmConnectorInfo, DrmCrtc, DrmDevice, DrmEncoder, DrmEncoderInfo,
                DrmError, DrmFb, DrmModeInfo, DrmObject, DrmPlane, DrmPlaneInfo, DrmProperty,
                DrmPropertyDefinition, DrmPropertyEnumValue, DrmPropertyType, DrmPropertyValue,
            },
        },
    },
    ahash::AHashMap,
    parking_lot::Mutex,
    std::{collections::VecDeque, sync::Arc},
    uapi::c,
};

pub const CONNECTED: u32 = 1;
pub const DISCONNECTED: u32 = 2;

#[derive(Default)]
struct Inner {
    next_id: u32,
    props: AHashMap<String, DrmPropertyDefinition>,
    values: AHashMap<u32, Vec<DrmPropertyValue>>,
    crtcs: Vec<DrmCrtc>,
    encoders: Vec<(DrmEncoder, DrmEncoderInfo)>,
    connectors: Vec<(DrmConnector, DrmConnectorInfo)>,
    planes: Vec<(DrmPlane, DrmPlaneInfo)>,
    blobs: Vec<DrmBlob>,
    commits: Vec<RecordedCommit>,
    failing_commits: usize,
    not_master: bool,
    refused_caps: Vec<u64>,
    caps: Vec<u64>,
    vblanks: VecDeque<i64>,
    vblank_requests: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct RecordedCommit {
    pub change: Change,
    pub flags: u32,
    pub failed: bool,
}

#[derive(Default)]
pub struct FakeDrm {
    inner: Mutex<Inner>,
}

fn enum_values(names: &[&str]) -> Vec<DrmPropertyEnumValue> {
    names
        .iter()
        .enumerate()
        .map(|(i, n)| DrmPropertyEnumValue {
            value: i as u64,
            name: (*n).into(),
        })
        .collect()
}

fn property_type(name: &str) -> DrmPropertyType {
    use DrmPropertyType::*;
    match name {
        "type" => Enum {
            values: enum_values(&["Overlay", "Primary", "Cursor"]),
            bitmask: false,
        },
        "rotation" => Enum {
            values: enum_values(&[
                "rotate-0",
                "rotate-90",
                "rotate-180",
                "rotate-270",
                "reflect-x",
                "reflect-y",
            ]),
            bitmask: true,
        },
        "pixel blend mode" => Enum {
            values: enum_values(&["None", "Pre-multiplied", "Coverage"]),
            bitmask: false,
        },
        "COLOR_ENCODING" => Enum {
            values: enum_values(&[
                "ITU-R BT.601 YCbCr",
                "ITU-R BT.709 YCbCr",
                "ITU-R BT.2020 YCbCr",
            ]),
            bitmask: false,
        },
        "COLOR_RANGE" => Enum {
            values: enum_values(&["YCbCr limited range", "YCbCr full range"]),
            bitmask: false,
        },
        "link-status" => Enum {
            values: enum_values(&["Good", "Bad"]),
            bitmask: false,
        },
        "CRTC_ID" => Object {
            ty: DrmCrtc::TYPE,
        },
        "FB_ID" | "WRITEBACK_FB_ID" => Object { ty: DrmFb::TYPE },
        "MODE_ID" | "EDID" | "WRITEBACK_PIXEL_FORMATS" => Blob,
        "CRTC_X" | "CRTC_Y" | "IN_FENCE_FD" => SignedRange {
            min: i32::MIN as i64,
            max: i32::MAX as i64,
        },
        "ACTIVE" => Range { min: 0, max: 1 },
        "alpha" => Range {
            min: 0,
            max: 0xffff,
        },
        _ => Range {
            min: 0,
            max: u64::MAX,
        },
    }
}

pub const PLANE_PROPS: &[&str] = &[
    "CRTC_ID", "FB_ID", "CRTC_X", "CRTC_Y", "CRTC_W", "CRTC_H", "SRC_X", "SRC_Y", "SRC_W", "SRC_H",
];

pub const ALL_OPTIONAL_PLANE_PROPS: &[&str] = &[
    "zpos",
    "rotation",
    "alpha",
    "pixel blend mode",
    "IN_FENCE_FD",
    "COLOR_ENCODING",
    "COLOR_RANGE",
];

impl Inner {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        100 + self.next_id
    }

    fn prop(&mut self, name: &str) -> DrmProperty {
        if let Some(def) = self.props.get(name) {
            return def.id;
        }
        let id = DrmProperty(self.next_id());
        self.props.insert(
            name.to_string(),
            DrmPropertyDefinition {
                id,
                name: name.into(),
                immutable: name == "type",
                ty: property_type(name),
            },
        );
        id
    }

    fn attach(&mut self, obj: u32, name: &str, value: u64) {
        let id = self.prop(name);
        self.values
            .entry(obj)
            .or_default()
            .push(DrmPropertyValue { id, value });
    }
}

impl FakeDrm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_crtc(&self, out_fence: bool) -> DrmCrtc {
        let mut inner = self.inner.lock();
        let crtc = DrmCrtc(inner.next_id());
        inner.crtcs.push(crtc);
        inner.attach(crtc.0, "ACTIVE", 0);
        inner.attach(crtc.0, "MODE_ID", 0);
        if out_fence {
            inner.attach(crtc.0, "OUT_FENCE_PTR", 0);
        }
        crtc
    }

    pub fn add_encoder(&self, possible_crtcs: u32) -> DrmEncoder {
        let mut inner = self.inner.lock();
        let encoder = DrmEncoder(inner.next_id());
        inner.encoders.push((
            encoder,
            DrmEncoderInfo {
                encoder_type: 0,
                crtc_id: DrmCrtc::NONE,
                possible_crtcs,
            },
        ));
        encoder
    }

    pub fn set_encoder_crtc(&self, encoder: DrmEncoder, crtc: DrmCrtc) {
        let mut inner = self.inner.lock();
        for (id, info) in &mut inner.encoders {
            if *id == encoder {
                info.crtc_id = crtc;
            }
        }
    }

    pub fn add_connector(
        &self,
        ty: ConnectorType,
        encoders: &[DrmEncoder],
        connected: bool,
        modes: Vec<DrmModeInfo>,
    ) -> DrmConnector {
        let mut inner = self.inner.lock();
        let connector = DrmConnector(inner.next_id());
        let type_id = inner
            .connectors
            .iter()
            .filter(|(_, i)| i.connector_type == ty.to_drm())
            .count() as u32
            + 1;
        inner.connectors.push((
            connector,
            DrmConnectorInfo {
                encoders: encoders.to_vec(),
                modes,
                encoder_id: DrmEncoder::NONE,
                connector_type: ty.to_drm(),
                connector_type_id: type_id,
                connection: if connected { CONNECTED } else { DISCONNECTED },
                mm_width: 300,
                mm_height: 200,
            },
        ));
        inner.attach(connector.0, "CRTC_ID", 0);
        inner.attach(connector.0, "link-status", 0);
        if ty == ConnectorType::WRITEBACK {
            inner.attach(connector.0, "WRITEBACK_PIXEL_FORMATS", 0);
            inner.attach(connector.0, "WRITEBACK_FB_ID", 0);
            inner.attach(connector.0, "WRITEBACK_OUT_FENCE_PTR", 0);
        }
        connector
    }

    fn connector_info<F: FnOnce(&mut DrmConnectorInfo)>(&self, connector: DrmConnector, f: F) {
        let mut inner = self.inner.lock();
        if let Some((_, info)) = inner.connectors.iter_mut().find(|(id, _)| *id == connector) {
            f(info);
        }
    }

    pub fn set_connected(&self, connector: DrmConnector, connected: bool) {
        self.connector_info(connector, |i| {
            i.connection = if connected { CONNECTED } else { DISCONNECTED };
        });
    }

    pub fn set_modes(&self, connector: DrmConnector, modes: Vec<DrmModeInfo>) {
        self.connector_info(connector, |i| i.modes = modes);
    }

    pub fn set_connector_encoder(&self, connector: DrmConnector, encoder: DrmEncoder) {
        self.connector_info(connector, |i| i.encoder_id = encoder);
    }

    /// Adds a plane with all mandatory properties and the listed optional
    /// ones. `ty` is the kernel name of the plane type.
    pub fn add_plane(
        &self,
        ty: &str,
        possible_crtcs: u32,
        formats: &[u32],
        optional: &[&str],
    ) -> DrmPlane {
        let mut inner = self.inner.lock();
        let plane = DrmPlane(inner.next_id());
        inner.planes.push((
            plane,
            DrmPlaneInfo {
                crtc_id: DrmCrtc::NONE,
                fb_id: DrmFb::NONE,
                possible_crtcs,
                format_types: formats.to_vec(),
            },
        ));
        let ty = match ty {
            "Overlay" => 0,
            "Primary" => 1,
            "Cursor" => 2,
            _ => 99,
        };
        inner.attach(plane.0, "type", ty);
        for name in PLANE_PROPS.iter().chain(optional) {
            inner.attach(plane.0, name, 0);
        }
        plane
    }

    pub fn remove_property(&self, obj: u32, name: &str) {
        let mut inner = self.inner.lock();
        let id = inner.prop(name);
        if let Some(values) = inner.values.get_mut(&obj) {
            values.retain(|v| v.id != id);
        }
    }

    pub fn prop_id(&self, name: &str) -> DrmProperty {
        self.inner.lock().prop(name)
    }

    pub fn set_master(&self, master: bool) {
        self.inner.lock().not_master = !master;
    }

    pub fn refuse_cap(&self, cap: u64) {
        self.inner.lock().refused_caps.push(cap);
    }

    pub fn caps(&self) -> Vec<u64> {
        self.inner.lock().caps.clone()
    }

    pub fn fail_commits(&self, n: usize) {
        self.inner.lock().failing_commits = n;
    }

    /// Timestamps returned by the next vblank waits. Once they are used up,
    /// waiting fails again.
    pub fn queue_vblanks(&self, timestamps: &[i64]) {
        self.inner.lock().vblanks.extend(timestamps);
    }

    /// The CRTC indices of all vblank waits so far.
    pub fn vblank_requests(&self) -> Vec<usize> {
        self.inner.lock().vblank_requests.clone()
    }

    pub fn commits(&self) -> Vec<RecordedCommit> {
        self.inner.lock().commits.clone()
    }

    pub fn clear_commits(&self) {
        self.inner.lock().commits.clear();
    }

    pub fn live_blobs(&self) -> usize {
        self.inner.lock().blobs.len()
    }

    /// The value a commit assigns to a property of an object.
    pub fn value(&self, commit: &RecordedCommit, obj: u32, name: &str) -> Option<u64> {
        let prop = self.prop_id(name);
        commit
            .change
            .iter()
            .filter(|&(o, p, _)| o == obj && p == prop)
            .map(|(_, _, v)| v)
            .last()
    }
}

impl DrmDevice for FakeDrm {
    fn get_resources(&self) -> Result<DrmCardResources, DrmError> {
        let inner = self.inner.lock();
        Ok(DrmCardResources {
            min_width: 0,
            max_width: 8192,
            min_height: 0,
            max_height: 8192,
            crtcs: inner.crtcs.clone(),
            connectors: inner.connectors.iter().map(|c| c.0).collect(),
            encoders: inner.encoders.iter().map(|e| e.0).collect(),
        })
    }

    fn get_planes(&self) -> Result<Vec<DrmPlane>, DrmError> {
        Ok(self.inner.lock().planes.iter().map(|p| p.0).collect())
    }

    fn get_plane_info(&self, plane: DrmPlane) -> Result<DrmPlaneInfo, DrmError> {
        let inner = self.inner.lock();
        match inner.planes.iter().find(|p| p.0 == plane) {
            Some((_, info)) => Ok(info.clone()),
            _ => Err(DrmError::GetPlane(OsError(c::ENOENT))),
        }
    }

    fn get_encoder_info(&self, encoder: DrmEncoder) -> Result<DrmEncoderInfo, DrmError> {
        let inner = self.inner.lock();
        match inner.encoders.iter().find(|e| e.0 == encoder) {
            Some((_, info)) => Ok(info.clone()),
            _ => Err(DrmError::GetEncoder(OsError(c::ENOENT))),
        }
    }

    fn get_connector_info(
        &self,
        connector: DrmConnector,
        _force: bool,
    ) -> Result<DrmConnectorInfo, DrmError> {
        let inner = self.inner.lock();
        match inner.connectors.iter().find(|c| c.0 == connector) {
            Some((_, info)) => Ok(info.clone()),
            _ => Err(DrmError::GetConnector(OsError(c::ENOENT))),
        }
    }

    fn get_properties(&self, obj: u32, _ty: u32) -> Result<Vec<DrmPropertyValue>, DrmError> {
        let inner = self.inner.lock();
        match inner.values.get(&obj) {
            Some(v) => Ok(v.clone()),
            _ => Err(DrmError::GetProperties(OsError(c::ENOENT))),
        }
    }

    fn get_property(&self, prop: DrmProperty) -> Result<DrmPropertyDefinition, DrmError> {
        let inner = self.inner.lock();
        match inner.props.values().find(|d| d.id == prop) {
            Some(def) => Ok(def.clone()),
            _ => Err(DrmError::GetProperty(OsError(c::ENOENT))),
        }
    }

    fn create_blob(&self, _data: &[u8]) -> Result<DrmBlob, DrmError> {
        let mut inner = self.inner.lock();
        let blob = DrmBlob(inner.next_id());
        inner.blobs.push(blob);
        Ok(blob)
    }

    fn destroy_blob(&self, blob: DrmBlob) -> Result<(), DrmError> {
        let mut inner = self.inner.lock();
        let len = inner.blobs.len();
        inner.blobs.retain(|b| *b != blob);
        match inner.blobs.len() < len {
            true => Ok(()),
            false => Err(DrmError::DestroyBlob(OsError(c::ENOENT))),
        }
    }

    fn commit(&self, change: &Change, flags: u32) -> Result<(), DrmError> {
        let mut inner = self.inner.lock();
        let failed = inner.failing_commits > 0;
        if failed {
            inner.failing_commits -= 1;
        }
        inner.commits.push(RecordedCommit {
            change: change.clone(),
            flags,
            failed,
        });
        match failed {
            true => Err(DrmError::Atomic(OsError(c::EINVAL))),
            false => Ok(()),
        }
    }

    fn wait_vblank(&self, crtc_index: usize) -> Result<i64, DrmError> {
        let mut inner = self.inner.lock();
        inner.vblank_requests.push(crtc_index);
        match inner.vblanks.pop_front() {
            Some(ts) => Ok(ts),
            None => Err(DrmError::WaitVblank(OsError(c::EOPNOTSUPP))),
        }
    }

    fn add_fb(&self, _dmabuf: &DmaBuf) -> Result<DrmFb, DrmError> {
        let mut inner = self.inner.lock();
        Ok(DrmFb(inner.next_id()))
    }

    fn rm_fb(&self, _fb: DrmFb) -> Result<(), DrmError> {
        Ok(())
    }

    fn set_client_cap(&self, cap: u64, _value: u64) -> Result<(), DrmError> {
        let mut inner = self.inner.lock();
        if inner.refused_caps.contains(&cap) {
            return Err(DrmError::SetClientCap(cap, OsError(c::EINVAL)));
        }
        inner.caps.push(cap);
        Ok(())
    }

    fn is_master(&self) -> bool {
        !self.inner.lock().not_master
    }
}

#[derive(Debug)]
pub struct FakeFb(pub DrmFb);

impl Framebuffer for FakeFb {
    fn id(&self) -> DrmFb {
        self.0
    }
}

pub fn mode(width: u16, height: u16, preferred: bool) -> DrmModeInfo {
    DrmModeInfo {
        clock: 148_500,
        hdisplay: width,
        hsync_start: width + 88,
        hsync_end: width + 132,
        htotal: 2200,
        hskew: 0,
        vdisplay: height,
        vsync_start: height + 4,
        vsync_end: height + 9,
        vtotal: 1125,
        vscan: 0,
        vrefresh: 60,
        flags: 0,
        ty: if preferred { DRM_MODE_TYPE_PREFERRED } else { 0 },
        name: format!("{}x{}", width, height).into(),
    }
}
