mod sys;

use {
    crate::{
        format,
        utils::{
            errorfmt::ErrorFmt,
            mmap::{Mmapped, mmap_shared},
            oserror::OsError,
        },
        video::{
            INVALID_MODIFIER,
            dmabuf::DmaBuf,
            drm::sys::{
                AddFb2, DRM_DISPLAY_MODE_LEN, DRM_MODE_FB_MODIFIERS, DRM_MODE_OBJECT_BLOB,
                DRM_MODE_OBJECT_CONNECTOR, DRM_MODE_OBJECT_CRTC, DRM_MODE_OBJECT_ENCODER,
                DRM_MODE_OBJECT_FB, DRM_MODE_OBJECT_MODE, DRM_MODE_OBJECT_PLANE,
                DRM_MODE_OBJECT_PROPERTY, auth_magic, gem_close, mode_addfb2, mode_atomic,
                mode_create_blob, mode_destroy_blob, mode_get_resources, mode_getconnector,
                mode_getencoder, mode_getplane, mode_getplaneresources, mode_getproperty,
                mode_create_dumb, mode_destroy_dumb, mode_map_dumb, mode_obj_getproperties,
                mode_rmfb, prime_fd_to_handle, set_client_cap, wait_vblank,
            },
        },
    },
    bstr::{BString, ByteSlice},
    smallvec::SmallVec,
    std::{
        fmt::{Debug, Display, Formatter},
        sync::Arc,
    },
    thiserror::Error,
    uapi::{OwnedFd, c},
};
pub use sys::{
    DRM_CLIENT_CAP_ATOMIC, DRM_CLIENT_CAP_UNIVERSAL_PLANES, DRM_CLIENT_CAP_WRITEBACK_CONNECTORS,
    DRM_MODE_ATOMIC_ALLOW_MODESET, DRM_MODE_ATOMIC_TEST_ONLY, DRM_MODE_TYPE_PREFERRED,
    drm_mode_modeinfo,
};

#[derive(Debug, Error)]
pub enum DrmError {
    #[error("Could not open {0}")]
    Open(String, #[source] OsError),
    #[error("Could not perform drm property ioctl")]
    GetProperty(#[source] OsError),
    #[error("Could not perform drm getencoder ioctl")]
    GetEncoder(#[source] OsError),
    #[error("Could not perform drm getresources ioctl")]
    GetResources(#[source] OsError),
    #[error("Could not perform drm getplaneresources ioctl")]
    GetPlaneResources(#[source] OsError),
    #[error("Could not perform drm getplane ioctl")]
    GetPlane(#[source] OsError),
    #[error("Could not create a blob")]
    CreateBlob(#[source] OsError),
    #[error("Could not destroy a blob")]
    DestroyBlob(#[source] OsError),
    #[error("Could not perform drm getconnector ioctl")]
    GetConnector(#[source] OsError),
    #[error("Could not perform drm properties ioctl")]
    GetProperties(#[source] OsError),
    #[error("Could not perform drm atomic ioctl")]
    Atomic(#[source] OsError),
    #[error("Could not wait for a vblank")]
    WaitVblank(#[source] OsError),
    #[error("Could not set client cap {0}")]
    SetClientCap(u64, #[source] OsError),
    #[error("Drm property has an unknown type {0}")]
    UnknownPropertyType(u32),
    #[error("Range property does not have exactly two values")]
    RangeValues,
    #[error("Object property does not have exactly one value")]
    ObjectValues,
    #[error("Object does not have the required property {0}")]
    MissingProperty(Box<str>),
    #[error("Plane has an unknown type {0}")]
    UnknownPlaneType(BString),
    #[error("Plane has an invalid type {0}")]
    InvalidPlaneType(u64),
    #[error("Plane type property has an invalid property type")]
    InvalidPlaneTypeProperty,
    #[error("Could not create a framebuffer")]
    AddFb(#[source] OsError),
    #[error("Could not remove a framebuffer")]
    RmFb(#[source] OsError),
    #[error("Could not convert prime fd to gem handle")]
    GemHandle(#[source] OsError),
    #[error("Buffer has no planes")]
    NoPlanes,
    #[error("Could not create a dumb buffer")]
    CreateDumb(#[source] OsError),
    #[error("Could not map a dumb buffer")]
    MapDumb(#[source] OsError),
}

/// The kernel mode-setting interface of a single DRM device.
///
/// [`DrmMaster`] implements this on top of the ioctl layer. All object ids
/// are the kernel's ids.
pub trait DrmDevice: Send + Sync {
    fn get_resources(&self) -> Result<DrmCardResources, DrmError>;
    fn get_planes(&self) -> Result<Vec<DrmPlane>, DrmError>;
    fn get_plane_info(&self, plane: DrmPlane) -> Result<DrmPlaneInfo, DrmError>;
    fn get_encoder_info(&self, encoder: DrmEncoder) -> Result<DrmEncoderInfo, DrmError>;
    fn get_connector_info(
        &self,
        connector: DrmConnector,
        force: bool,
    ) -> Result<DrmConnectorInfo, DrmError>;
    /// Returns the property values attached to an object of type `ty`.
    fn get_properties(&self, obj: u32, ty: u32) -> Result<Vec<DrmPropertyValue>, DrmError>;
    fn get_property(&self, prop: DrmProperty) -> Result<DrmPropertyDefinition, DrmError>;
    fn create_blob(&self, data: &[u8]) -> Result<DrmBlob, DrmError>;
    fn destroy_blob(&self, blob: DrmBlob) -> Result<(), DrmError>;
    fn commit(&self, change: &Change, flags: u32) -> Result<(), DrmError>;
    /// Blocks until the next vblank of the CRTC with the given index and
    /// returns its CLOCK_MONOTONIC timestamp in nanoseconds.
    fn wait_vblank(&self, crtc_index: usize) -> Result<i64, DrmError>;
    fn add_fb(&self, dmabuf: &DmaBuf) -> Result<DrmFb, DrmError>;
    fn rm_fb(&self, fb: DrmFb) -> Result<(), DrmError>;
    fn set_client_cap(&self, cap: u64, value: u64) -> Result<(), DrmError>;
    fn is_master(&self) -> bool;
}

pub fn get_object_properties<T: DrmObject>(
    drm: &dyn DrmDevice,
    t: T,
) -> Result<Vec<DrmPropertyValue>, DrmError> {
    drm.get_properties(t.id(), T::TYPE)
}

pub struct DrmMaster {
    fd: OwnedFd,
    path: String,
}

impl Debug for DrmMaster {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.path, self.fd.raw())
    }
}

impl DrmMaster {
    pub fn open(path: &str) -> Result<Self, DrmError> {
        match uapi::open(path, c::O_RDWR | c::O_CLOEXEC, 0) {
            Ok(fd) => Ok(Self {
                fd,
                path: path.to_string(),
            }),
            Err(e) => Err(DrmError::Open(path.to_string(), e.into())),
        }
    }

    pub fn raw(&self) -> c::c_int {
        self.fd.raw()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Allocates a CPU-mapped XRGB8888 scanout buffer.
    pub fn create_dumb_framebuffer(
        self: &Arc<Self>,
        width: u32,
        height: u32,
    ) -> Result<DumbFramebuffer, DrmError> {
        let alloc = mode_create_dumb(self.raw(), width, height, 32).map_err(DrmError::CreateDumb)?;
        let mut dumb = DumbFramebuffer {
            master: self.clone(),
            handle: alloc.handle,
            fb: None,
            map: None,
        };
        let offset = mode_map_dumb(self.raw(), alloc.handle).map_err(DrmError::MapDumb)?;
        let map = mmap_shared(alloc.size as usize, self.raw(), offset as _)
            .map_err(DrmError::MapDumb)?;
        dumb.map = Some(map);
        let args = AddFb2 {
            width,
            height,
            pixel_format: format::XRGB8888.drm,
            flags: 0,
            handles: [alloc.handle, 0, 0, 0],
            strides: [alloc.pitch, 0, 0, 0],
            offsets: [0; 4],
            modifiers: [0; 4],
        };
        dumb.fb = Some(mode_addfb2(self.raw(), &args).map_err(DrmError::AddFb)?);
        Ok(dumb)
    }
}

pub struct DumbFramebuffer {
    master: Arc<DrmMaster>,
    handle: u32,
    fb: Option<DrmFb>,
    map: Option<Mmapped>,
}

impl Debug for DumbFramebuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumbFramebuffer")
            .field("fb", &self.fb)
            .finish_non_exhaustive()
    }
}

impl DumbFramebuffer {
    pub fn id(&self) -> DrmFb {
        self.fb.unwrap_or(DrmFb::NONE)
    }

    pub fn fill(&mut self, xrgb: u32) {
        if let Some(map) = &mut self.map {
            for px in map.as_mut_slice().chunks_exact_mut(4) {
                px.copy_from_slice(&xrgb.to_le_bytes());
            }
        }
    }
}

impl Drop for DumbFramebuffer {
    fn drop(&mut self) {
        if let Some(fb) = self.fb
            && let Err(e) = mode_rmfb(self.master.raw(), fb)
        {
            log::error!("Could not delete framebuffer: {}", ErrorFmt(e));
        }
        self.map.take();
        if let Err(e) = mode_destroy_dumb(self.master.raw(), self.handle) {
            log::error!("Could not destroy dumb buffer: {}", ErrorFmt(e));
        }
    }
}

impl DrmDevice for DrmMaster {
    fn get_resources(&self) -> Result<DrmCardResources, DrmError> {
        mode_get_resources(self.raw())
    }

    fn get_planes(&self) -> Result<Vec<DrmPlane>, DrmError> {
        mode_getplaneresources(self.raw())
    }

    fn get_plane_info(&self, plane: DrmPlane) -> Result<DrmPlaneInfo, DrmError> {
        mode_getplane(self.raw(), plane.0)
    }

    fn get_encoder_info(&self, encoder: DrmEncoder) -> Result<DrmEncoderInfo, DrmError> {
        mode_getencoder(self.raw(), encoder.0)
    }

    fn get_connector_info(
        &self,
        connector: DrmConnector,
        force: bool,
    ) -> Result<DrmConnectorInfo, DrmError> {
        mode_getconnector(self.raw(), connector.0, force)
    }

    fn get_properties(&self, obj: u32, ty: u32) -> Result<Vec<DrmPropertyValue>, DrmError> {
        mode_obj_getproperties(self.raw(), obj, ty)
    }

    fn get_property(&self, prop: DrmProperty) -> Result<DrmPropertyDefinition, DrmError> {
        mode_getproperty(self.raw(), prop)
    }

    fn create_blob(&self, data: &[u8]) -> Result<DrmBlob, DrmError> {
        mode_create_blob(self.raw(), data).map_err(DrmError::CreateBlob)
    }

    fn destroy_blob(&self, blob: DrmBlob) -> Result<(), DrmError> {
        mode_destroy_blob(self.raw(), blob).map_err(DrmError::DestroyBlob)
    }

    fn commit(&self, change: &Change, flags: u32) -> Result<(), DrmError> {
        mode_atomic(
            self.raw(),
            flags,
            &change.objects,
            &change.object_lengths,
            &change.props,
            &change.values,
        )
    }

    fn wait_vblank(&self, crtc_index: usize) -> Result<i64, DrmError> {
        wait_vblank(self.raw(), crtc_index).map_err(DrmError::WaitVblank)
    }

    fn add_fb(&self, dma: &DmaBuf) -> Result<DrmFb, DrmError> {
        if dma.planes.is_empty() {
            return Err(DrmError::NoPlanes);
        }
        let mut args = AddFb2 {
            width: dma.width as _,
            height: dma.height as _,
            pixel_format: dma.format,
            flags: 0,
            handles: [0; 4],
            strides: [0; 4],
            offsets: [0; 4],
            modifiers: [0; 4],
        };
        let mut modifier = 0;
        if dma.modifier != INVALID_MODIFIER {
            modifier = dma.modifier;
            args.flags |= DRM_MODE_FB_MODIFIERS;
        }
        let mut handles = SmallVec::<[u32; 4]>::new();
        let mut res = Ok(());
        for (idx, plane) in dma.planes.iter().enumerate() {
            let handle = match prime_fd_to_handle(self.raw(), plane.fd.raw()) {
                Ok(h) => h,
                Err(e) => {
                    res = Err(DrmError::GemHandle(e));
                    break;
                }
            };
            if !handles.contains(&handle) {
                handles.push(handle);
            }
            args.handles[idx] = handle;
            args.strides[idx] = plane.stride;
            args.offsets[idx] = plane.offset;
            args.modifiers[idx] = modifier;
        }
        let res = res.and_then(|_| mode_addfb2(self.raw(), &args).map_err(DrmError::AddFb));
        // the framebuffer holds its own references to the buffer objects
        for handle in handles {
            if let Err(e) = gem_close(self.raw(), handle) {
                log::error!("Could not close gem handle: {}", ErrorFmt(e));
            }
        }
        res
    }

    fn rm_fb(&self, fb: DrmFb) -> Result<(), DrmError> {
        mode_rmfb(self.raw(), fb).map_err(DrmError::RmFb)
    }

    fn set_client_cap(&self, cap: u64, value: u64) -> Result<(), DrmError> {
        set_client_cap(self.raw(), cap, value).map_err(|e| DrmError::SetClientCap(cap, e))
    }

    fn is_master(&self) -> bool {
        auth_magic(self.raw(), 0) != Err(OsError(c::EACCES))
    }
}

#[derive(Debug, Clone)]
pub struct DrmPropertyDefinition {
    pub id: DrmProperty,
    pub name: BString,
    pub immutable: bool,
    pub ty: DrmPropertyType,
}

#[derive(Debug, Clone)]
pub enum DrmPropertyType {
    Range { min: u64, max: u64 },
    SignedRange { min: i64, max: i64 },
    Object { ty: u32 },
    Blob,
    Enum {
        values: Vec<DrmPropertyEnumValue>,
        bitmask: bool,
    },
}

#[derive(Debug, Clone)]
pub struct DrmPropertyEnumValue {
    pub value: u64,
    pub name: BString,
}

#[derive(Debug, Clone)]
pub struct DrmPropertyValue {
    pub id: DrmProperty,
    pub value: u64,
}

pub trait DrmObject {
    const TYPE: u32;
    const NONE: Self;
    fn id(&self) -> u32;
    fn is_some(&self) -> bool;
    fn is_none(&self) -> bool;
}

macro_rules! drm_obj {
    ($name:ident, $ty:expr) => {
        #[repr(transparent)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default, Ord, PartialOrd)]
        pub struct $name(pub u32);

        impl DrmObject for $name {
            const TYPE: u32 = $ty;
            const NONE: Self = Self(0);

            fn id(&self) -> u32 {
                self.0
            }

            fn is_some(&self) -> bool {
                self.0 != 0
            }

            fn is_none(&self) -> bool {
                self.0 == 0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                Display::fmt(&self.0, f)
            }
        }
    };
}
drm_obj!(DrmCrtc, DRM_MODE_OBJECT_CRTC);
drm_obj!(DrmConnector, DRM_MODE_OBJECT_CONNECTOR);
drm_obj!(DrmEncoder, DRM_MODE_OBJECT_ENCODER);
drm_obj!(DrmMode, DRM_MODE_OBJECT_MODE);
drm_obj!(DrmProperty, DRM_MODE_OBJECT_PROPERTY);
drm_obj!(DrmFb, DRM_MODE_OBJECT_FB);
drm_obj!(DrmBlob, DRM_MODE_OBJECT_BLOB);
drm_obj!(DrmPlane, DRM_MODE_OBJECT_PLANE);

#[derive(Debug, Clone, Default)]
pub struct DrmCardResources {
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    pub crtcs: Vec<DrmCrtc>,
    pub connectors: Vec<DrmConnector>,
    pub encoders: Vec<DrmEncoder>,
}

#[derive(Debug, Clone)]
pub struct DrmPlaneInfo {
    pub crtc_id: DrmCrtc,
    pub fb_id: DrmFb,
    pub possible_crtcs: u32,
    pub format_types: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct DrmEncoderInfo {
    pub encoder_type: u32,
    pub crtc_id: DrmCrtc,
    pub possible_crtcs: u32,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DrmModeInfo {
    pub clock: u32,
    pub hdisplay: u16,
    pub hsync_start: u16,
    pub hsync_end: u16,
    pub htotal: u16,
    pub hskew: u16,
    pub vdisplay: u16,
    pub vsync_start: u16,
    pub vsync_end: u16,
    pub vtotal: u16,
    pub vscan: u16,

    pub vrefresh: u32,

    pub flags: u32,
    pub ty: u32,
    pub name: BString,
}

impl DrmModeInfo {
    pub fn create_blob(&self, drm: &Arc<dyn DrmDevice>) -> Result<PropBlob, DrmError> {
        let raw = self.to_raw();
        let id = drm.create_blob(raw.as_bytes())?;
        Ok(PropBlob {
            drm: drm.clone(),
            id,
        })
    }

    pub fn to_raw(&self) -> drm_mode_modeinfo {
        let mut name = [0u8; DRM_DISPLAY_MODE_LEN];
        let len = name.len().min(self.name.len());
        name[..len].copy_from_slice(&self.name.as_bytes()[..len]);
        drm_mode_modeinfo {
            clock: self.clock,
            hdisplay: self.hdisplay,
            hsync_start: self.hsync_start,
            hsync_end: self.hsync_end,
            htotal: self.htotal,
            hskew: self.hskew,
            vdisplay: self.vdisplay,
            vsync_start: self.vsync_start,
            vsync_end: self.vsync_end,
            vtotal: self.vtotal,
            vscan: self.vscan,
            vrefresh: self.vrefresh,
            flags: self.flags,
            ty: self.ty,
            name,
        }
    }

    pub fn refresh_rate_millihz(&self) -> u32 {
        let clock_millihz = self.clock as u64 * 1_000_000;
        let htotal = self.htotal as u64;
        let vtotal = self.vtotal as u64;
        if htotal == 0 || vtotal == 0 {
            return 0;
        }
        (((clock_millihz / htotal) + (vtotal / 2)) / vtotal) as u32
    }

    /// The duration of one frame in nanoseconds.
    pub fn frame_period_ns(&self) -> i64 {
        let pixels = self.htotal as i64 * self.vtotal as i64;
        if self.clock == 0 || pixels == 0 {
            return 0;
        }
        // clock is in kHz
        pixels * 1_000_000 / self.clock as i64
    }

    pub fn is_preferred(&self) -> bool {
        self.ty & DRM_MODE_TYPE_PREFERRED != 0
    }
}

impl Display for DrmModeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mhz = self.refresh_rate_millihz();
        write!(
            f,
            "{}x{}@{}.{:03}",
            self.hdisplay,
            self.vdisplay,
            mhz / 1000,
            mhz % 1000
        )
    }
}

#[derive(Debug, Clone)]
pub struct DrmConnectorInfo {
    pub encoders: Vec<DrmEncoder>,
    pub modes: Vec<DrmModeInfo>,
    pub encoder_id: DrmEncoder,
    pub connector_type: u32,
    pub connector_type_id: u32,
    pub connection: u32,
    pub mm_width: u32,
    pub mm_height: u32,
}

/// An atomic request under construction.
#[derive(Debug, Default, Clone)]
pub struct Change {
    objects: Vec<u32>,
    object_lengths: Vec<u32>,
    props: Vec<u32>,
    values: Vec<u64>,
}

pub struct ObjectChange<'a> {
    change: &'a mut Change,
}

impl Change {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn change_object<T, F>(&mut self, obj: T, f: F)
    where
        T: DrmObject,
        F: FnOnce(&mut ObjectChange),
    {
        let old_len = self.props.len();
        let mut oc = ObjectChange { change: self };
        f(&mut oc);
        if self.props.len() > old_len {
            let new = (self.props.len() - old_len) as u32;
            match self.object_lengths.last_mut() {
                Some(len) if self.objects.last() == Some(&obj.id()) => *len += new,
                _ => {
                    self.objects.push(obj.id());
                    self.object_lengths.push(new);
                }
            }
        }
    }

    /// Iterates over `(object, property, value)` in submission order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, DrmProperty, u64)> + '_ {
        let mut pos = 0;
        self.objects
            .iter()
            .zip(&self.object_lengths)
            .flat_map(move |(&obj, &len)| {
                let start = pos;
                pos += len as usize;
                (start..pos).map(move |i| (obj, i))
            })
            .map(|(obj, i)| (obj, DrmProperty(self.props[i]), self.values[i]))
    }
}

impl<'a> ObjectChange<'a> {
    pub fn change(&mut self, property_id: DrmProperty, value: u64) {
        self.change.props.push(property_id.0);
        self.change.values.push(value);
    }
}

#[expect(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConnectorType {
    Unknown(u32),
    VGA,
    DVII,
    DVID,
    DVIA,
    Composite,
    SVIDEO,
    LVDS,
    Component,
    _9PinDIN,
    DisplayPort,
    HDMIA,
    HDMIB,
    TV,
    eDP,
    VIRTUAL,
    DSI,
    DPI,
    WRITEBACK,
    SPI,
    USB,
}

impl ConnectorType {
    pub fn from_drm(v: u32) -> Self {
        match v {
            sys::DRM_MODE_CONNECTOR_VGA => Self::VGA,
            sys::DRM_MODE_CONNECTOR_DVII => Self::DVII,
            sys::DRM_MODE_CONNECTOR_DVID => Self::DVID,
            sys::DRM_MODE_CONNECTOR_DVIA => Self::DVIA,
            sys::DRM_MODE_CONNECTOR_Composite => Self::Composite,
            sys::DRM_MODE_CONNECTOR_SVIDEO => Self::SVIDEO,
            sys::DRM_MODE_CONNECTOR_LVDS => Self::LVDS,
            sys::DRM_MODE_CONNECTOR_Component => Self::Component,
            sys::DRM_MODE_CONNECTOR_9PinDIN => Self::_9PinDIN,
            sys::DRM_MODE_CONNECTOR_DisplayPort => Self::DisplayPort,
            sys::DRM_MODE_CONNECTOR_HDMIA => Self::HDMIA,
            sys::DRM_MODE_CONNECTOR_HDMIB => Self::HDMIB,
            sys::DRM_MODE_CONNECTOR_TV => Self::TV,
            sys::DRM_MODE_CONNECTOR_eDP => Self::eDP,
            sys::DRM_MODE_CONNECTOR_VIRTUAL => Self::VIRTUAL,
            sys::DRM_MODE_CONNECTOR_DSI => Self::DSI,
            sys::DRM_MODE_CONNECTOR_DPI => Self::DPI,
            sys::DRM_MODE_CONNECTOR_WRITEBACK => Self::WRITEBACK,
            sys::DRM_MODE_CONNECTOR_SPI => Self::SPI,
            sys::DRM_MODE_CONNECTOR_USB => Self::USB,
            _ => Self::Unknown(v),
        }
    }

    pub fn to_drm(self) -> u32 {
        match self {
            Self::Unknown(n) => n,
            Self::VGA => sys::DRM_MODE_CONNECTOR_VGA,
            Self::DVII => sys::DRM_MODE_CONNECTOR_DVII,
            Self::DVID => sys::DRM_MODE_CONNECTOR_DVID,
            Self::DVIA => sys::DRM_MODE_CONNECTOR_DVIA,
            Self::Composite => sys::DRM_MODE_CONNECTOR_Composite,
            Self::SVIDEO => sys::DRM_MODE_CONNECTOR_SVIDEO,
            Self::LVDS => sys::DRM_MODE_CONNECTOR_LVDS,
            Self::Component => sys::DRM_MODE_CONNECTOR_Component,
            Self::_9PinDIN => sys::DRM_MODE_CONNECTOR_9PinDIN,
            Self::DisplayPort => sys::DRM_MODE_CONNECTOR_DisplayPort,
            Self::HDMIA => sys::DRM_MODE_CONNECTOR_HDMIA,
            Self::HDMIB => sys::DRM_MODE_CONNECTOR_HDMIB,
            Self::TV => sys::DRM_MODE_CONNECTOR_TV,
            Self::eDP => sys::DRM_MODE_CONNECTOR_eDP,
            Self::VIRTUAL => sys::DRM_MODE_CONNECTOR_VIRTUAL,
            Self::DSI => sys::DRM_MODE_CONNECTOR_DSI,
            Self::DPI => sys::DRM_MODE_CONNECTOR_DPI,
            Self::WRITEBACK => sys::DRM_MODE_CONNECTOR_WRITEBACK,
            Self::SPI => sys::DRM_MODE_CONNECTOR_SPI,
            Self::USB => sys::DRM_MODE_CONNECTOR_USB,
        }
    }
}

impl Display for ConnectorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown(n) => return write!(f, "Unknown({})", n),
            Self::VGA => "VGA",
            Self::DVII => "DVI-I",
            Self::DVID => "DVI-D",
            Self::DVIA => "DVI-A",
            Self::Composite => "Composite",
            Self::SVIDEO => "SVIDEO",
            Self::LVDS => "LVDS",
            Self::Component => "Component",
            Self::_9PinDIN => "DIN",
            Self::DisplayPort => "DP",
            Self::HDMIA => "HDMI-A",
            Self::HDMIB => "HDMI-B",
            Self::TV => "TV",
            Self::eDP => "eDP",
            Self::VIRTUAL => "Virtual",
            Self::DSI => "DSI",
            Self::DPI => "DPI",
            Self::WRITEBACK => "Writeback",
            Self::SPI => "SPI",
            Self::USB => "USB",
        };
        f.write_str(s)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ConnectorStatus {
    Connected,
    Disconnected,
    Unknown,
    Other(u32),
}

impl ConnectorStatus {
    pub fn from_drm(v: u32) -> Self {
        match v {
            sys::CONNECTOR_STATUS_CONNECTED => Self::Connected,
            sys::CONNECTOR_STATUS_DISCONNECTED => Self::Disconnected,
            sys::CONNECTOR_STATUS_UNKNOWN => Self::Unknown,
            _ => Self::Other(v),
        }
    }

    pub fn to_drm(self) -> u32 {
        match self {
            Self::Connected => sys::CONNECTOR_STATUS_CONNECTED,
            Self::Disconnected => sys::CONNECTOR_STATUS_DISCONNECTED,
            Self::Unknown => sys::CONNECTOR_STATUS_UNKNOWN,
            Self::Other(v) => v,
        }
    }
}

/// A kernel property blob that is destroyed when dropped.
pub struct PropBlob {
    drm: Arc<dyn DrmDevice>,
    id: DrmBlob,
}

impl Debug for PropBlob {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropBlob")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl PropBlob {
    pub fn id(&self) -> DrmBlob {
        self.id
    }
}

impl Drop for PropBlob {
    fn drop(&mut self) {
        if let Err(e) = self.drm.destroy_blob(self.id) {
            log::error!("Could not destroy blob: {}", ErrorFmt(e));
        }
    }
}

/// A kernel framebuffer that is removed when dropped.
pub struct DrmFramebuffer {
    drm: Arc<dyn DrmDevice>,
    fb: DrmFb,
}

impl Debug for DrmFramebuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrmFramebuffer")
            .field("fb", &self.fb)
            .finish_non_exhaustive()
    }
}

impl DrmFramebuffer {
    pub fn new(drm: &Arc<dyn DrmDevice>, dma: &DmaBuf) -> Result<Self, DrmError> {
        let fb = drm.add_fb(dma)?;
        log::debug!(
            "Created framebuffer {} ({}x{} {:?})",
            fb,
            dma.width,
            dma.height,
            format::debug(dma.format),
        );
        Ok(Self {
            drm: drm.clone(),
            fb,
        })
    }

    pub fn id(&self) -> DrmFb {
        self.fb
    }
}

impl Drop for DrmFramebuffer {
    fn drop(&mut self) {
        if let Err(e) = self.drm.rm_fb(self.fb) {
            log::error!("Could not delete framebuffer: {}", ErrorFmt(e));
        }
    }
}
