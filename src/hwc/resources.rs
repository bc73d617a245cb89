//! The kernel resource model of a single device.
//!
//! Every object looks up its properties by name once at discovery. A missing
//! mandatory property drops the object, a missing optional property disables
//! the corresponding capability.

use {
    crate::{
        format,
        hwc::{
            HwcError,
            device::DeviceId,
            layer::{ALPHA_OPAQUE, BlendMode, ColorSpace, LayerData, LayerTransform, SampleRange},
        },
        utils::{bitflags::BitflagsExt, errorfmt::ErrorFmt},
        video::drm::{
            Change, ConnectorStatus, ConnectorType, DrmBlob, DrmConnector, DrmCrtc, DrmDevice,
            DrmEncoder, DrmError, DrmModeInfo, DrmObject, DrmPlane, DrmProperty,
            DrmPropertyType, ObjectChange, get_object_properties,
        },
    },
    ahash::AHashMap,
    bstr::{BStr, BString, ByteSlice},
    parking_lot::Mutex,
    std::{
        fmt::{Debug, Formatter},
        sync::{
            Arc,
            atomic::{AtomicU32, Ordering::Relaxed},
        },
    },
};

linear_ids!(ModeIds, ModeId);

#[derive(Clone, Debug)]
pub struct KmsProperty {
    pub id: DrmProperty,
    pub name: BString,
    pub ty: DrmPropertyType,
    /// The value at discovery time.
    pub value: u64,
    pub immutable: bool,
}

impl KmsProperty {
    /// Looks up the value of an enum entry. For bitmask properties this is the
    /// bit to set, not the bit index.
    pub fn enum_value(&self, name: &str) -> Option<u64> {
        let DrmPropertyType::Enum { values, bitmask } = &self.ty else {
            return None;
        };
        let v = values.iter().find(|v| v.name == name.as_bytes())?;
        match bitmask {
            true => 1u64.checked_shl(v.value as u32),
            false => Some(v.value),
        }
    }

    pub fn enum_name(&self, value: u64) -> Option<&BStr> {
        let DrmPropertyType::Enum { values, bitmask } = &self.ty else {
            return None;
        };
        values
            .iter()
            .find(|v| match bitmask {
                true => 1u64.checked_shl(v.value as u32) == Some(value),
                false => v.value == value,
            })
            .map(|v| v.name.as_bstr())
    }

    pub fn range(&self) -> Option<(u64, u64)> {
        match self.ty {
            DrmPropertyType::Range { min, max } => Some((min, max)),
            DrmPropertyType::SignedRange { min, max } => Some((min as u64, max as u64)),
            _ => None,
        }
    }

    pub fn set(&self, change: &mut ObjectChange, value: u64) {
        change.change(self.id, value);
    }
}

pub struct CollectedProperties {
    obj: String,
    props: AHashMap<BString, KmsProperty>,
}

impl CollectedProperties {
    pub fn collect<T: DrmObject + Copy + Debug>(
        drm: &dyn DrmDevice,
        t: T,
    ) -> Result<Self, DrmError> {
        let mut props = AHashMap::new();
        for prop in get_object_properties(drm, t)? {
            let def = drm.get_property(prop.id)?;
            props.insert(
                def.name.clone(),
                KmsProperty {
                    id: def.id,
                    name: def.name,
                    ty: def.ty,
                    value: prop.value,
                    immutable: def.immutable,
                },
            );
        }
        Ok(Self {
            obj: format!("{:?}", t),
            props,
        })
    }

    pub fn required(&mut self, name: &str) -> Result<KmsProperty, DrmError> {
        match self.props.remove(name.as_bytes().as_bstr()) {
            Some(p) => Ok(p),
            _ => Err(DrmError::MissingProperty(name.to_string().into_boxed_str())),
        }
    }

    pub fn optional(&mut self, name: &str) -> Option<KmsProperty> {
        let res = self.props.remove(name.as_bytes().as_bstr());
        if res.is_none() {
            log::debug!("{} has no `{}` property", self.obj, name);
        }
        res
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PlaneType {
    Primary,
    Overlay,
    Cursor,
}

/// The kernel values of the rotation bitmask entries that a plane supports.
#[derive(Copy, Clone, Debug, Default)]
pub struct RotationBits {
    pub rotate_0: Option<u64>,
    pub rotate_90: Option<u64>,
    pub rotate_180: Option<u64>,
    pub rotate_270: Option<u64>,
    pub reflect_x: Option<u64>,
    pub reflect_y: Option<u64>,
}

impl RotationBits {
    fn new(prop: &KmsProperty) -> Self {
        Self {
            rotate_0: prop.enum_value("rotate-0"),
            rotate_90: prop.enum_value("rotate-90"),
            rotate_180: prop.enum_value("rotate-180"),
            rotate_270: prop.enum_value("rotate-270"),
            reflect_x: prop.enum_value("reflect-x"),
            reflect_y: prop.enum_value("reflect-y"),
        }
    }

    /// Converts a layer transform to the rotation property value.
    ///
    /// Layer rotations are clockwise, kernel rotations counter-clockwise. If
    /// several rotations are set, 90 takes precedence over 180 over 270.
    pub fn to_drm(&self, transform: LayerTransform) -> Option<u64> {
        let mut v = 0;
        if transform.contains(LayerTransform::FLIP_H) {
            v |= self.reflect_x?;
        }
        if transform.contains(LayerTransform::FLIP_V) {
            v |= self.reflect_y?;
        }
        v |= if transform.contains(LayerTransform::ROTATE_90) {
            self.rotate_270?
        } else if transform.contains(LayerTransform::ROTATE_180) {
            self.rotate_180?
        } else if transform.contains(LayerTransform::ROTATE_270) {
            self.rotate_90?
        } else {
            self.rotate_0?
        };
        Some(v)
    }
}

fn enum_map<K: Copy + Eq + std::hash::Hash>(
    prop: Option<&KmsProperty>,
    names: &[(K, &str)],
) -> AHashMap<K, u64> {
    let mut map = AHashMap::new();
    if let Some(prop) = prop {
        for &(k, name) in names {
            if let Some(v) = prop.enum_value(name) {
                map.insert(k, v);
            }
        }
    }
    map
}

const BLEND_NAMES: &[(BlendMode, &str)] = &[
    (BlendMode::None, "None"),
    (BlendMode::Premultiplied, "Pre-multiplied"),
    (BlendMode::Coverage, "Coverage"),
];

const ENCODING_NAMES: &[(ColorSpace, &str)] = &[
    (ColorSpace::Bt601, "ITU-R BT.601 YCbCr"),
    (ColorSpace::Bt709, "ITU-R BT.709 YCbCr"),
    (ColorSpace::Bt2020, "ITU-R BT.2020 YCbCr"),
];

const RANGE_NAMES: &[(SampleRange, &str)] = &[
    (SampleRange::Limited, "YCbCr limited range"),
    (SampleRange::Full, "YCbCr full range"),
];

pub struct KmsPlane {
    pub dev: DeviceId,
    pub id: DrmPlane,
    pub ty: PlaneType,
    pub possible_crtcs: u32,
    pub formats: Vec<u32>,
    pub has_yuv: bool,

    pub crtc_id: KmsProperty,
    pub fb_id: KmsProperty,
    pub crtc_x: KmsProperty,
    pub crtc_y: KmsProperty,
    pub crtc_w: KmsProperty,
    pub crtc_h: KmsProperty,
    pub src_x: KmsProperty,
    pub src_y: KmsProperty,
    pub src_w: KmsProperty,
    pub src_h: KmsProperty,

    pub zpos: Option<KmsProperty>,
    pub rotation: Option<KmsProperty>,
    pub alpha: Option<KmsProperty>,
    pub blend_mode: Option<KmsProperty>,
    pub in_fence_fd: Option<KmsProperty>,
    pub color_encoding: Option<KmsProperty>,
    pub color_range: Option<KmsProperty>,

    rotations: RotationBits,
    blend_modes: AHashMap<BlendMode, u64>,
    encodings: AHashMap<ColorSpace, u64>,
    ranges: AHashMap<SampleRange, u64>,
}

impl Debug for KmsPlane {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KmsPlane")
            .field("id", &self.id)
            .field("ty", &self.ty)
            .field("possible_crtcs", &self.possible_crtcs)
            .finish_non_exhaustive()
    }
}

impl KmsPlane {
    fn new(dev: DeviceId, drm: &dyn DrmDevice, id: DrmPlane) -> Result<Self, DrmError> {
        let info = drm.get_plane_info(id)?;
        let mut props = CollectedProperties::collect(drm, id)?;
        let ty = props.required("type")?;
        let ty = match &ty.ty {
            DrmPropertyType::Enum { values, .. } => 'ty: {
                for v in values {
                    if v.value == ty.value {
                        match v.name.as_bytes() {
                            b"Overlay" => break 'ty PlaneType::Overlay,
                            b"Primary" => break 'ty PlaneType::Primary,
                            b"Cursor" => break 'ty PlaneType::Cursor,
                            _ => return Err(DrmError::UnknownPlaneType(v.name.to_owned())),
                        }
                    }
                }
                return Err(DrmError::InvalidPlaneType(ty.value));
            }
            _ => return Err(DrmError::InvalidPlaneTypeProperty),
        };
        let has_yuv = info.format_types.iter().any(|&f| format::is_yuv(f));
        let rotation = props.optional("rotation");
        let blend_mode = props.optional("pixel blend mode");
        let (color_encoding, color_range) = match has_yuv {
            true => (
                props.optional("COLOR_ENCODING"),
                props.optional("COLOR_RANGE"),
            ),
            false => (None, None),
        };
        Ok(Self {
            dev,
            id,
            ty,
            possible_crtcs: info.possible_crtcs,
            has_yuv,
            crtc_id: props.required("CRTC_ID")?,
            fb_id: props.required("FB_ID")?,
            crtc_x: props.required("CRTC_X")?,
            crtc_y: props.required("CRTC_Y")?,
            crtc_w: props.required("CRTC_W")?,
            crtc_h: props.required("CRTC_H")?,
            src_x: props.required("SRC_X")?,
            src_y: props.required("SRC_Y")?,
            src_w: props.required("SRC_W")?,
            src_h: props.required("SRC_H")?,
            zpos: props.optional("zpos"),
            alpha: props.optional("alpha"),
            in_fence_fd: props.optional("IN_FENCE_FD"),
            rotations: rotation.as_ref().map(RotationBits::new).unwrap_or_default(),
            blend_modes: enum_map(blend_mode.as_ref(), BLEND_NAMES),
            encodings: enum_map(color_encoding.as_ref(), ENCODING_NAMES),
            ranges: enum_map(color_range.as_ref(), RANGE_NAMES),
            rotation,
            blend_mode,
            color_encoding,
            color_range,
            formats: info.format_types,
        })
    }

    pub fn supports_crtc(&self, crtc: &KmsCrtc) -> bool {
        1u32.checked_shl(crtc.index as u32).is_some_and(|b| self.possible_crtcs.contains(b))
    }

    pub fn supports_format(&self, format: u32) -> bool {
        self.formats.contains(&format)
    }

    pub fn supports_transform(&self, transform: LayerTransform) -> bool {
        match self.rotation {
            Some(_) => self.rotations.to_drm(transform).is_some(),
            None => transform.is_identity(),
        }
    }

    /// Whether this plane can display the layer without help.
    pub fn is_valid_for_layer(&self, layer: &LayerData) -> bool {
        if !self.supports_transform(layer.transform) {
            log::debug!("{:?} cannot apply transform {:?}", self.id, layer.transform);
            return false;
        }
        if layer.alpha != ALPHA_OPAQUE && self.alpha.is_none() {
            log::debug!("{:?} does not support plane alpha", self.id);
            return false;
        }
        if !self.blend_modes.contains_key(&layer.blend)
            && !matches!(layer.blend, BlendMode::None | BlendMode::Premultiplied)
        {
            log::debug!("{:?} does not support blend mode {:?}", self.id, layer.blend);
            return false;
        }
        if !self.supports_format(layer.format) {
            log::debug!(
                "{:?} does not support format {:?}",
                self.id,
                format::debug(layer.format)
            );
            return false;
        }
        true
    }

    /// Writes the properties that present `layer` on `crtc` at `zpos`.
    pub fn atomic_set(
        &self,
        change: &mut Change,
        crtc: &KmsCrtc,
        layer: &LayerData,
        zpos: u32,
    ) -> Result<(), HwcError> {
        let rotation = match &self.rotation {
            Some(_) => match self.rotations.to_drm(layer.transform) {
                Some(r) => Some(r),
                None => return Err(HwcError::UnsupportedTransform(self.id)),
            },
            None if layer.transform.is_identity() => None,
            None => return Err(HwcError::UnsupportedTransform(self.id)),
        };
        let dst = &layer.display_frame;
        let src = &layer.source_crop;
        let yuv = format::is_yuv(layer.format);
        change.change_object(self.id, |c| {
            self.crtc_id.set(c, crtc.id.0 as u64);
            self.fb_id.set(c, layer.fb.id().0 as u64);
            self.crtc_x.set(c, dst.left as i64 as u64);
            self.crtc_y.set(c, dst.top as i64 as u64);
            self.crtc_w.set(c, dst.width() as i64 as u64);
            self.crtc_h.set(c, dst.height() as i64 as u64);
            self.src_x.set(c, to_fixed_16_16(src.left));
            self.src_y.set(c, to_fixed_16_16(src.top));
            self.src_w.set(c, to_fixed_16_16(src.width()));
            self.src_h.set(c, to_fixed_16_16(src.height()));
            if let Some(p) = &self.zpos {
                p.set(c, zpos as u64);
            }
            if let Some(p) = &self.rotation
                && let Some(r) = rotation
            {
                p.set(c, r);
            }
            if let Some(p) = &self.alpha {
                p.set(c, layer.alpha as u64);
            }
            if let Some(p) = &self.blend_mode
                && let Some(&v) = self.blend_modes.get(&layer.blend)
            {
                p.set(c, v);
            }
            if let Some(p) = &self.in_fence_fd
                && let Some(fence) = &layer.acquire_fence
            {
                p.set(c, fence.raw() as i64 as u64);
            }
            if yuv {
                if let Some(p) = &self.color_encoding
                    && let Some(&v) = self.encodings.get(&layer.color_space)
                {
                    p.set(c, v);
                }
                if let Some(p) = &self.color_range
                    && let Some(&v) = self.ranges.get(&layer.sample_range)
                {
                    p.set(c, v);
                }
            }
        });
        Ok(())
    }

    /// Detaches the plane from whatever CRTC it scans out on.
    pub fn atomic_disable(&self, change: &mut Change) {
        change.change_object(self.id, |c| {
            self.crtc_id.set(c, 0);
            self.fb_id.set(c, 0);
        });
    }
}

/// Converts a buffer coordinate to the kernel's 16.16 fixed point format.
///
/// The value is rounded to the nearest representable value. Negative
/// coordinates are clamped to 0.
pub fn to_fixed_16_16(v: f32) -> u64 {
    let v = (v as f64 * 65536.0).round();
    if v <= 0.0 {
        return 0;
    }
    v as u64
}

pub struct KmsCrtc {
    pub dev: DeviceId,
    pub id: DrmCrtc,
    /// The position in the kernel's CRTC array. Used in possible-CRTC masks.
    pub index: usize,
    pub active: KmsProperty,
    pub mode_id: KmsProperty,
    pub out_fence_ptr: Option<KmsProperty>,
}

impl Debug for KmsCrtc {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KmsCrtc")
            .field("id", &self.id)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl KmsCrtc {
    fn new(
        dev: DeviceId,
        drm: &dyn DrmDevice,
        id: DrmCrtc,
        index: usize,
    ) -> Result<Self, DrmError> {
        let mut props = CollectedProperties::collect(drm, id)?;
        Ok(Self {
            dev,
            id,
            index,
            active: props.required("ACTIVE")?,
            mode_id: props.required("MODE_ID")?,
            out_fence_ptr: props.optional("OUT_FENCE_PTR"),
        })
    }

    /// The mode blob that was active at discovery.
    pub fn initial_mode_blob(&self) -> DrmBlob {
        DrmBlob(self.mode_id.value as u32)
    }
}

pub struct KmsEncoder {
    pub dev: DeviceId,
    pub id: DrmEncoder,
    pub index: usize,
    pub possible_crtcs: u32,
    current_crtc: AtomicU32,
}

impl Debug for KmsEncoder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KmsEncoder")
            .field("id", &self.id)
            .field("current_crtc", &self.current_crtc())
            .finish_non_exhaustive()
    }
}

impl KmsEncoder {
    fn new(
        dev: DeviceId,
        drm: &dyn DrmDevice,
        id: DrmEncoder,
        index: usize,
    ) -> Result<Self, DrmError> {
        let info = drm.get_encoder_info(id)?;
        Ok(Self {
            dev,
            id,
            index,
            possible_crtcs: info.possible_crtcs,
            current_crtc: AtomicU32::new(info.crtc_id.0),
        })
    }

    /// The CRTC the kernel currently routes to this encoder, if any.
    pub fn current_crtc(&self) -> DrmCrtc {
        DrmCrtc(self.current_crtc.load(Relaxed))
    }

    pub fn supports_crtc(&self, crtc: &KmsCrtc) -> bool {
        1u32.checked_shl(crtc.index as u32).is_some_and(|b| self.possible_crtcs.contains(b))
    }

    pub fn refresh(&self, drm: &dyn DrmDevice) -> Result<(), DrmError> {
        let info = drm.get_encoder_info(self.id)?;
        self.current_crtc.store(info.crtc_id.0, Relaxed);
        Ok(())
    }
}

#[derive(Debug)]
pub struct KmsMode {
    pub id: ModeId,
    pub info: DrmModeInfo,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConnectorCategory {
    Internal,
    External,
    Writeback,
}

impl ConnectorCategory {
    pub fn classify(ty: ConnectorType, writeback: bool) -> Option<Self> {
        let cat = match ty {
            ConnectorType::LVDS
            | ConnectorType::eDP
            | ConnectorType::DSI
            | ConnectorType::VIRTUAL
            | ConnectorType::DPI
            | ConnectorType::SPI => Self::Internal,
            ConnectorType::HDMIA
            | ConnectorType::DisplayPort
            | ConnectorType::DVID
            | ConnectorType::DVII
            | ConnectorType::VGA
            | ConnectorType::USB => Self::External,
            ConnectorType::WRITEBACK if writeback => Self::Writeback,
            _ => return None,
        };
        Some(cat)
    }
}

#[derive(Debug)]
pub struct WritebackProperties {
    pub pixel_formats: KmsProperty,
    pub fb_id: KmsProperty,
    pub out_fence_ptr: KmsProperty,
}

#[derive(Debug)]
pub struct ConnectorState {
    pub status: ConnectorStatus,
    pub modes: Vec<Arc<KmsMode>>,
    pub active_mode: Option<Arc<KmsMode>>,
    pub current_encoder: DrmEncoder,
    pub mm_width: u32,
    pub mm_height: u32,
}

pub struct KmsConnector {
    pub dev: DeviceId,
    pub id: DrmConnector,
    pub ty: ConnectorType,
    pub type_id: u32,
    pub category: ConnectorCategory,
    pub encoders: Vec<DrmEncoder>,
    pub crtc_id: KmsProperty,
    pub edid: Option<KmsProperty>,
    pub link_status: Option<KmsProperty>,
    pub writeback: Option<WritebackProperties>,
    state: Mutex<ConnectorState>,
    mode_ids: ModeIds,
}

impl Debug for KmsConnector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KmsConnector")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

impl KmsConnector {
    fn new(
        dev: DeviceId,
        drm: &dyn DrmDevice,
        id: DrmConnector,
        writeback: bool,
    ) -> Result<Option<Self>, DrmError> {
        let info = drm.get_connector_info(id, true)?;
        let ty = ConnectorType::from_drm(info.connector_type);
        let Some(category) = ConnectorCategory::classify(ty, writeback) else {
            log::debug!("Ignoring connector {} of type {}", id, ty);
            return Ok(None);
        };
        let mut props = CollectedProperties::collect(drm, id)?;
        let writeback = match category {
            ConnectorCategory::Writeback => Some(WritebackProperties {
                pixel_formats: props.required("WRITEBACK_PIXEL_FORMATS")?,
                fb_id: props.required("WRITEBACK_FB_ID")?,
                out_fence_ptr: props.required("WRITEBACK_OUT_FENCE_PTR")?,
            }),
            _ => None,
        };
        let mode_ids = ModeIds::default();
        let modes = info
            .modes
            .into_iter()
            .map(|info| {
                Arc::new(KmsMode {
                    id: mode_ids.next(),
                    info,
                })
            })
            .collect();
        Ok(Some(Self {
            dev,
            id,
            ty,
            type_id: info.connector_type_id,
            category,
            encoders: info.encoders,
            crtc_id: props.required("CRTC_ID")?,
            edid: props.optional("EDID"),
            link_status: props.optional("link-status"),
            writeback,
            state: Mutex::new(ConnectorState {
                status: ConnectorStatus::from_drm(info.connection),
                modes,
                active_mode: None,
                current_encoder: info.encoder_id,
                mm_width: info.mm_width,
                mm_height: info.mm_height,
            }),
            mode_ids,
        }))
    }

    /// The name user space conventionally uses for this connector, e.g.
    /// `HDMI-A-1`.
    pub fn name(&self) -> String {
        format!("{}-{}", self.ty, self.type_id)
    }

    pub fn is_internal(&self) -> bool {
        self.category == ConnectorCategory::Internal
    }

    pub fn is_external(&self) -> bool {
        self.category == ConnectorCategory::External
    }

    pub fn is_writeback(&self) -> bool {
        self.category == ConnectorCategory::Writeback
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().status == ConnectorStatus::Connected
    }

    pub fn status(&self) -> ConnectorStatus {
        self.state.lock().status
    }

    pub fn modes(&self) -> Vec<Arc<KmsMode>> {
        self.state.lock().modes.clone()
    }

    /// The mode flagged as preferred by the kernel, else the first mode.
    pub fn preferred_mode(&self) -> Option<Arc<KmsMode>> {
        let state = self.state.lock();
        state
            .modes
            .iter()
            .find(|m| m.info.is_preferred())
            .or_else(|| state.modes.first())
            .cloned()
    }

    pub fn active_mode(&self) -> Option<Arc<KmsMode>> {
        self.state.lock().active_mode.clone()
    }

    pub fn set_active_mode(&self, mode: Option<Arc<KmsMode>>) {
        self.state.lock().active_mode = mode;
    }

    pub fn current_encoder(&self) -> DrmEncoder {
        self.state.lock().current_encoder
    }

    pub fn physical_size(&self) -> (u32, u32) {
        let state = self.state.lock();
        (state.mm_width, state.mm_height)
    }

    /// Re-queries the connector and merges the reported modes into the
    /// existing list. Modes that compare equal to a known mode keep their
    /// identity.
    pub fn update_modes(&self, drm: &dyn DrmDevice) -> Result<(), DrmError> {
        let info = drm.get_connector_info(self.id, true)?;
        let mut state = self.state.lock();
        let mut modes: Vec<Arc<KmsMode>> = Vec::with_capacity(info.modes.len());
        for mi in info.modes {
            if modes.iter().any(|m| m.info == mi) {
                continue;
            }
            let mode = match state.modes.iter().find(|m| m.info == mi) {
                Some(m) => m.clone(),
                _ => Arc::new(KmsMode {
                    id: self.mode_ids.next(),
                    info: mi,
                }),
            };
            modes.push(mode);
        }
        state.modes = modes;
        state.status = ConnectorStatus::from_drm(info.connection);
        state.current_encoder = info.encoder_id;
        state.mm_width = info.mm_width;
        state.mm_height = info.mm_height;
        Ok(())
    }
}

/// All usable objects of a device.
#[derive(Debug, Default)]
pub struct KmsResources {
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    pub connectors: Vec<Arc<KmsConnector>>,
    pub encoders: Vec<Arc<KmsEncoder>>,
    pub crtcs: Vec<Arc<KmsCrtc>>,
    pub planes: Vec<Arc<KmsPlane>>,
}

impl KmsResources {
    /// Reads the resource model of a device.
    ///
    /// Failing to enumerate the objects is fatal. Objects that cannot be
    /// queried or lack mandatory properties are logged and skipped.
    pub fn discover(
        dev: DeviceId,
        drm: &dyn DrmDevice,
        writeback: bool,
    ) -> Result<Self, DrmError> {
        let resources = drm.get_resources()?;
        let plane_ids = drm.get_planes()?;
        let mut res = Self {
            min_width: resources.min_width,
            max_width: resources.max_width,
            min_height: resources.min_height,
            max_height: resources.max_height,
            ..Default::default()
        };
        for (index, &crtc) in resources.crtcs.iter().enumerate() {
            match KmsCrtc::new(dev, drm, crtc, index) {
                Ok(c) => res.crtcs.push(Arc::new(c)),
                Err(e) => log::warn!("Skipping CRTC {}: {}", crtc, ErrorFmt(e)),
            }
        }
        for (index, &encoder) in resources.encoders.iter().enumerate() {
            match KmsEncoder::new(dev, drm, encoder, index) {
                Ok(e) => res.encoders.push(Arc::new(e)),
                Err(e) => log::warn!("Skipping encoder {}: {}", encoder, ErrorFmt(e)),
            }
        }
        for &connector in &resources.connectors {
            match KmsConnector::new(dev, drm, connector, writeback) {
                Ok(Some(c)) => res.connectors.push(Arc::new(c)),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping connector {}: {}", connector, ErrorFmt(e)),
            }
        }
        for plane in plane_ids {
            match KmsPlane::new(dev, drm, plane) {
                Ok(p) => res.planes.push(Arc::new(p)),
                Err(e) => log::warn!("Skipping plane {}: {}", plane, ErrorFmt(e)),
            }
        }
        Ok(res)
    }

    pub fn crtc(&self, id: DrmCrtc) -> Option<&Arc<KmsCrtc>> {
        self.crtcs.iter().find(|c| c.id == id)
    }

    pub fn encoder(&self, id: DrmEncoder) -> Option<&Arc<KmsEncoder>> {
        self.encoders.iter().find(|e| e.id == id)
    }

    pub fn connector(&self, id: DrmConnector) -> Option<&Arc<KmsConnector>> {
        self.connectors.iter().find(|c| c.id == id)
    }

    pub fn plane(&self, id: DrmPlane) -> Option<&Arc<KmsPlane>> {
        self.planes.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests;
