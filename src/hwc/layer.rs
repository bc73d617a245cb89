use {
    crate::hwc::buffer::Framebuffer,
    std::{
        fmt::{Debug, Formatter},
        sync::Arc,
    },
    uapi::OwnedFd,
};

/// An integer rectangle. `right` and `bottom` are exclusive.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct IRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl IRect {
    pub fn new_sized(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            left: x,
            top: y,
            right: x + width,
            bottom: y + height,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// A rectangle in buffer coordinates. Sub-pixel positions are allowed.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl FRect {
    pub fn new_sized(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            left: x,
            top: y,
            right: x + width,
            bottom: y + height,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Layer transform flags. Rotations are clockwise and are applied after the
/// flips.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct LayerTransform(pub u32);

impl LayerTransform {
    pub const IDENTITY: Self = Self(0);
    pub const FLIP_H: Self = Self(1 << 0);
    pub const FLIP_V: Self = Self(1 << 1);
    pub const ROTATE_90: Self = Self(1 << 2);
    pub const ROTATE_180: Self = Self(1 << 3);
    pub const ROTATE_270: Self = Self(1 << 4);

    pub fn is_identity(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for LayerTransform {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl Debug for LayerTransform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_identity() {
            return f.write_str("IDENTITY");
        }
        let names = [
            (Self::FLIP_H, "FLIP_H"),
            (Self::FLIP_V, "FLIP_V"),
            (Self::ROTATE_90, "ROTATE_90"),
            (Self::ROTATE_180, "ROTATE_180"),
            (Self::ROTATE_270, "ROTATE_270"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum BlendMode {
    None,
    #[default]
    Premultiplied,
    Coverage,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum ColorSpace {
    #[default]
    Undefined,
    Bt601,
    Bt709,
    Bt2020,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum SampleRange {
    #[default]
    Undefined,
    Full,
    Limited,
}

pub const ALPHA_OPAQUE: u16 = u16::MAX;

/// A single layer of a frame as handed over by the composition policy.
#[derive(Clone)]
pub struct LayerData {
    pub display_frame: IRect,
    pub source_crop: FRect,
    /// A fourcc code.
    pub format: u32,
    pub transform: LayerTransform,
    pub blend: BlendMode,
    pub alpha: u16,
    pub color_space: ColorSpace,
    pub sample_range: SampleRange,
    pub fb: Arc<dyn Framebuffer>,
    pub acquire_fence: Option<Arc<OwnedFd>>,
}

impl LayerData {
    /// A full-buffer, opaque, untransformed layer.
    pub fn new(fb: Arc<dyn Framebuffer>, format: u32, width: i32, height: i32) -> Self {
        Self {
            display_frame: IRect::new_sized(0, 0, width, height),
            source_crop: FRect::new_sized(0.0, 0.0, width as f32, height as f32),
            format,
            transform: LayerTransform::IDENTITY,
            blend: BlendMode::None,
            alpha: ALPHA_OPAQUE,
            color_space: ColorSpace::Undefined,
            sample_range: SampleRange::Undefined,
            fb,
            acquire_fence: None,
        }
    }
}

impl Debug for LayerData {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerData")
            .field("display_frame", &self.display_frame)
            .field("source_crop", &self.source_crop)
            .field("format", &crate::format::debug(self.format))
            .field("transform", &self.transform)
            .field("blend", &self.blend)
            .field("alpha", &self.alpha)
            .field("fb", &self.fb.id())
            .finish_non_exhaustive()
    }
}
