use {
    crate::video::{INVALID_MODIFIER, Modifier},
    arrayvec::ArrayVec,
    std::sync::Arc,
    uapi::OwnedFd,
};

#[derive(Clone, Debug)]
pub struct DmaBufPlane {
    pub offset: u32,
    pub stride: u32,
    pub fd: Arc<OwnedFd>,
}

/// A generic buffer descriptor as produced by the platform buffer glue.
#[derive(Debug, Clone)]
pub struct DmaBuf {
    pub width: i32,
    pub height: i32,
    /// A fourcc code.
    pub format: u32,
    pub modifier: Modifier,
    pub planes: PlaneVec<DmaBufPlane>,
}

pub const MAX_PLANES: usize = 4;

pub type PlaneVec<T> = ArrayVec<T, MAX_PLANES>;

impl DmaBuf {
    pub fn new(width: i32, height: i32, format: u32) -> Self {
        Self {
            width,
            height,
            format,
            modifier: INVALID_MODIFIER,
            planes: PlaneVec::new(),
        }
    }
}
