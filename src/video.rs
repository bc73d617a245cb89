pub mod dmabuf;
pub mod drm;

pub type Modifier = u64;

pub const INVALID_MODIFIER: Modifier = 0x00ff_ffff_ffff_ffff;
pub const LINEAR_MODIFIER: Modifier = 0;
