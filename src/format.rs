use {
    ahash::AHashMap,
    std::{
        fmt::{Debug, Formatter, Write},
        sync::LazyLock,
    },
};

#[derive(Copy, Clone, Debug)]
pub struct Format {
    pub name: &'static str,
    pub drm: u32,
    pub has_alpha: bool,
    /// Whether the format stores luma/chroma rather than RGB samples.
    pub yuv: bool,
}

impl PartialEq for Format {
    fn eq(&self, other: &Self) -> bool {
        self.drm == other.drm
    }
}

impl Eq for Format {}

static FORMATS_MAP: LazyLock<AHashMap<u32, &'static Format>> = LazyLock::new(|| {
    let mut map = AHashMap::new();
    for &format in FORMATS {
        assert!(map.insert(format.drm, format).is_none());
    }
    map
});

pub fn formats() -> &'static AHashMap<u32, &'static Format> {
    &FORMATS_MAP
}

/// Whether `fourcc` names a YUV format. Unknown formats are treated as RGB.
pub fn is_yuv(fourcc: u32) -> bool {
    formats().get(&fourcc).map(|f| f.yuv).unwrap_or(false)
}

pub const fn fourcc_code(a: char, b: char, c: char, d: char) -> u32 {
    (a as u32) | ((b as u32) << 8) | ((c as u32) << 16) | ((d as u32) << 24)
}

pub struct FourccDebug(u32);

impl Debug for FourccDebug {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(format) = formats().get(&self.0) {
            return f.write_str(format.name);
        }
        for shift in [0, 8, 16, 24] {
            let c = (self.0 >> shift) as u8;
            if c.is_ascii_graphic() || c == b' ' {
                f.write_char(c as char)?;
            } else {
                write!(f, "\\x{:02x}", c)?;
            }
        }
        Ok(())
    }
}

pub fn debug(fourcc: u32) -> FourccDebug {
    FourccDebug(fourcc)
}

macro_rules! drm_format {
    ($id:ident, $name:expr, $a:expr, $b:expr, $c:expr, $d:expr, $alpha:expr, $yuv:expr) => {
        pub static $id: &Format = &Format {
            name: $name,
            drm: fourcc_code($a, $b, $c, $d),
            has_alpha: $alpha,
            yuv: $yuv,
        };
    };
}

drm_format!(ARGB8888, "argb8888", 'A', 'R', '2', '4', true, false);
drm_format!(XRGB8888, "xrgb8888", 'X', 'R', '2', '4', false, false);
drm_format!(ABGR8888, "abgr8888", 'A', 'B', '2', '4', true, false);
drm_format!(XBGR8888, "xbgr8888", 'X', 'B', '2', '4', false, false);
drm_format!(RGBA8888, "rgba8888", 'R', 'A', '2', '4', true, false);
drm_format!(RGBX8888, "rgbx8888", 'R', 'X', '2', '4', false, false);
drm_format!(BGRA8888, "bgra8888", 'B', 'A', '2', '4', true, false);
drm_format!(BGRX8888, "bgrx8888", 'B', 'X', '2', '4', false, false);
drm_format!(RGB888, "rgb888", 'R', 'G', '2', '4', false, false);
drm_format!(BGR888, "bgr888", 'B', 'G', '2', '4', false, false);
drm_format!(RGB565, "rgb565", 'R', 'G', '1', '6', false, false);
drm_format!(BGR565, "bgr565", 'B', 'G', '1', '6', false, false);
drm_format!(ARGB2101010, "argb2101010", 'A', 'R', '3', '0', true, false);
drm_format!(XRGB2101010, "xrgb2101010", 'X', 'R', '3', '0', false, false);
drm_format!(ABGR2101010, "abgr2101010", 'A', 'B', '3', '0', true, false);
drm_format!(XBGR2101010, "xbgr2101010", 'X', 'B', '3', '0', false, false);
drm_format!(ABGR16161616F, "abgr16161616f", 'A', 'B', '4', 'H', true, false);
drm_format!(XBGR16161616F, "xbgr16161616f", 'X', 'B', '4', 'H', false, false);
drm_format!(NV12, "nv12", 'N', 'V', '1', '2', false, true);
drm_format!(NV21, "nv21", 'N', 'V', '2', '1', false, true);
drm_format!(NV16, "nv16", 'N', 'V', '1', '6', false, true);
drm_format!(P010, "p010", 'P', '0', '1', '0', false, true);
drm_format!(YUV420, "yuv420", 'Y', 'U', '1', '2', false, true);
drm_format!(YVU420, "yvu420", 'Y', 'V', '1', '2', false, true);
drm_format!(YUYV, "yuyv", 'Y', 'U', 'Y', 'V', false, true);
drm_format!(UYVY, "uyvy", 'U', 'Y', 'V', 'Y', false, true);

pub static FORMATS: &[&Format] = &[
    ARGB8888,
    XRGB8888,
    ABGR8888,
    XBGR8888,
    RGBA8888,
    RGBX8888,
    BGRA8888,
    BGRX8888,
    RGB888,
    BGR888,
    RGB565,
    BGR565,
    ARGB2101010,
    XRGB2101010,
    ABGR2101010,
    XBGR2101010,
    ABGR16161616F,
    XBGR16161616F,
    NV12,
    NV21,
    NV16,
    P010,
    YUV420,
    YVU420,
    YUYV,
    UYVY,
];

#[test]
fn formats_dont_panic() {
    let map = formats();
    assert_eq!(map.len(), FORMATS.len());
    assert_eq!(map.get(&XRGB8888.drm).map(|f| f.name), Some("xrgb8888"));
}

#[test]
fn fourcc() {
    assert_eq!(XRGB8888.drm, 0x34325258);
    assert!(is_yuv(NV12.drm));
    assert!(!is_yuv(ARGB8888.drm));
    assert!(!is_yuv(fourcc_code('?', '?', '?', '?')));
    assert_eq!(format!("{:?}", debug(NV12.drm)), "nv12");
    assert_eq!(format!("{:?}", debug(fourcc_code('Q', '1', '2', '3'))), "Q123");
}
