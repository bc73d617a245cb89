use {
    crate::{
        format::{ARGB8888, NV12, XRGB8888},
        hwc::{
            device::DeviceId,
            layer::{BlendMode, LayerData, LayerTransform},
            resources::{ConnectorCategory, KmsResources, PlaneType, to_fixed_16_16},
            test_drm::{ALL_OPTIONAL_PLANE_PROPS, FakeDrm, FakeFb, mode},
        },
        video::drm::{Change, ConnectorType, DrmFb},
    },
    std::sync::Arc,
};

fn dev() -> DeviceId {
    DeviceId::from_raw(1)
}

fn layer(format: u32) -> LayerData {
    LayerData::new(Arc::new(FakeFb(DrmFb(1))), format, 64, 64)
}

#[test]
fn discovery() {
    let drm = FakeDrm::new();
    let c0 = drm.add_crtc(true);
    let c1 = drm.add_crtc(false);
    let enc = drm.add_encoder(0b11);
    drm.add_connector(ConnectorType::eDP, &[enc], true, vec![mode(1920, 1080, true)]);
    drm.add_plane("Primary", 0b01, &[XRGB8888.drm], &[]);
    drm.add_plane("Overlay", 0b11, &[XRGB8888.drm], &["zpos"]);
    drm.add_plane("Cursor", 0b11, &[ARGB8888.drm], &[]);
    let res = KmsResources::discover(dev(), &*drm, false).unwrap();
    assert_eq!(res.crtcs.len(), 2);
    assert_eq!(res.crtcs[0].id, c0);
    assert_eq!(res.crtcs[1].index, 1);
    assert!(res.crtcs[0].out_fence_ptr.is_some());
    assert!(res.crtc(c1).unwrap().out_fence_ptr.is_none());
    assert_eq!(res.encoders.len(), 1);
    assert_eq!(res.connectors.len(), 1);
    assert_eq!(res.connectors[0].name(), "eDP-1");
    assert!(res.connectors[0].is_connected());
    let types: Vec<_> = res.planes.iter().map(|p| p.ty).collect();
    assert_eq!(
        types,
        [PlaneType::Primary, PlaneType::Overlay, PlaneType::Cursor]
    );
    assert!(res.planes[1].zpos.is_some());
    assert!(res.planes[0].zpos.is_none());
    assert!(res.planes[0].supports_crtc(&res.crtcs[0]));
    assert!(!res.planes[0].supports_crtc(&res.crtcs[1]));
}

#[test]
fn crtc_index_beyond_mask() {
    let drm = FakeDrm::new();
    drm.add_crtc(false);
    drm.add_encoder(u32::MAX);
    drm.add_plane("Primary", u32::MAX, &[XRGB8888.drm], &[]);
    let mut res = KmsResources::discover(dev(), &*drm, false).unwrap();
    let crtc = Arc::get_mut(&mut res.crtcs[0]).unwrap();
    crtc.index = 40;
    assert!(!res.planes[0].supports_crtc(&res.crtcs[0]));
    assert!(!res.encoders[0].supports_crtc(&res.crtcs[0]));
    Arc::get_mut(&mut res.crtcs[0]).unwrap().index = 31;
    assert!(res.planes[0].supports_crtc(&res.crtcs[0]));
    assert!(res.encoders[0].supports_crtc(&res.crtcs[0]));
}

#[test]
fn missing_mandatory_property_drops_object() {
    let drm = FakeDrm::new();
    let crtc = drm.add_crtc(false);
    let broken_crtc = drm.add_crtc(false);
    drm.remove_property(broken_crtc.0, "MODE_ID");
    let good = drm.add_plane("Primary", 0b1, &[XRGB8888.drm], &[]);
    let broken = drm.add_plane("Overlay", 0b1, &[XRGB8888.drm], &[]);
    drm.remove_property(broken.0, "SRC_W");
    let res = KmsResources::discover(dev(), &*drm, false).unwrap();
    assert_eq!(res.crtcs.len(), 1);
    assert_eq!(res.crtcs[0].id, crtc);
    assert_eq!(res.crtcs[0].index, 0);
    assert_eq!(res.planes.len(), 1);
    assert_eq!(res.planes[0].id, good);
}

#[test]
fn connector_categories() {
    let drm = FakeDrm::new();
    drm.add_connector(ConnectorType::DSI, &[], false, vec![]);
    drm.add_connector(ConnectorType::HDMIA, &[], false, vec![]);
    drm.add_connector(ConnectorType::Composite, &[], false, vec![]);
    drm.add_connector(ConnectorType::WRITEBACK, &[], false, vec![]);
    let res = KmsResources::discover(dev(), &*drm, false).unwrap();
    let cats: Vec<_> = res.connectors.iter().map(|c| c.category).collect();
    assert_eq!(cats, [ConnectorCategory::Internal, ConnectorCategory::External]);
    let res = KmsResources::discover(dev(), &*drm, true).unwrap();
    assert_eq!(res.connectors.len(), 3);
    assert!(res.connectors[2].is_writeback());
    assert!(res.connectors[2].writeback.is_some());
}

#[test]
fn update_modes_preserves_identity() {
    let drm = FakeDrm::new();
    let a = mode(1920, 1080, true);
    let b = mode(1280, 720, false);
    let conn = drm.add_connector(ConnectorType::HDMIA, &[], true, vec![a.clone()]);
    let res = KmsResources::discover(dev(), &*drm, false).unwrap();
    let connector = &res.connectors[0];
    let before = connector.modes();
    drm.set_modes(conn, vec![b.clone(), a.clone(), a.clone()]);
    drm.set_connected(conn, false);
    connector.update_modes(&*drm).unwrap();
    let after = connector.modes();
    assert_eq!(after.len(), 2);
    assert!(Arc::ptr_eq(&before[0], &after[1]));
    assert_eq!(after[0].info, b);
    assert_ne!(after[0].id, after[1].id);
    assert!(!connector.is_connected());
    assert!(Arc::ptr_eq(&connector.preferred_mode().unwrap(), &before[0]));
}

#[test]
fn plane_capabilities() {
    let drm = FakeDrm::new();
    drm.add_crtc(false);
    drm.add_plane("Primary", 0b1, &[XRGB8888.drm], &[]);
    drm.add_plane(
        "Overlay",
        0b1,
        &[XRGB8888.drm, ARGB8888.drm],
        &["rotation", "alpha", "pixel blend mode"],
    );
    let res = KmsResources::discover(dev(), &*drm, false).unwrap();
    let (bare, full) = (&res.planes[0], &res.planes[1]);

    assert!(bare.is_valid_for_layer(&layer(XRGB8888.drm)));
    assert!(!bare.is_valid_for_layer(&layer(ARGB8888.drm)));

    let mut rotated = layer(XRGB8888.drm);
    rotated.transform = LayerTransform::ROTATE_90 | LayerTransform::FLIP_H;
    assert!(!bare.is_valid_for_layer(&rotated));
    assert!(full.is_valid_for_layer(&rotated));

    let mut translucent = layer(XRGB8888.drm);
    translucent.alpha = 0x8000;
    assert!(!bare.is_valid_for_layer(&translucent));
    assert!(full.is_valid_for_layer(&translucent));

    let mut coverage = layer(XRGB8888.drm);
    coverage.blend = BlendMode::Coverage;
    assert!(!bare.is_valid_for_layer(&coverage));
    assert!(full.is_valid_for_layer(&coverage));
    coverage.blend = BlendMode::Premultiplied;
    assert!(bare.is_valid_for_layer(&coverage));
}

#[test]
fn atomic_set_writes_plane_state() {
    let drm = FakeDrm::new();
    drm.add_crtc(false);
    drm.add_plane("Overlay", 0b1, &[NV12.drm], ALL_OPTIONAL_PLANE_PROPS);
    drm.add_plane("Primary", 0b1, &[XRGB8888.drm], ALL_OPTIONAL_PLANE_PROPS);
    let res = KmsResources::discover(dev(), &*drm, false).unwrap();
    let (yuv, rgb) = (&res.planes[0], &res.planes[1]);
    assert!(yuv.has_yuv);
    assert!(yuv.color_encoding.is_some());
    assert!(!rgb.has_yuv);
    assert!(rgb.color_encoding.is_none());

    let mut l = layer(NV12.drm);
    l.display_frame.left = -10;
    l.source_crop.left = 0.5;
    l.transform = LayerTransform::ROTATE_90;
    l.blend = BlendMode::Coverage;
    l.color_space = crate::hwc::layer::ColorSpace::Bt709;
    let mut change = Change::new();
    yuv.atomic_set(&mut change, &res.crtcs[0], &l, 3).unwrap();
    let get = |name: &str| {
        let prop = drm.prop_id(name);
        change
            .iter()
            .find(|&(o, p, _)| o == yuv.id.0 && p == prop)
            .map(|(_, _, v)| v)
    };
    assert_eq!(get("CRTC_ID"), Some(res.crtcs[0].id.0 as u64));
    assert_eq!(get("FB_ID"), Some(1));
    assert_eq!(get("CRTC_X"), Some(-10i64 as u64));
    assert_eq!(get("CRTC_W"), Some(74));
    assert_eq!(get("SRC_X"), Some(0x8000));
    assert_eq!(get("SRC_W"), Some((63 << 16) + 0x8000));
    assert_eq!(get("zpos"), Some(3));
    // clockwise 90 is counter-clockwise 270
    assert_eq!(get("rotation"), Some(1 << 3));
    assert_eq!(get("pixel blend mode"), Some(2));
    assert_eq!(get("COLOR_ENCODING"), Some(1));
    assert_eq!(get("COLOR_RANGE"), None);
    assert_eq!(get("IN_FENCE_FD"), None);
}

#[test]
fn fixed_point() {
    assert_eq!(to_fixed_16_16(0.0), 0);
    assert_eq!(to_fixed_16_16(1.0), 1 << 16);
    assert_eq!(to_fixed_16_16(1920.25), (1920 << 16) + (1 << 14));
    assert_eq!(to_fixed_16_16(-3.0), 0);
}
