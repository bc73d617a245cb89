use {
    crate::{
        format::XRGB8888,
        hwc::{
            HwcError,
            atomic::AtomicCommitArgs,
            binding::BindingRegistry,
            device::{DeviceId, KmsDevice},
            layer::LayerData,
            pipeline::{DisplayPipeline, PipelineIds, create_pipeline},
            test_drm::{FakeDrm, FakeFb, mode},
        },
        video::drm::{
            ConnectorType, DRM_MODE_ATOMIC_ALLOW_MODESET, DRM_MODE_ATOMIC_TEST_ONLY, DrmFb,
            DrmPlane,
        },
    },
    std::sync::Arc,
};

struct Setup {
    drm: Arc<FakeDrm>,
    pipe: Arc<DisplayPipeline>,
    overlay: DrmPlane,
    _registry: BindingRegistry,
}

fn setup() -> Setup {
    let drm = FakeDrm::new();
    drm.add_crtc(true);
    let enc = drm.add_encoder(0b1);
    drm.add_connector(ConnectorType::HDMIA, &[enc], true, vec![mode(1920, 1080, true)]);
    drm.add_plane("Primary", 0b1, &[XRGB8888.drm], &["zpos"]);
    let overlay = drm.add_plane("Overlay", 0b1, &[XRGB8888.drm], &["zpos"]);
    let dev = Arc::new(KmsDevice::new(DeviceId::from_raw(1), "fake", drm.clone()).unwrap());
    let registry = BindingRegistry::default();
    let id = PipelineIds::default().next();
    let pipe = create_pipeline(id, &dev, &dev.res.connectors[0], &registry, true).unwrap();
    Setup {
        drm,
        pipe,
        overlay,
        _registry: registry,
    }
}

fn layers(n: u32) -> Vec<LayerData> {
    (0..n)
        .map(|i| LayerData::new(Arc::new(FakeFb(DrmFb(1000 + i))), XRGB8888.drm, 64, 64))
        .collect()
}

fn plan_args(s: &Setup, n: u32) -> AtomicCommitArgs {
    AtomicCommitArgs {
        composition: Some(Arc::new(s.pipe.create_plan(&layers(n)).unwrap())),
        ..Default::default()
    }
}

#[test]
fn empty_commit_is_a_noop() {
    let s = setup();
    s.pipe.commit(AtomicCommitArgs::default()).unwrap();
    assert!(s.drm.commits().is_empty());
    s.pipe
        .commit(AtomicCommitArgs {
            active: Some(false),
            ..Default::default()
        })
        .unwrap();
    assert!(s.drm.commits().is_empty());
}

#[test]
fn first_commit_activates_and_sets_mode() {
    let s = setup();
    let crtc = s.pipe.crtc.id.0;
    let conn = s.pipe.connector.id.0;
    let mode = s.pipe.connector.preferred_mode().unwrap();
    let mut args = plan_args(&s, 1);
    args.display_mode = Some(mode.clone());
    s.pipe.commit(args).unwrap();
    let commits = s.drm.commits();
    assert_eq!(commits.len(), 1);
    let c = &commits[0];
    assert_eq!(c.flags, DRM_MODE_ATOMIC_ALLOW_MODESET);
    assert_eq!(s.drm.value(c, crtc, "ACTIVE"), Some(1));
    assert!(s.drm.value(c, crtc, "MODE_ID").is_some_and(|b| b != 0));
    assert!(s.drm.value(c, crtc, "OUT_FENCE_PTR").is_some());
    assert_eq!(s.drm.value(c, conn, "CRTC_ID"), Some(crtc as u64));
    let primary = s.pipe.primary_plane.id.0;
    assert_eq!(s.drm.value(c, primary, "FB_ID"), Some(1000));
    assert_eq!(s.drm.value(c, primary, "zpos"), Some(0));
    assert!(s.pipe.is_active());
    assert!(Arc::ptr_eq(&s.pipe.active_mode().unwrap(), &mode));
    assert_eq!(s.pipe.frame_period_ns(), mode.info.frame_period_ns());
    assert_eq!(s.drm.live_blobs(), 1);

    // Another modeset releases the previous blob.
    s.pipe
        .commit(AtomicCommitArgs {
            display_mode: Some(mode),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(s.drm.live_blobs(), 1);

    // Redundant activation is dropped.
    s.drm.clear_commits();
    s.pipe
        .commit(AtomicCommitArgs {
            active: Some(true),
            ..Default::default()
        })
        .unwrap();
    assert!(s.drm.commits().is_empty());
}

#[test]
fn test_only_commit_keeps_state() {
    let s = setup();
    let overlay = s.overlay.0;
    s.pipe.commit(plan_args(&s, 2)).unwrap();
    assert_eq!(s.drm.value(&s.drm.commits()[0], overlay, "zpos"), Some(1));

    let mut args = plan_args(&s, 1);
    args.test_only = true;
    s.pipe.commit(args).unwrap();
    let commits = s.drm.commits();
    let test = &commits[1];
    assert_eq!(test.flags, DRM_MODE_ATOMIC_ALLOW_MODESET | DRM_MODE_ATOMIC_TEST_ONLY);
    assert_eq!(s.drm.value(test, overlay, "FB_ID"), Some(0));
    assert_eq!(s.drm.value(test, s.pipe.crtc.id.0, "OUT_FENCE_PTR"), None);

    // Diffed against the state before the test commit, so the overlay is
    // disabled again.
    s.pipe.commit(plan_args(&s, 1)).unwrap();
    let commits = s.drm.commits();
    let real = &commits[2];
    assert_eq!(real.flags, DRM_MODE_ATOMIC_ALLOW_MODESET);
    assert_eq!(s.drm.value(real, overlay, "CRTC_ID"), Some(0));
    assert_eq!(s.drm.value(real, overlay, "FB_ID"), Some(0));

    // Now it is gone from the state.
    s.pipe.commit(plan_args(&s, 1)).unwrap();
    let commits = s.drm.commits();
    assert_eq!(s.drm.value(&commits[3], overlay, "FB_ID"), None);
}

#[test]
fn failed_commit_disables_planes() {
    let s = setup();
    let overlay = s.overlay.0;
    let primary = s.pipe.primary_plane.id.0;
    s.pipe.commit(plan_args(&s, 2)).unwrap();
    s.drm.clear_commits();
    s.drm.fail_commits(1);
    let res = s.pipe.commit(plan_args(&s, 1));
    assert!(matches!(res, Err(HwcError::Commit(_))));
    let commits = s.drm.commits();
    assert_eq!(commits.len(), 2);
    assert!(commits[0].failed);
    let cleanup = &commits[1];
    assert!(!cleanup.failed);
    assert_eq!(cleanup.flags & DRM_MODE_ATOMIC_TEST_ONLY, 0);
    for plane in [primary, overlay] {
        assert_eq!(s.drm.value(cleanup, plane, "CRTC_ID"), Some(0));
        assert_eq!(s.drm.value(cleanup, plane, "FB_ID"), Some(0));
    }

    // The display remains usable.
    s.pipe.commit(plan_args(&s, 1)).unwrap();
}

#[test]
fn failed_test_commit_has_no_cleanup() {
    let s = setup();
    s.pipe.commit(plan_args(&s, 1)).unwrap();
    s.drm.clear_commits();
    s.drm.fail_commits(1);
    let mut args = plan_args(&s, 2);
    args.test_only = true;
    assert!(s.pipe.commit(args).is_err());
    assert_eq!(s.drm.commits().len(), 1);
}
