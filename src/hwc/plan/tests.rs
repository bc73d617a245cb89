use {
    crate::{
        format::{ARGB8888, NV12, XRGB8888},
        hwc::{
            binding::{BindingRegistry, Bound},
            device::DeviceId,
            layer::{LayerData, LayerTransform},
            pipeline::PipelineIds,
            plan::CompositionPlan,
            resources::{KmsPlane, KmsResources},
            test_drm::{FakeDrm, FakeFb},
        },
        video::drm::{DrmFb, DrmPlane},
    },
    std::sync::Arc,
};

struct Setup {
    _registry: BindingRegistry,
    planes: Vec<Bound<KmsPlane>>,
}

/// One plane per entry, bound in order. Every plane has a rotation property
/// if `rotation` is set.
fn setup(formats: &[&[u32]], rotation: bool) -> Setup {
    let drm = FakeDrm::new();
    drm.add_crtc(false);
    let optional: &[&str] = if rotation { &["rotation"] } else { &[] };
    for (i, f) in formats.iter().enumerate() {
        let ty = if i == 0 { "Primary" } else { "Overlay" };
        drm.add_plane(ty, 0b1, f, optional);
    }
    let res = KmsResources::discover(DeviceId::from_raw(1), &*drm, false).unwrap();
    let registry = BindingRegistry::default();
    let id = PipelineIds::default().next();
    let planes = res
        .planes
        .iter()
        .map(|p| registry.bind(p, id, false).unwrap())
        .collect();
    Setup {
        _registry: registry,
        planes,
    }
}

fn layer(format: u32) -> LayerData {
    LayerData::new(Arc::new(FakeFb(DrmFb(7))), format, 32, 32)
}

fn plane_ids(plan: &CompositionPlan) -> Vec<DrmPlane> {
    plan.entries.iter().map(|e| e.plane.id).collect()
}

#[test]
fn covers_every_layer_in_order() {
    let s = setup(&[&[XRGB8888.drm], &[XRGB8888.drm], &[XRGB8888.drm]], false);
    let layers = [layer(XRGB8888.drm), layer(XRGB8888.drm)];
    let plan = CompositionPlan::create(&layers, s.planes.clone()).unwrap();
    assert_eq!(plan.entries.len(), 2);
    let z: Vec<_> = plan.entries.iter().map(|e| e.zpos).collect();
    assert_eq!(z, [0, 1]);
    assert_eq!(plane_ids(&plan), [s.planes[0].id, s.planes[1].id]);
}

#[test]
fn rejected_planes_are_discarded() {
    let s = setup(
        &[&[XRGB8888.drm], &[NV12.drm], &[ARGB8888.drm, XRGB8888.drm]],
        false,
    );
    // The NV12 plane rejects the first layer and is not offered again.
    let layers = [layer(ARGB8888.drm), layer(NV12.drm)];
    assert!(CompositionPlan::create(&layers, s.planes.clone()).is_none());
    let layers = [layer(XRGB8888.drm), layer(ARGB8888.drm)];
    let plan = CompositionPlan::create(&layers, s.planes.clone()).unwrap();
    assert_eq!(plane_ids(&plan), [s.planes[0].id, s.planes[2].id]);
    let z: Vec<_> = plan.entries.iter().map(|e| e.zpos).collect();
    assert_eq!(z, [0, 1]);
}

#[test]
fn unsupported_format_yields_no_plan() {
    let s = setup(&[&[XRGB8888.drm], &[XRGB8888.drm]], true);
    assert!(CompositionPlan::create(&[layer(NV12.drm)], s.planes.clone()).is_none());
}

#[test]
fn too_many_layers() {
    let s = setup(&[&[XRGB8888.drm], &[XRGB8888.drm]], false);
    let layers = [
        layer(XRGB8888.drm),
        layer(XRGB8888.drm),
        layer(XRGB8888.drm),
    ];
    assert!(CompositionPlan::create(&layers, s.planes.clone()).is_none());
}

#[test]
fn transforms_need_rotation_support() {
    let mut flipped = layer(XRGB8888.drm);
    flipped.transform = LayerTransform::FLIP_V;
    let s = setup(&[&[XRGB8888.drm]], false);
    assert!(CompositionPlan::create(&[flipped.clone()], s.planes.clone()).is_none());
    let s = setup(&[&[XRGB8888.drm]], true);
    assert!(CompositionPlan::create(&[flipped], s.planes.clone()).is_some());
}

#[test]
fn no_layers() {
    let s = setup(&[&[XRGB8888.drm]], false);
    let plan = CompositionPlan::create(&[], s.planes.clone()).unwrap();
    assert!(plan.is_empty());
}
