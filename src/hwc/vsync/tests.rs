use {
    crate::{
        format::XRGB8888,
        hwc::{
            binding::BindingRegistry,
            device::{DeviceId, KmsDevice},
            pipeline::{PipelineIds, create_pipeline},
            test_drm::{FakeDrm, mode},
            vsync::{VsyncWorker, next_phased_vsync},
        },
        time::now_nsec,
        video::drm::{ConnectorType, DrmDevice},
    },
    std::{
        sync::{Arc, atomic::AtomicI64, mpsc},
        thread,
        time::Duration,
    },
};

#[test]
fn phase_lock() {
    let t = 1_000_000;
    let f = 16_666_666;
    assert_eq!(next_phased_vsync(Some(t), f, t + f + f / 2), t + 2 * f);
    assert_eq!(next_phased_vsync(Some(t), f, t), t + f);
    assert_eq!(next_phased_vsync(Some(t), f, t + 2 * f), t + 3 * f);
    assert_eq!(next_phased_vsync(Some(t), f, t + 10 * f - 1), t + 10 * f);
    assert_eq!(next_phased_vsync(Some(t), f, t - f / 2), t);
    assert_eq!(next_phased_vsync(None, f, t), t + f);
}

fn worker(period: i64) -> VsyncWorker {
    let drm: Arc<dyn DrmDevice> = FakeDrm::new();
    VsyncWorker::new(&drm, 0, &Arc::new(AtomicI64::new(period))).unwrap()
}

#[test]
fn synthetic_timestamps_keep_phase() {
    const PERIOD: i64 = 2_000_000;
    let worker = worker(PERIOD);
    let (tx, rx) = mpsc::channel();
    worker.set_callback(Some(Arc::new(move |ts| {
        let _ = tx.send(ts);
    })));
    worker.enable(true);
    let timeout = Duration::from_secs(5);
    let t1 = rx.recv_timeout(timeout).unwrap();
    let t2 = rx.recv_timeout(timeout).unwrap();
    let t3 = rx.recv_timeout(timeout).unwrap();
    assert!(t2 > t1);
    assert!(t3 > t2);
    assert_eq!((t2 - t1) % PERIOD, 0);
    assert_eq!((t3 - t1) % PERIOD, 0);
    assert_eq!(worker.last_timestamp().map(|l| (l - t1) % PERIOD), Some(0));
}

#[test]
fn disabled_worker_is_silent() {
    let worker = worker(1_000_000);
    let (tx, rx) = mpsc::channel();
    worker.set_callback(Some(Arc::new(move |ts| {
        let _ = tx.send(ts);
    })));
    assert!(rx.recv_timeout(Duration::from_millis(30)).is_err());
    worker.enable(true);
    assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    worker.enable(false);
    assert!(!worker.is_enabled());
    assert_eq!(worker.last_timestamp(), None);
    thread::sleep(Duration::from_millis(20));
    while rx.try_recv().is_ok() {}
    assert!(rx.recv_timeout(Duration::from_millis(30)).is_err());
}

#[test]
fn drop_stops_thread() {
    let worker = worker(1_000_000);
    worker.enable(true);
    thread::sleep(Duration::from_millis(5));
    drop(worker);
}

#[test]
fn hardware_timestamps_are_forwarded() {
    const PERIOD: i64 = 1_000_000_000;
    let fake = FakeDrm::new();
    let base = now_nsec();
    let stamps = [base + 1_000_000, base + 2_000_000, base + 3_000_000];
    fake.queue_vblanks(&stamps);
    let drm: Arc<dyn DrmDevice> = fake.clone();
    let worker = VsyncWorker::new(&drm, 3, &Arc::new(AtomicI64::new(PERIOD))).unwrap();
    let (tx, rx) = mpsc::channel();
    worker.set_callback(Some(Arc::new(move |ts| {
        let _ = tx.send(ts);
    })));
    worker.enable(true);
    let timeout = Duration::from_secs(5);
    for stamp in stamps {
        assert_eq!(rx.recv_timeout(timeout).unwrap(), stamp);
    }
    assert_eq!(worker.last_timestamp(), Some(stamps[2]));
    let requests = fake.vblank_requests();
    assert!(requests.len() >= 3);
    assert!(requests.iter().all(|&i| i == 3));
}

#[test]
fn pipeline_waits_on_its_crtc() {
    let drm = FakeDrm::new();
    drm.add_crtc(false);
    let c1 = drm.add_crtc(false);
    let enc = drm.add_encoder(0b10);
    drm.add_connector(ConnectorType::HDMIA, &[enc], true, vec![mode(640, 480, true)]);
    drm.add_plane("Primary", 0b10, &[XRGB8888.drm], &[]);
    let dev = Arc::new(KmsDevice::new(DeviceId::from_raw(1), "fake", drm.clone()).unwrap());
    let registry = BindingRegistry::default();
    let ids = PipelineIds::default();
    let pipe = create_pipeline(ids.next(), &dev, &dev.res.connectors[0], &registry, true).unwrap();
    assert_eq!(pipe.crtc.id, c1);
    let stamp = now_nsec();
    drm.queue_vblanks(&[stamp]);
    let (tx, rx) = mpsc::channel();
    pipe.set_vsync_callback(Some(Arc::new(move |ts| {
        let _ = tx.send(ts);
    })));
    pipe.enable_vsync(true);
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), stamp);
    assert_eq!(drm.vblank_requests()[0], pipe.crtc.index);
    assert_eq!(pipe.crtc.index, 1);
}
