use {
    crate::{
        cli::{GlobalArgs, ProbeArgs, setup},
        format,
        hwc::device::{DeviceIds, KmsDevice, scan_devices},
        utils::errorfmt::ErrorFmt,
    },
    std::fmt::Write,
};

pub fn main(global: GlobalArgs, args: ProbeArgs) {
    let (_logger, mut config) = setup(&global);
    if !args.device.is_empty() {
        config.devices = args.device;
    }
    let paths = match config.devices.is_empty() {
        true => match scan_devices() {
            Ok(p) => p,
            Err(e) => fatal!("{}", ErrorFmt(e)),
        },
        false => config.devices,
    };
    let ids = DeviceIds::default();
    for path in &paths {
        match KmsDevice::open(ids.next(), path) {
            Ok(dev) => print!("{}", describe(&dev)),
            Err(e) => log::error!("Could not probe {}: {}", path, ErrorFmt(e)),
        }
    }
}

fn describe(dev: &KmsDevice) -> String {
    let res = &dev.res;
    let mut s = String::new();
    let _ = writeln!(s, "{}:", dev.name);
    let _ = writeln!(
        s,
        "  size: {}x{} - {}x{}",
        res.min_width, res.min_height, res.max_width, res.max_height
    );
    let _ = writeln!(s, "  writeback connectors: {}", dev.writeback);
    let _ = writeln!(s, "  connectors:");
    for c in &res.connectors {
        let (mm_width, mm_height) = c.physical_size();
        let _ = writeln!(
            s,
            "    {} ({}): {:?}, {:?}, {}mm x {}mm",
            c.name(),
            c.id,
            c.category,
            c.status(),
            mm_width,
            mm_height,
        );
        for mode in c.modes() {
            let preferred = if mode.info.is_preferred() { " (preferred)" } else { "" };
            let _ = writeln!(s, "      {}{}", mode.info, preferred);
        }
    }
    let _ = writeln!(s, "  encoders:");
    for e in &res.encoders {
        let _ = writeln!(
            s,
            "    {}: crtc {}, possible crtcs {:#b}",
            e.id,
            e.current_crtc(),
            e.possible_crtcs
        );
    }
    let _ = writeln!(s, "  crtcs:");
    for c in &res.crtcs {
        let _ = writeln!(
            s,
            "    {} (index {}), out fences: {}",
            c.id,
            c.index,
            c.out_fence_ptr.is_some()
        );
    }
    let _ = writeln!(s, "  planes:");
    for p in &res.planes {
        let formats: Vec<_> = p.formats.iter().map(|&f| format::debug(f)).collect();
        let _ = writeln!(
            s,
            "    {}: {:?}, possible crtcs {:#b}, zpos: {}, rotation: {}",
            p.id,
            p.ty,
            p.possible_crtcs,
            p.zpos.is_some(),
            p.rotation.is_some(),
        );
        let _ = writeln!(s, "      formats: {:?}", formats);
    }
    s
}
