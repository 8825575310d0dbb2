//! Vendor detection and the device-info cache.

mod common;

use std::time::Duration;

use bgfp_driver::{Driver, FiscalPrinter};
use common::{Envelope, MockIslDevice, MockZfpDevice, codes, quick_config};

#[test]
fn detects_daisy_after_other_isl_vendors_decline() {
    let (device, log) = MockIslDevice::new("mock://daisy", Envelope::Isl, common::daisy);
    let printer = Driver::new(quick_config()).detect(Box::new(device)).unwrap();

    let info = printer.device_info();
    assert_eq!(info.vendor, "bg.dy.isl");
    assert_eq!(info.serial_number, "DY448967");
    assert_eq!(info.model, "CompactM");
    // Datecs C read the info and rejected the serial, Datecs X got no answer
    assert_eq!(codes(&log), vec![0x5A, 0x5A]);
}

#[test]
fn detects_datecs_x() {
    let (device, _log) = MockIslDevice::new("mock://dtx", Envelope::IslX, common::datecs_x);
    let printer = Driver::new(quick_config()).detect(Box::new(device)).unwrap();
    assert_eq!(printer.device_info().vendor, "bg.dt.x.isl");
}

#[test]
fn detects_tremol_over_zfp() {
    let (device, log) = MockZfpDevice::new("mock://zfp", common::tremol);
    let printer = Driver::new(quick_config()).detect(Box::new(device)).unwrap();

    let info = printer.device_info();
    assert_eq!(info.vendor, "bg.zk.zfp");
    assert_eq!(info.manufacturer, "Tremol");
    assert_eq!(info.model, "FP01-KL V2");
    assert_eq!(info.serial_number, "ZK133759");
    assert_eq!(codes(&log), vec![0x90, 0x60]);
}

#[test]
fn silent_channel_is_unsupported() {
    let (device, log) = MockIslDevice::new("mock://none", Envelope::Isl, |_, _| {
        common::IslReply::ok(Envelope::Isl, "")
    });
    let err = Driver::new(quick_config()).detect(Box::new(device)).unwrap_err();
    assert_eq!(err.code(), "E501");
    // every ISL vendor got an empty, unparseable answer
    assert!(!codes(&log).is_empty());
}

#[test]
fn cached_probe_skips_device_info() {
    let driver = Driver::new(quick_config());

    let (first, log) = MockIslDevice::new("mock://shared", Envelope::Isl, common::datecs_c);
    let printer = driver.connect("bg.dt.c.isl", Box::new(first)).unwrap();
    assert_eq!(codes(&log), vec![0x5A]);
    drop(printer.into_channel());

    let (second, log) = MockIslDevice::new("mock://shared", Envelope::Isl, common::datecs_c);
    let printer = driver.connect("bg.dt.c.isl", Box::new(second)).unwrap();
    assert_eq!(printer.device_info().serial_number, "DT279013");
    assert!(codes(&log).is_empty());

    // detection starts with the cached vendor and needs no probe either
    let (third, log) = MockIslDevice::new("mock://shared", Envelope::Isl, common::datecs_c);
    let printer = driver.detect(Box::new(third)).unwrap();
    assert_eq!(printer.device_info().vendor, "bg.dt.c.isl");
    assert!(codes(&log).is_empty());

    driver.cache().clear();
    let (fourth, log) = MockIslDevice::new("mock://shared", Envelope::Isl, common::datecs_c);
    driver.connect("bg.dt.c.isl", Box::new(fourth)).unwrap();
    assert_eq!(codes(&log), vec![0x5A]);
}

#[test]
fn expired_cache_probes_again() {
    let mut config = quick_config();
    config.info_cache_ttl = Duration::ZERO;
    let driver = Driver::new(config);

    for _ in 0..2 {
        let (device, log) = MockIslDevice::new("mock://ttl", Envelope::Isl, common::datecs_c);
        driver.connect("bg.dt.c.isl", Box::new(device)).unwrap();
        assert_eq!(codes(&log), vec![0x5A]);
    }
}
