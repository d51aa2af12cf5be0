use super::*;
use proptest::prelude::*;

pub fn identify_controller(model: &str, serial: &str) -> IdentifyController {
    let mut r: IdentifyController = bytemuck::Zeroable::zeroed();
    r.vid_le = 0x144Du16.to_le_bytes();
    r.ssvid_le = 0x144Du16.to_le_bytes();
    r.model_number.fill(b' ');
    r.serial_number.fill(b' ');
    r.firmware_revision.copy_from_slice(b"3B2QGXA7");
    r.model_number[..model.len()].copy_from_slice(model.as_bytes());
    r.serial_number[..serial.len()].copy_from_slice(serial.as_bytes());
    r
}

pub fn smart_log(kelvin: u16) -> SmartLog {
    let mut r: SmartLog = bytemuck::Zeroable::zeroed();
    r.composite_temperature_le = kelvin.to_le_bytes();
    r.available_spare = 100;
    r.available_spare_threshold = 10;
    r.percentage_used = 3;
    r
}

#[test]
fn sizes() {
    assert_eq!(core::mem::size_of::<NvmeAdminCommand>(), 72);
    assert_eq!(core::mem::size_of::<IdentifyController>(), 4096);
    assert_eq!(core::mem::size_of::<SmartLog>(), 512);
}

#[test]
fn identify_command() {
    let c = build_identify();
    assert_eq!(c.opcode, 0x06);
    assert_eq!(c.cdw10, 1);
    assert_eq!(c.data_len, 4096);
    assert_eq!(c.nsid, 0);
}

#[test]
fn smart_log_command() {
    let c = build_get_log_page(log_page::SMART, 512);
    assert_eq!(c.opcode, 0x02);
    assert_eq!(c.nsid, 0xFFFF_FFFF);
    assert_eq!(c.cdw10, 0x007F_0002);
    assert_eq!(c.data_len, 512);
}

#[test]
fn small_log_page() {
    assert_eq!(build_get_log_page(1, 4).cdw10, 0x0000_0001);
}

#[test]
#[should_panic]
fn log_page_size_not_dwords() {
    build_get_log_page(log_page::SMART, 510);
}

#[test]
#[should_panic]
fn log_page_size_zero() {
    build_get_log_page(log_page::SMART, 0);
}

#[test]
fn admin_command_layout() {
    let c = build_get_log_page(log_page::SMART, 512);
    let b = crate::wire::encode(&c);
    assert_eq!(b[0], 0x02);
    assert_eq!(&b[4..8], &0xFFFF_FFFFu32.to_ne_bytes());
    assert_eq!(&b[36..40], &512u32.to_ne_bytes());
    assert_eq!(&b[40..44], &0x007F_0002u32.to_ne_bytes());
}

#[test]
fn identify_strings_not_swapped() {
    let r = identify_controller("Samsung SSD 970 EVO Plus 1TB", "S4EWNX0R123456A");
    assert_eq!(r.model(), "Samsung SSD 970 EVO Plus 1TB");
    assert_eq!(r.serial(), "S4EWNX0R123456A");
    assert_eq!(r.firmware(), "3B2QGXA7");
    assert_eq!(r.vendor_id(), 0x144D);
    assert_eq!(r.subsystem_vendor_id(), 0x144D);
}

#[test]
fn temperature_conversion() {
    let r = smart_log(308);
    assert_eq!(r.temperature_kelvin(), 0x134);
    assert!((r.temperature_celsius() - 34.85).abs() < 1e-2);
}

#[test]
fn sensors() {
    let mut r = smart_log(300);
    r.temperature_sensors_le[0] = 310u16.to_le_bytes();
    r.temperature_sensors_le[3] = 273u16.to_le_bytes();
    let t = r.sensor_temperatures();
    assert!((t[0].unwrap() - 36.85).abs() < 1e-2);
    assert_eq!(t[1], None);
    assert!((t[3].unwrap() + 0.15).abs() < 1e-2);
    assert!(t[4..].iter().all(Option::is_none));
}

#[test]
fn counters() {
    let mut r = smart_log(300);
    r.data_units_read[0] = 0x10;
    r.data_units_read[8] = 0x01;
    r.power_on_hours[0..2].copy_from_slice(&1234u16.to_le_bytes());
    r.media_errors = [0xFF; 16];
    assert_eq!(r.data_units_read().value(), (1u128 << 64) | 0x10);
    assert_eq!(r.bytes_read(), ((1u128 << 64) | 0x10) * 512_000);
    assert_eq!(r.power_on_hours().value(), 1234);
    assert_eq!(r.media_errors().value(), u128::MAX);
    assert_eq!(r.bytes_written(), 0);
    assert_eq!(r.unsafe_shutdowns().value(), 0);
}

#[test]
fn critical_warning() {
    let mut r = smart_log(300);
    assert!(r.critical_warning().is_empty());
    r.critical_warning = 0x0A;
    assert_eq!(
        r.critical_warning(),
        CriticalWarning::TEMPERATURE | CriticalWarning::READ_ONLY
    );
    r.critical_warning = 0x80;
    assert_eq!(r.critical_warning().bits(), 0x80);
}

#[test]
fn status_success() {
    let s = parse_nvme_status([0, 0]).unwrap();
    assert!(s.is_success());
    assert_eq!(s.message(), Some("Successful Completion"));
}

#[test]
fn status_more_and_dnr_alone_succeed() {
    let s = parse_nvme_status(0x6000u16.to_le_bytes()).unwrap();
    assert!(s.more);
    assert!(s.do_not_retry);
}

#[test]
fn status_invalid_log_page() {
    let e = parse_nvme_status(0x4109u16.to_le_bytes()).unwrap_err();
    assert_eq!(e.status_code(), 0x09);
    assert_eq!(e.status_code_type(), 1);
    assert!(e.0.do_not_retry);
    assert_eq!(format!("{e}"), "NVMe status type 0x1 code 0x09: Invalid Log Page");
}

#[test]
fn status_type_only() {
    let e = parse_nvme_status(0x0700u16.to_le_bytes()).unwrap_err();
    assert_eq!(e.status_code(), 0);
    assert_eq!(e.status_code_type(), 7);
    assert_eq!(format!("{e}"), "NVMe status type 0x7 code 0x00");
}

#[test]
fn status_fields() {
    let s = NvmeStatus::from_le_bytes(0x1802u16.to_le_bytes());
    assert_eq!(s.status_code, 2);
    assert_eq!(s.command_retry_delay, 3);
    assert_eq!(s.status_code_type, 0);
    assert!(!s.more);
}

proptest! {
    #[test]
    fn status_success_iff_zero(v in any::<u16>()) {
        let r = parse_nvme_status(v.to_le_bytes());
        prop_assert_eq!(r.is_ok(), (v & 0x7FF) == 0);
    }

    #[test]
    fn log_page_dwords(id in any::<u8>(), dwords in 1u32..=0x10000) {
        let c = build_get_log_page(id, dwords * 4);
        prop_assert_eq!(c.cdw10 & 0xFF, u32::from(id));
        prop_assert_eq!((c.cdw10 >> 16) + 1, dwords);
    }

    #[test]
    fn smart_log_round_trip(bytes in proptest::collection::vec(any::<u8>(), 512)) {
        let r: SmartLog = crate::wire::decode(&bytes).unwrap();
        prop_assert_eq!(crate::wire::encode(&r), &bytes[..]);
    }

    #[test]
    fn admin_command_round_trip(bytes in proptest::collection::vec(any::<u8>(), 72)) {
        let c: NvmeAdminCommand = crate::wire::decode(&bytes).unwrap();
        prop_assert_eq!(crate::wire::encode(&c), &bytes[..]);
        prop_assert_eq!(c.opcode, bytes[0]);
        let cdw10: [u8; 4] = bytes[40..44].try_into().unwrap();
        prop_assert_eq!(c.cdw10, u32::from_ne_bytes(cdw10));
    }
}
