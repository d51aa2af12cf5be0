use super::*;
use proptest::prelude::*;

/// First 94 bytes of IDENTIFY DEVICE from a Samsung 860 EVO
pub const SAMSUNG_860_IDENTIFY: [u8; 94] = [
    0x40, 0x00, 0xFF, 0x3F, 0x37, 0xC8, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x3F, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x33, 0x51, 0x21, 0x5A,
    0x42, 0x4E, 0x4B, 0x30, 0x32, 0x33, 0x33, 0x35, 0x32, 0x38, 0x20, 0x54,
    0x20, 0x20, 0x20, 0x20, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x56, 0x52,
    0x30, 0x54, 0x42, 0x31, 0x51, 0x36, 0x61, 0x53, 0x73, 0x6D, 0x6E, 0x75,
    0x20, 0x67, 0x53, 0x53, 0x20, 0x44, 0x36, 0x38, 0x20, 0x30, 0x56, 0x45,
    0x20, 0x4F, 0x54, 0x31, 0x20, 0x42, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
    0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
];

pub fn samsung_identify() -> [u8; 512] {
    let mut b = [0u8; 512];
    b[..SAMSUNG_860_IDENTIFY.len()].copy_from_slice(&SAMSUNG_860_IDENTIFY);
    b
}

#[test]
fn structure_sizes() {
    assert_eq!(core::mem::size_of::<Command16>(), 16);
    assert_eq!(core::mem::size_of::<Command12>(), 12);
    assert_eq!(core::mem::size_of::<IdentifyResponse>(), 512);
    assert_eq!(core::mem::size_of::<SmartDataEntry>(), 12);
    assert_eq!(core::mem::size_of::<SmartDataResponse>(), 512);
    assert_eq!(core::mem::size_of::<SmartThresholdEntry>(), 12);
    assert_eq!(core::mem::size_of::<SmartThresholdResponse>(), 512);
}

#[test]
fn identify_fixture() {
    let r: IdentifyResponse = wire::decode(&samsung_identify()).unwrap();
    assert_eq!(r.model(), "Samsung SSD 860 EVO 1TB");
    assert_eq!(r.serial(), "Q3Z!NB0K325382T");
    assert_eq!(r.firmware(), "RVT01B6Q");
    assert!(!r.is_atapi());
    assert!(r.is_fixed());
    assert!(!r.is_removable());
    assert!(!r.is_incomplete());
}

#[test]
fn identify_short() {
    let e = wire::decode::<IdentifyResponse>(&SAMSUNG_860_IDENTIFY)
        .unwrap_err();
    assert_eq!(e.expected, 512);
    assert_eq!(e.actual, 94);
}

#[test]
fn identify_atapi_bit() {
    let mut b = samsung_identify();
    b[0] = 0x80;
    b[1] = 0x85;
    let r: IdentifyResponse = wire::decode(&b).unwrap();
    assert!(r.is_atapi());
    assert!(r.is_removable());
}

#[test]
fn identify_frame() {
    let c = build_identify(false);
    assert_eq!(
        wire::encode(&c),
        &[0x85, 0x08, 0x2E, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0xEC, 0]
    );
    assert_eq!(c.protocol(), Ok(AtaProtocol::PioDataIn));
    assert_eq!(c.command_flags(), CommandFlags::pio_in());
}

#[test]
fn atapi_identify_frame() {
    let c = build_identify(true);
    assert_eq!(c.command, 0xA1);
    assert_eq!(c.operation_code, 0x85);
}

#[test]
fn smart_frames() {
    let c = build_smart_read_data();
    assert_eq!(
        wire::encode(&c),
        &[
            0x85, 0x08, 0x2E, 0x00, 0xD0, 0, 1, 0, 0x00, 0, 0x4F, 0, 0xC2, 0,
            0xB0, 0
        ]
    );
    assert_eq!(c.lba(), SMART_LBA_SIGNATURE);
    assert_eq!(c.features(), 0xD0);

    let c = build_smart_read_thresholds();
    assert_eq!(c.features_be, [0x00, 0xD1]);
    assert_eq!(c.command, 0xB0);
    assert_eq!(c.lba_mid, 0x4F);
    assert_eq!(c.lba_high, 0xC2);
}

#[test]
fn flags_byte() {
    assert_eq!(CommandFlags::pio_in().bits(), 0x2E);
    let f = CommandFlags::new(
        TransferLength::InStpsiu,
        false,
        TransferDirection::ToDevice,
        false,
        OffLine::FourteenSeconds,
    );
    assert_eq!(f.bits(), 0xC3);
}

#[test]
fn lba_split_low_byte_first() {
    let mut c = Command16::new(AtaProtocol::NonData, CommandFlags::default(), 0);
    c.set_lba(0x0605_0403_0201);
    assert_eq!(c.lba_low, 0x01);
    assert_eq!(c.lba_mid, 0x02);
    assert_eq!(c.lba_high, 0x03);
    assert_eq!(c.lba_high_low, 0x04);
    assert_eq!(c.lba_high_mid, 0x05);
    assert_eq!(c.lba_high_high, 0x06);
    assert_eq!(&wire::encode(&c)[7..13], &[4, 1, 5, 2, 6, 3]);
}

#[test]
#[should_panic]
fn lba_too_wide() {
    let mut c = Command16::new(AtaProtocol::NonData, CommandFlags::default(), 0);
    c.set_lba(1 << 48);
}

#[test]
fn protocol_rejects_gaps() {
    assert_eq!(AtaProtocol::try_from(2), Err(InvalidValue(2)));
    assert_eq!(AtaProtocol::try_from(13), Err(InvalidValue(13)));
    assert_eq!(AtaProtocol::try_from(16), Err(InvalidValue(16)));
    assert_eq!(AtaProtocol::try_from(15), Ok(AtaProtocol::ReturnResponseInformation));
    assert_eq!(format!("{}", InvalidValue(2)), "invalid field value 0x2");
}

#[test]
fn flag_fields_reject_out_of_range() {
    assert_eq!(TransferLength::try_from(3), Ok(TransferLength::InStpsiu));
    assert_eq!(TransferLength::try_from(4), Err(InvalidValue(4)));
    assert_eq!(OffLine::try_from(2), Ok(OffLine::SixSeconds));
    assert_eq!(OffLine::try_from(4), Err(InvalidValue(4)));
    assert_eq!(
        TransferDirection::try_from(1),
        Ok(TransferDirection::FromDevice)
    );
    assert_eq!(TransferDirection::try_from(2), Err(InvalidValue(2)));
}

#[test]
fn extend_bit() {
    let mut c = build_identify(false);
    assert!(!c.extend());
    c.set_extend(true);
    assert!(c.extend());
    assert_eq!(c.protocol, 0x09);
    assert_eq!(c.protocol(), Ok(AtaProtocol::PioDataIn));
}

#[test]
fn command12_from_smart() {
    let c = Command12::from_command16(&build_smart_read_data()).unwrap();
    assert_eq!(
        wire::encode(&c),
        &[0xA1, 0x08, 0x2E, 0xD0, 1, 0x00, 0x4F, 0xC2, 0, 0xB0, 0, 0]
    );
    assert_eq!(c.lba(), 0xC24F00);
}

#[test]
fn command12_refuses_48bit() {
    let mut c = build_identify(false);
    c.set_lba(1 << 24);
    assert!(Command12::from_command16(&c).is_none());
    let mut c = build_identify(false);
    c.set_sector_count(256);
    assert!(Command12::from_command16(&c).is_none());
}

fn smart_with(entries: &[SmartDataEntry]) -> SmartDataResponse {
    let mut r: SmartDataResponse = bytemuck::Zeroable::zeroed();
    r.attributes[..entries.len()].copy_from_slice(entries);
    r
}

#[test]
fn entries_stop_at_sentinel() {
    let r = smart_with(&[
        SmartDataEntry {
            id: 9,
            ..Default::default()
        },
        SmartDataEntry::default(),
        SmartDataEntry {
            id: 0xC2,
            ..Default::default()
        },
    ]);
    let ids: Vec<u8> = r.entries().map(|e| e.id).collect();
    assert_eq!(ids, vec![9]);
}

#[test]
fn raw_value_little_endian() {
    let e = SmartDataEntry {
        id: 9,
        flags_le: [0x32, 0x00],
        current: 99,
        worst: 99,
        raw: [0x10, 0x27, 0, 0, 0, 0x01],
        reserved: 0,
    };
    assert_eq!(e.flags(), 0x32);
    assert_eq!(e.raw_value(), 0x0100_0000_2710);
}

#[test]
fn checksum() {
    let mut r = smart_with(&[SmartDataEntry {
        id: 1,
        current: 100,
        ..Default::default()
    }]);
    assert!(!r.checksum_valid());
    r.checksum = 0u8.wrapping_sub(101);
    assert!(r.checksum_valid());

    let t: SmartThresholdResponse = bytemuck::Zeroable::zeroed();
    assert!(t.checksum_valid());
}

#[test]
fn extended_self_test_time() {
    let mut r = smart_with(&[]);
    r.extended_self_test_time = 90;
    assert_eq!(r.extended_self_test_minutes(), 90);
    r.extended_self_test_time = 0xFF;
    r.extended_self_test_time_wide_le = 300u16.to_le_bytes();
    assert_eq!(r.extended_self_test_minutes(), 300);
}

fn protocols() -> impl Strategy<Value = AtaProtocol> {
    prop_oneof![
        Just(AtaProtocol::HardReset),
        Just(AtaProtocol::Srst),
        Just(AtaProtocol::NonData),
        Just(AtaProtocol::PioDataIn),
        Just(AtaProtocol::PioDataOut),
        Just(AtaProtocol::Dma),
        Just(AtaProtocol::DmaQueued),
        Just(AtaProtocol::DeviceDiagnostic),
        Just(AtaProtocol::DeviceReset),
        Just(AtaProtocol::UdmaIn),
        Just(AtaProtocol::UdmaOut),
        Just(AtaProtocol::Fpdma),
        Just(AtaProtocol::ReturnResponseInformation),
    ]
}

fn flags() -> impl Strategy<Value = CommandFlags> {
    (
        prop_oneof![
            Just(TransferLength::NoData),
            Just(TransferLength::InFeature),
            Just(TransferLength::InSectorCount),
            Just(TransferLength::InStpsiu),
        ],
        any::<bool>(),
        prop_oneof![
            Just(TransferDirection::ToDevice),
            Just(TransferDirection::FromDevice)
        ],
        any::<bool>(),
        prop_oneof![
            Just(OffLine::Zero),
            Just(OffLine::TwoSeconds),
            Just(OffLine::SixSeconds),
            Just(OffLine::FourteenSeconds),
        ],
    )
        .prop_map(|(l, b, d, c, o)| CommandFlags::new(l, b, d, c, o))
}

proptest! {
    #[test]
    fn command16_round_trip(
        p in protocols(),
        f in flags(),
        cmd in any::<u8>(),
        features in any::<u16>(),
        count in any::<u16>(),
        lba in 0u64..(1 << 48),
    ) {
        let mut c = Command16::new(p, f, cmd);
        c.set_features(features);
        c.set_sector_count(count);
        c.set_lba(lba);
        let d: Command16 = wire::decode(wire::encode(&c)).unwrap();
        prop_assert_eq!(d, c);
        prop_assert_eq!(d.protocol(), Ok(p));
        prop_assert_eq!(d.command_flags(), f);
        prop_assert_eq!(d.features(), features);
        prop_assert_eq!(d.sector_count(), count);
        prop_assert_eq!(d.lba(), lba);
    }

    #[test]
    fn flags_fields_survive(f in flags()) {
        let g = CommandFlags::from_bits(f.bits());
        prop_assert_eq!(g.t_length(), f.t_length());
        prop_assert_eq!(g.blocks(), f.blocks());
        prop_assert_eq!(g.t_dir(), f.t_dir());
        prop_assert_eq!(g.ck_cond(), f.ck_cond());
        prop_assert_eq!(g.off_line(), f.off_line());
        prop_assert_eq!(g.bits() & 0x10, 0);
    }

    #[test]
    fn smart_data_round_trip(bytes in proptest::collection::vec(any::<u8>(), 512)) {
        let r: SmartDataResponse = wire::decode(&bytes).unwrap();
        prop_assert_eq!(wire::encode(&r), &bytes[..]);
    }

    #[test]
    fn identify_round_trip(bytes in proptest::collection::vec(any::<u8>(), 512)) {
        let r: IdentifyResponse = wire::decode(&bytes).unwrap();
        prop_assert_eq!(wire::encode(&r), &bytes[..]);
        prop_assert_eq!(r.is_atapi(), (bytes[1] & 0x80) != 0);
    }

    #[test]
    fn thresholds_round_trip(bytes in proptest::collection::vec(any::<u8>(), 512)) {
        let r: SmartThresholdResponse = wire::decode(&bytes).unwrap();
        prop_assert_eq!(wire::encode(&r), &bytes[..]);
        prop_assert_eq!(r.thresholds[0].id, bytes[2]);
    }
}
