use badgelink::frame::{self, PacketType};
use badgelink::Error;

#[test]
fn info_frame_layout() {
    // The literal `{"type":6,"number":1}` announcement, framed with
    // total=0, remaining=0.
    let payload = b"{\"type\":6,\"number\":1}";
    assert_eq!(payload.len(), 21);

    let framed = frame::build(PacketType::Image, 0, 0, payload);
    assert_eq!(framed.len(), 30);
    assert_eq!(
        &framed[..8],
        &[0xF1, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x15]
    );
    assert_eq!(&framed[8..29], payload);

    let sum: u32 = framed.iter().map(|&b| u32::from(b)).sum();
    assert_eq!(sum % 256, 0);
}

#[test]
fn zero_payload_frame_is_nine_bytes() {
    let framed = frame::build(PacketType::Image, 0, 0, &[]);
    assert_eq!(framed.len(), 9);

    let parsed = frame::verify(&framed).unwrap();
    assert_eq!(parsed.subtype, PacketType::Image);
    assert_eq!(parsed.payload, &[] as &[u8]);
}

#[test]
fn round_trip_preserves_header_fields() {
    let payload = vec![0xAB; 300];
    let framed = frame::build(PacketType::DeviceStatus, 1234, 567, &payload);
    let parsed = frame::verify(&framed).unwrap();

    assert_eq!(parsed.subtype, PacketType::DeviceStatus);
    assert_eq!(parsed.total, 1234);
    assert_eq!(parsed.remaining, 567);
    assert_eq!(parsed.payload, payload.as_slice());
}

#[test]
fn wide_counters_truncate() {
    let framed = frame::build(PacketType::Image, 65536 + 7, 65536 + 3, b"x");
    let parsed = frame::verify(&framed).unwrap();
    assert_eq!(parsed.total, 7);
    assert_eq!(parsed.remaining, 3);
}

#[test]
fn checksum_balances_to_zero() {
    assert_eq!(frame::checksum(&[]), 0);
    assert_eq!(frame::checksum(&[1, 2, 3]), 250);
    assert_eq!(frame::checksum(&[0xFF]), 1);
    assert_eq!(frame::checksum(&[0x80, 0x80]), 0);
}

#[test]
fn verify_rejects_truncated_frames() {
    assert!(matches!(
        frame::verify(&[0xF1, 0x06, 0, 0]),
        Err(Error::ProtocolViolation(_))
    ));
}

#[test]
fn verify_rejects_corrupted_checksum() {
    let mut framed = frame::build(PacketType::Image, 1, 0, b"hello");
    let last = framed.len() - 1;
    framed[last] = framed[last].wrapping_add(1);
    assert!(matches!(
        frame::verify(&framed),
        Err(Error::ProtocolViolation("checksum mismatch"))
    ));
}

#[test]
fn verify_rejects_length_field_mismatch() {
    let mut framed = frame::build(PacketType::Image, 1, 0, b"hello");
    // Claim one payload byte more than is actually present.
    framed[7] += 1;
    assert!(matches!(
        frame::verify(&framed),
        Err(Error::ProtocolViolation("payload length field mismatch"))
    ));
}

#[test]
fn verify_rejects_unknown_command_and_subtype() {
    let mut framed = frame::build(PacketType::Image, 1, 0, b"hi");
    framed[0] = 0xF2;
    assert!(frame::verify(&framed).is_err());

    let mut framed = frame::build(PacketType::Image, 1, 0, b"hi");
    framed[1] = 0x42;
    // Fix the checksum so only the subtype is at fault.
    let last = framed.len() - 1;
    framed[last] = frame::checksum(&framed[..last]);
    assert!(matches!(
        frame::verify(&framed),
        Err(Error::ProtocolViolation("unknown packet type"))
    ));
}

#[test]
fn packet_type_codes() {
    assert_eq!(PacketType::DynamicAmbience.code(), 0x05);
    assert_eq!(PacketType::Image.code(), 0x06);
    assert_eq!(PacketType::PhotoAlbumCount.code(), 0x0C);
    assert_eq!(PacketType::DeviceStatus.code(), 0x0D);
    assert_eq!(PacketType::from_code(0x05), Some(PacketType::DynamicAmbience));
    assert_eq!(PacketType::from_code(0x00), None);
}
