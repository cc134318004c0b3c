use badgelink::{imb, xv4, Error};

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[test]
fn imb_header_for_1024_byte_jpeg() {
    let header = imb::build(1024, 64, 32);
    let expected: [u8; 36] = [
        0x49, 0x4D, 0x42, 0x00, 0x24, 0x00, 0x00, 0x00, 0x24, 0x04, 0x00, 0x00, 0x0B, 0x00, 0x00,
        0x00, 0x40, 0x00, 0x20, 0x00, 0x24, 0x00, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];
    assert_eq!(header, expected);
}

#[test]
fn imb_header_for_100_byte_jpeg() {
    let header = imb::build(100, 128, 64);
    let expected: [u8; 36] = [
        0x49, 0x4D, 0x42, 0x00, 0x24, 0x00, 0x00, 0x00, 0x88, 0x00, 0x00, 0x00, 0x0B, 0x00, 0x00,
        0x00, 0x80, 0x00, 0x40, 0x00, 0x24, 0x00, 0x00, 0x00, 0x64, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];
    assert_eq!(header, expected);
}

#[test]
fn imb_fields_track_inputs() {
    for &(jpeg_len, width, height) in &[
        (0u32, 1u16, 1u16),
        (4096, 360, 360),
        (1_000_000, 65535, 65535),
    ] {
        let header = imb::build(jpeg_len, width, height);
        assert!(imb::validate(&header));
        assert_eq!(u32_at(&header, 8), jpeg_len + 36);
        assert_eq!(u32_at(&header, 24), jpeg_len);
        assert_eq!(u16_at(&header, 16), width);
        assert_eq!(u16_at(&header, 18), height);
    }
}

#[test]
fn imb_validate_rejects_corruption() {
    let good = imb::build(100, 8, 8);
    assert!(imb::validate(&good));

    let mut bad = good;
    bad[0] = b'X';
    assert!(!imb::validate(&bad));

    let mut bad = good;
    bad[3] = 1;
    assert!(!imb::validate(&bad));

    let mut bad = good;
    bad[4] = 35;
    assert!(!imb::validate(&bad));

    let mut bad = good;
    bad[20] = 37;
    assert!(!imb::validate(&bad));

    assert!(!imb::validate(&good[..20]));
}

#[test]
fn xv4_single_frame_layout() {
    let frames = vec![xv4::Frame::new("frame_00001", vec![0xFF, 0xD8, 0xFF, 0xE0])];
    let container = xv4::build(&frames, 50, (360, 360)).unwrap();

    assert_eq!(
        &container[..20],
        &[
            0x78, 0x56, 0x34, 0x12, 0x28, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x14, 0x00,
            0x00, 0x00, 0x6F, 0x75, 0x74, 0x70,
        ]
    );
    assert_eq!(&container[16..28], b"output/50ms\0");
    // Per-frame region size: one 32-byte metadata block plus a 4-byte JPEG.
    assert_eq!(u32_at(&container, 28), 36);

    // Frame table: padded name then the metadata offset.
    assert_eq!(&container[32..44], b"frame_00001.");
    assert_eq!(u32_at(&container, 44), 48);

    // Metadata block: the single frame's next pointer wraps to itself.
    assert_eq!(u32_at(&container, 48), 48);
    assert_eq!(u32_at(&container, 52), 48);
    assert_eq!(u32_at(&container, 56), 0);
    assert_eq!(u16_at(&container, 60), 360);
    assert_eq!(u16_at(&container, 62), 360);
    assert_eq!(u32_at(&container, 64), 80);
    assert_eq!(u32_at(&container, 68), 4);
    assert_eq!(&container[72..80], &[0u8; 8]);

    assert_eq!(&container[80..84], &[0xFF, 0xD8, 0xFF, 0xE0]);
    assert_eq!(container.len(), 84);
}

#[test]
fn xv4_multi_frame_offsets_and_cycle() {
    let frames = vec![
        xv4::Frame::new(xv4::frame_name(1), vec![0x11; 4]),
        xv4::Frame::new(xv4::frame_name(2), vec![0x22; 10]),
        xv4::Frame::new(xv4::frame_name(3), vec![0x33; 7]),
    ];
    let container = xv4::build(&frames, 75, (64, 32)).unwrap();

    let table_end = 32 + 16 * 3;
    assert_eq!(u32_at(&container, 4), (table_end - 8) as u32);
    assert_eq!(u32_at(&container, 8), 3);
    assert_eq!(u32_at(&container, 12), 40);
    assert_eq!(u32_at(&container, 28), (32 + 4) + (32 + 10) + (32 + 7));

    // Expected metadata offsets: 80, 116, 158.
    let expected = [80u32, 116, 158];
    for (i, &meta) in expected.iter().enumerate() {
        let entry = 32 + 16 * i;
        assert_eq!(u32_at(&container, entry + 12), meta);
        // Own offset, then the next frame's, wrapping at the end.
        let meta = meta as usize;
        assert_eq!(u32_at(&container, meta), expected[i] as u32);
        assert_eq!(u32_at(&container, meta + 4), expected[(i + 1) % 3]);
        assert_eq!(u32_at(&container, meta + 16), expected[i] + 32);
    }

    // frame_count - 3 floor.
    assert_eq!(u32_at(&container, 80 + 8), 0);

    let five = vec![xv4::Frame::new("f", vec![0u8; 1]); 5];
    let container = xv4::build(&five, 75, (8, 8)).unwrap();
    let first_meta = u32_at(&container, 32 + 12) as usize;
    assert_eq!(u32_at(&container, first_meta + 8), 2);
}

#[test]
fn xv4_interval_is_clamped_into_the_timing_slot() {
    assert_eq!(xv4::clamp_interval(10), 50);
    assert_eq!(xv4::clamp_interval(50), 50);
    assert_eq!(xv4::clamp_interval(75), 75);
    assert_eq!(xv4::clamp_interval(99), 99);
    assert_eq!(xv4::clamp_interval(500), 99);

    let frames = vec![xv4::Frame::new("a", vec![0u8; 2])];
    let fast = xv4::build(&frames, 10, (8, 8)).unwrap();
    assert_eq!(&fast[16..28], b"output/50ms\0");
    let slow = xv4::build(&frames, 1000, (8, 8)).unwrap();
    assert_eq!(&slow[16..28], b"output/99ms\0");
}

#[test]
fn xv4_names_are_dotted_padded_and_truncated() {
    let frames = vec![
        xv4::Frame::new("a", vec![0u8; 1]),
        xv4::Frame::new("a_very_long_frame_name", vec![0u8; 1]),
    ];
    let container = xv4::build(&frames, 60, (8, 8)).unwrap();
    assert_eq!(&container[32..44], b"a.\0\0\0\0\0\0\0\0\0\0");
    assert_eq!(&container[48..60], b"a_very_long_");
}

#[test]
fn xv4_rejects_empty_animations() {
    assert_eq!(xv4::build(&[], 50, (8, 8)), Err(Error::EmptyAnimation));
}

#[test]
fn xv4_validate_checks_signature_and_version() {
    let frames = vec![xv4::Frame::new("a", vec![0u8; 2])];
    let container = xv4::build(&frames, 60, (8, 8)).unwrap();
    assert!(xv4::validate(&container));

    let mut bad = container.clone();
    bad[3] = 0x11;
    assert!(!xv4::validate(&bad));

    let mut bad = container.clone();
    bad[0] = b'y';
    assert!(!xv4::validate(&bad));

    assert!(!xv4::validate(&container[..16]));
}

#[test]
fn frame_names_are_one_based_five_digits() {
    assert_eq!(xv4::frame_name(1), "frame_00001");
    assert_eq!(xv4::frame_name(42), "frame_00042");
    assert_eq!(xv4::frame_name(99999), "frame_99999");
}
