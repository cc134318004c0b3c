use badgelink::frame::PacketType;
use badgelink::{imb, payload, xv4};

#[test]
fn image_info_is_compact_fixed_order_json() {
    assert_eq!(
        payload::image_info(PacketType::Image, 1),
        b"{\"type\":6,\"number\":1}"
    );
    assert_eq!(
        payload::image_info(PacketType::DynamicAmbience, 3),
        b"{\"type\":5,\"number\":3}"
    );
}

#[test]
fn image_data_wraps_imb_and_raw_jpeg() {
    let jpeg = [0xFF, 0xD8, 0xFF, 0xD9];
    let data = payload::image_data(&jpeg, (64, 32), PacketType::Image);

    let prefix = b"{\"type\":6,\"data\":";
    assert!(data.starts_with(prefix));
    assert_eq!(data.len(), prefix.len() + imb::HEADER_LEN + jpeg.len() + 1);

    let header = &data[prefix.len()..prefix.len() + imb::HEADER_LEN];
    assert!(imb::validate(header));
    assert_eq!(header, &imb::build(jpeg.len() as u32, 64, 32)[..]);

    assert_eq!(&data[prefix.len() + imb::HEADER_LEN..data.len() - 1], jpeg);
    assert_eq!(*data.last().unwrap(), b'}');
}

#[test]
fn binary_body_is_not_escaped() {
    // Bytes that any JSON serializer would escape must pass through raw.
    let jpeg = [b'"', b'\\', 0x00, b'{', b'}', 0x7F];
    let data = payload::image_data(&jpeg, (8, 8), PacketType::Image);

    let prefix_len = b"{\"type\":6,\"data\":".len();
    assert_eq!(&data[prefix_len + imb::HEADER_LEN..data.len() - 1], jpeg);
}

#[test]
fn animation_data_carries_an_xv4_container() {
    let frames = vec![
        xv4::Frame::new(xv4::frame_name(1), vec![0xAA; 6]),
        xv4::Frame::new(xv4::frame_name(2), vec![0xBB; 3]),
    ];
    let data = payload::animation_data(&frames, 60, (360, 360)).unwrap();

    let prefix = b"{\"type\":5,\"data\":";
    assert!(data.starts_with(prefix));
    assert!(xv4::validate(&data[prefix.len()..]));
    assert_eq!(*data.last().unwrap(), b'}');

    let container = xv4::build(&frames, 60, (360, 360)).unwrap();
    assert_eq!(&data[prefix.len()..data.len() - 1], container.as_slice());
}

#[test]
fn animation_data_propagates_empty_animation() {
    assert!(payload::animation_data(&[], 60, (8, 8)).is_err());
}
