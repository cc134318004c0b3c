//! IMB container: the fixed 36-byte header wrapping a single JPEG.

/// Size of the header, also stored twice inside it.
pub const HEADER_LEN: usize = 36;

const SIGNATURE: &[u8; 3] = b"IMB";
const FORMAT_TAG: u8 = 11;

/// Build the header for a JPEG of `jpeg_len` bytes at `width` x `height`.
///
/// All multi-byte fields are little-endian.
pub fn build(jpeg_len: u32, width: u16, height: u16) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[0..3].copy_from_slice(SIGNATURE);
    // header[3] stays 0x00
    header[4..8].copy_from_slice(&(HEADER_LEN as u32).to_le_bytes());
    header[8..12].copy_from_slice(&(HEADER_LEN as u32 + jpeg_len).to_le_bytes());
    header[12] = FORMAT_TAG;
    // header[13] zero, header[14..16] reserved zeros
    header[16..18].copy_from_slice(&width.to_le_bytes());
    header[18..20].copy_from_slice(&height.to_le_bytes());
    header[20..24].copy_from_slice(&(HEADER_LEN as u32).to_le_bytes());
    header[24..28].copy_from_slice(&jpeg_len.to_le_bytes());
    // header[28..36] reserved zeros
    header
}

/// Whether `bytes` starts with a well-formed IMB header.
pub fn validate(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_LEN {
        return false;
    }
    if &bytes[0..3] != SIGNATURE || bytes[3] != 0 {
        return false;
    }
    let size_a = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let size_b = u32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    size_a == HEADER_LEN as u32 && size_b == HEADER_LEN as u32
}
