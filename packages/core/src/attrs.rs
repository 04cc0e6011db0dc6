//! Versioned byte format for user metadata embedded in backend-native
//! attribute slots.
//!
//! Layout, little-endian throughout:
//!
//! ```text
//! u8  version       = 0x01
//! u32 entry count
//! per entry:
//!   u32 key length,   key bytes   (UTF-8)
//!   u32 value length, value bytes (UTF-8)
//! ```
//!
//! Entries are written in map iteration order (sorted by key). The format
//! is exact: one process may write the buffer and another read it back, so
//! the prefix width and endianness above are part of the contract.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::StoreError;

/// The only supported format version.
pub const METADATA_FORMAT_VERSION: u8 = 1;

/// Serialize a metadata map to the versioned byte format.
pub fn encode_metadata(metadata: &BTreeMap<String, String>) -> Bytes {
    let payload: usize = metadata
        .iter()
        .map(|(k, v)| 8 + k.len() + v.len())
        .sum();
    let mut buf = BytesMut::with_capacity(5 + payload);
    buf.put_u8(METADATA_FORMAT_VERSION);
    buf.put_u32_le(metadata.len() as u32);
    for (key, value) in metadata {
        buf.put_u32_le(key.len() as u32);
        buf.put_slice(key.as_bytes());
        buf.put_u32_le(value.len() as u32);
        buf.put_slice(value.as_bytes());
    }
    buf.freeze()
}

/// Deserialize an attribute buffer, populating `into` key by key.
///
/// Existing keys are overwritten; keys absent from the buffer are left
/// alone. Any version other than [`METADATA_FORMAT_VERSION`] is rejected,
/// as are truncated buffers and non-UTF-8 strings.
pub fn decode_metadata(
    mut buf: &[u8],
    into: &mut BTreeMap<String, String>,
) -> Result<(), StoreError> {
    if buf.remaining() < 1 {
        return Err(StoreError::Format("empty attribute buffer".to_string()));
    }
    let version = buf.get_u8();
    if version != METADATA_FORMAT_VERSION {
        return Err(StoreError::Format(format!(
            "unsupported attribute format version {version}"
        )));
    }
    if buf.remaining() < 4 {
        return Err(StoreError::Format("truncated entry count".to_string()));
    }
    let count = buf.get_u32_le();
    for _ in 0..count {
        let key = take_string(&mut buf, "key")?;
        let value = take_string(&mut buf, "value")?;
        into.insert(key, value);
    }
    Ok(())
}

fn take_string(buf: &mut &[u8], what: &str) -> Result<String, StoreError> {
    if buf.remaining() < 4 {
        return Err(StoreError::Format(format!("truncated {what} length")));
    }
    let len = buf.get_u32_le() as usize;
    if buf.remaining() < len {
        return Err(StoreError::Format(format!("truncated {what} bytes")));
    }
    let raw = buf.copy_to_bytes(len);
    String::from_utf8(raw.to_vec())
        .map_err(|_| StoreError::Format(format!("{what} is not valid UTF-8")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn round_trip() {
        let original = map(&[("owner", "alice"), ("tier", "hot"), ("empty", "")]);
        let buf = encode_metadata(&original);

        let mut decoded = BTreeMap::new();
        decode_metadata(&buf, &mut decoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn round_trip_empty_map() {
        let original = BTreeMap::new();
        let buf = encode_metadata(&original);
        assert_eq!(buf.len(), 5);

        let mut decoded = BTreeMap::new();
        decode_metadata(&buf, &mut decoded).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn exact_wire_layout() {
        let buf = encode_metadata(&map(&[("k", "vv")]));
        let expected: &[u8] = &[
            0x01, // version
            0x01, 0x00, 0x00, 0x00, // count
            0x01, 0x00, 0x00, 0x00, b'k', // key
            0x02, 0x00, 0x00, 0x00, b'v', b'v', // value
        ];
        assert_eq!(&buf[..], expected);
    }

    #[test]
    fn unknown_version_rejected() {
        let mut buf = encode_metadata(&map(&[("k", "v")])).to_vec();
        buf[0] = 2;

        let mut decoded = BTreeMap::new();
        let err = decode_metadata(&buf, &mut decoded).unwrap_err();
        assert!(matches!(err, StoreError::Format(_)));
        assert!(err.to_string().contains("version 2"));
    }

    #[test]
    fn truncated_buffer_rejected() {
        let buf = encode_metadata(&map(&[("key", "value")]));
        for cut in [0, 1, 3, buf.len() - 1] {
            let mut decoded = BTreeMap::new();
            assert!(
                decode_metadata(&buf[..cut], &mut decoded).is_err(),
                "cut at {cut} should fail"
            );
        }
    }

    #[test]
    fn decode_overwrites_key_by_key() {
        let buf = encode_metadata(&map(&[("b", "new")]));

        let mut decoded = map(&[("a", "keep"), ("b", "old")]);
        decode_metadata(&buf, &mut decoded).unwrap();
        assert_eq!(decoded, map(&[("a", "keep"), ("b", "new")]));
    }

    #[test]
    fn unicode_values_survive() {
        let original = map(&[("名前", "ブロブ"), ("emoji", "📦")]);
        let buf = encode_metadata(&original);

        let mut decoded = BTreeMap::new();
        decode_metadata(&buf, &mut decoded).unwrap();
        assert_eq!(decoded, original);
    }
}
