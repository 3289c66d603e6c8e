use crate::types::Key;

/// 64-bit xxh3 fingerprint of a key. Values are tagged with their type so that
/// `Int(1)`, `Long(1)` and `"1"` land in different buckets.
pub fn key_fingerprint(key: &Key) -> u64 {
    let mut buf = String::with_capacity(key.values().len() * 16);
    for v in key.values() {
        buf.push_str(v.data_type().map_or("null", |t| t.as_str()));
        buf.push(':');
        buf.push_str(&v.to_string());
        buf.push('\u{1f}');
    }
    xxhash_rust::xxh3::xxh3_64(buf.as_bytes())
}
