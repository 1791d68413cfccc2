//! Deterministic payload bytes for the stress handlers.

use bytes::Bytes;

/// Produce exactly `size` bytes.
///
/// Byte `i` is `(i + 1) % 255`, so two calls with the same size are
/// byte-for-byte identical. Only the length carries meaning.
pub fn generate_payload(size: usize) -> Bytes {
    if size == 0 {
        return Bytes::new();
    }

    (0..size).map(|i| ((i + 1) % 255) as u8).collect()
}
