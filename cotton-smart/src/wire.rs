//! Fixed-layout structure codec
//!
//! Every wire structure in this crate is a `#[repr(C)]` struct made
//! only of bytes and byte arrays, so that it has no padding and no
//! alignment requirement, and can be implemented as [`bytemuck::Pod`].
//! Multi-byte fields are stored as byte arrays in whichever byte order
//! the relevant standard uses (`_be` for SCSI, little-endian for ATA
//! and NVMe), and converted by accessor methods.
use core::fmt;

/// A response buffer was shorter than the structure it should hold
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MalformedResponse {
    /// Size of the structure being decoded
    pub expected: usize,
    /// Number of bytes actually available
    pub actual: usize,
}

impl fmt::Display for MalformedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed response: expected {} bytes, got {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for MalformedResponse {}

/// Decode a structure from the start of `bytes`
///
/// Trailing bytes beyond the structure's size are ignored; a short
/// buffer is an error.
pub fn decode<T: bytemuck::Pod>(bytes: &[u8]) -> Result<T, MalformedResponse> {
    let expected = core::mem::size_of::<T>();
    if bytes.len() < expected {
        return Err(MalformedResponse {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(bytemuck::pod_read_unaligned(&bytes[..expected]))
}

/// View a structure as its wire bytes
pub fn encode<T: bytemuck::NoUninit>(value: &T) -> &[u8] {
    bytemuck::bytes_of(value)
}

/// Undo the ATA word-swapped ASCII encoding
///
/// ATA stores strings as a sequence of little-endian 16-bit words with
/// the first character in the high byte, so each pair of bytes must be
/// exchanged. A trailing odd byte has no partner and is copied
/// unchanged.
pub fn swap_ata_string(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    for pair in out.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
    out
}

/// Strip trailing spaces and NULs (only from the end)
pub fn trim_padding(bytes: &[u8]) -> &[u8] {
    let len = bytes
        .iter()
        .rposition(|&b| b != b' ' && b != 0)
        .map_or(0, |i| i + 1);
    &bytes[..len]
}

/// Decode a space/NUL padded ASCII field
pub fn decode_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(trim_padding(bytes)).into_owned()
}

/// Decode a word-swapped ATA string field
pub fn decode_ata_string(bytes: &[u8]) -> String {
    decode_string(&swap_ata_string(bytes))
}

/// A 128-bit little-endian counter, as used in NVMe log pages
///
/// Kept as two 64-bit halves, as it is laid out on the wire, and
/// assembled into a `u128` on demand. All of the integer formatting
/// traits are forwarded, so `{:x}` and `{:b}` print the full width.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Counter128 {
    pub low: u64,
    pub high: u64,
}

impl Counter128 {
    pub fn from_le_bytes(bytes: [u8; 16]) -> Self {
        let mut low = [0u8; 8];
        let mut high = [0u8; 8];
        low.copy_from_slice(&bytes[0..8]);
        high.copy_from_slice(&bytes[8..16]);
        Self {
            low: u64::from_le_bytes(low),
            high: u64::from_le_bytes(high),
        }
    }

    pub fn to_le_bytes(self) -> [u8; 16] {
        self.value().to_le_bytes()
    }

    pub fn value(self) -> u128 {
        (u128::from(self.high) << 64) | u128::from(self.low)
    }
}

impl From<Counter128> for u128 {
    fn from(c: Counter128) -> u128 {
        c.value()
    }
}

impl fmt::Display for Counter128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value(), f)
    }
}

impl fmt::LowerHex for Counter128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.value(), f)
    }
}

impl fmt::UpperHex for Counter128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.value(), f)
    }
}

impl fmt::Binary for Counter128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.value(), f)
    }
}

#[cfg(test)]
#[path = "tests/wire.rs"]
mod tests;
