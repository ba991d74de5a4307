// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The internet checksum.
//!
//! [`Checksum`] is a rolling one's complement sum. Bytes can be added
//! to it (to build a sum from scratch) or subtracted from it (to back
//! out words which are about to be overwritten), and carries are only
//! folded once the sum is finalized. [`HeaderChecksum`] is the
//! complemented form of a finalized sum: the two bytes actually stored
//! in an IPv4 or TCP header.
//!
//! # Byte order
//!
//! A checksum is not a number, it is two bytes. Every pair of bytes
//! fed into the sum is read as a native-endian `u16`, and the result
//! is written back as native-endian bytes. On a little-endian machine
//! this means every word is byte-swapped on the way in and swapped
//! back on the way out, which is harmless because one's complement
//! addition commutes with byte swapping (RFC 1071 §1.B). Never run a
//! checksum through `to_be()`/`from_be()`.
//!
//! # Incremental update
//!
//! Rewriting a field never requires re-reading the whole payload.
//! Given the stored checksum `HC`, the old field words `m` and the new
//! ones `m'`, RFC 1624 eqn. 3 gives the new checksum as
//! `HC' = ~(~HC + ~m + m')`. In terms of this module:
//!
//! ```ignore
//! let mut csum = Checksum::from(HeaderChecksum::wrap(hdr_csum));
//! csum.sub_bytes(&old);
//! csum.add_bytes(&new);
//! let hdr_csum = HeaderChecksum::from(csum).bytes();
//! ```
//!
//! # Relevant RFCs
//!
//! * 1071 Computing the Internet Checksum
//!
//! * 1141 Incremental Updating of the Internet Checksum
//!
//! * 1624 Computation of the Internet Checksum via Incremental Update

/// The checksum value as it is contained in a network header, i.e.
/// with one's complement applied.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HeaderChecksum {
    inner: [u8; 2],
}

impl HeaderChecksum {
    /// Return the bytes of this header checksum.
    pub fn bytes(&self) -> [u8; 2] {
        self.inner
    }

    /// Wrap the checksum bytes taken from a header.
    pub fn wrap(hc: [u8; 2]) -> Self {
        Self { inner: hc }
    }
}

impl From<Checksum> for HeaderChecksum {
    /// Finalize the rolling checksum and put it into header form by
    /// performing one's complement.
    fn from(mut csum: Checksum) -> HeaderChecksum {
        Self { inner: (!csum.finalize()).to_ne_bytes() }
    }
}

/// A rolling one's complement checksum calculation.
///
/// Carries accumulate in the upper half of a `u32` and are only folded
/// back in by [`Checksum::finalize`]. A header is at most 60 bytes and
/// the sums this engine builds stay far below the point where the
/// accumulator could overflow.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Checksum {
    inner: u32,
}

impl Checksum {
    /// Create a new rolling checksum, starting with the passed in
    /// `bytes`.
    pub fn compute(bytes: &[u8]) -> Self {
        Self { inner: csum_add(0, bytes) }
    }

    /// Update the sum by adding the contents of `bytes`.
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        self.inner = csum_add(self.inner, bytes);
    }

    /// Update the sum by subtracting the contents of `bytes`.
    ///
    /// Subtraction in one's complement is addition of the complement,
    /// so this never borrows.
    pub fn sub_bytes(&mut self, bytes: &[u8]) {
        self.inner = csum_sub(self.inner, bytes);
    }

    /// Replace the words `old` with `new` in the sum.
    ///
    /// Both slices must cover the same header field.
    pub fn replace(&mut self, old: &[u8], new: &[u8]) {
        debug_assert_eq!(old.len(), new.len());
        self.sub_bytes(old);
        self.add_bytes(new);
    }

    /// Finalize the sum by adding up all the accumulated carries and
    /// returning the resulting value as a `u16`.
    pub fn finalize(&mut self) -> u16 {
        while (self.inner >> 16) != 0 {
            self.inner = (self.inner >> 16) + (self.inner & 0xFFFF);
        }

        (self.inner & 0xFFFF) as u16
    }
}

impl From<HeaderChecksum> for Checksum {
    // Convert a header's checksum bytes into a rolling checksum.
    fn from(hc: HeaderChecksum) -> Self {
        Self { inner: (!u16::from_ne_bytes(hc.bytes())) as u32 }
    }
}

impl From<u32> for Checksum {
    fn from(csum: u32) -> Self {
        Self { inner: csum }
    }
}

fn csum_add(mut csum: u32, bytes: &[u8]) -> u32 {
    let mut words = bytes.chunks_exact(2);

    for w in &mut words {
        csum += u16::from_ne_bytes([w[0], w[1]]) as u32;
    }

    // An odd trailing byte is summed as if padded with a zero byte.
    if let [last] = words.remainder() {
        csum += u16::from_ne_bytes([*last, 0]) as u32;
    }

    csum
}

fn csum_sub(mut csum: u32, bytes: &[u8]) -> u32 {
    let mut words = bytes.chunks_exact(2);

    for w in &mut words {
        csum += (!u16::from_ne_bytes([w[0], w[1]])) as u32;
    }

    if let [last] = words.remainder() {
        csum += (!u16::from_ne_bytes([*last, 0])) as u32;
    }

    csum
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rfc1071_example() {
        // RFC 1071 §3: the sum of these words is 0xDDF2.
        let bytes = [0x00, 0x01, 0xF2, 0x03, 0xF4, 0xF5, 0xF6, 0xF7];
        let mut csum = Checksum::compute(&bytes);
        assert_eq!(csum.finalize().to_ne_bytes(), [0xDD, 0xF2]);
    }

    #[test]
    fn ipv4_header() {
        #[rustfmt::skip]
        let hdr = [
            0x45, 0x00, 0x00, 0x73,
            0x00, 0x00, 0x40, 0x00,
            0x40, 0x11,
            // checksum
            0x00, 0x00,
            0xC0, 0xA8, 0x00, 0x01,
            0xC0, 0xA8, 0x00, 0xC7,
        ];
        let hc = HeaderChecksum::from(Checksum::compute(&hdr));
        assert_eq!(hc.bytes(), [0xB8, 0x61]);

        // Summing a header including its correct checksum yields
        // negative zero.
        let mut full = hdr;
        full[10..12].copy_from_slice(&hc.bytes());
        assert_eq!(Checksum::compute(&full).finalize(), 0xFFFF);
    }

    #[test]
    fn rfc1624_eqn3() {
        // RFC 1624 §4: m = 0x5555 changes to m' = 0x3285 under
        // HC = 0xDD2F; eqn. 3 must produce 0x0000, not 0xFFFF.
        let mut csum = Checksum::from(HeaderChecksum::wrap([0xDD, 0x2F]));
        csum.replace(&[0x55, 0x55], &[0x32, 0x85]);
        assert_eq!(HeaderChecksum::from(csum).bytes(), [0x00, 0x00]);
    }

    #[test]
    fn odd_trailing_byte() {
        let mut odd = Checksum::compute(&[0x12, 0x34, 0x56]);
        let mut padded = Checksum::compute(&[0x12, 0x34, 0x56, 0x00]);
        assert_eq!(odd.finalize(), padded.finalize());

        let mut csum = Checksum::compute(&[0x12, 0x34, 0x56]);
        csum.sub_bytes(&[0x56]);
        let mut expected = Checksum::compute(&[0x12, 0x34]);
        assert_eq!(csum.finalize(), expected.finalize());
    }

    #[test]
    fn incremental_matches_scratch() {
        #[rustfmt::skip]
        let mut hdr = [
            0x45, 0x00, 0x00, 0x28,
            0x1C, 0x46, 0x40, 0x00,
            0x40, 0x06,
            0x00, 0x00,
            0x0A, 0x00, 0x00, 0x36,
            0x34, 0x0A, 0x80, 0x45,
        ];
        let hc = HeaderChecksum::from(Checksum::compute(&hdr));

        let new_dst = [0xC0, 0xA8, 0x1E, 0x1E];
        let mut csum = Checksum::from(hc);
        csum.replace(&hdr[16..20], &new_dst);
        let incremental = HeaderChecksum::from(csum);

        hdr[16..20].copy_from_slice(&new_dst);
        let scratch = HeaderChecksum::from(Checksum::compute(&hdr));
        assert_eq!(incremental, scratch);
    }
}
