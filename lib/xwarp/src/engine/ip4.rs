// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! IPv4 headers.

use super::checksum::Checksum;
use super::checksum::HeaderChecksum;
use super::packet::PacketReaderMut;
use super::packet::RawHeader;
use super::packet::ReadErr;
use core::fmt;
use core::fmt::Display;
pub use xwarp_api::Ipv4Addr;
pub use xwarp_api::PROTO_TCP;
pub use xwarp_api::Protocol;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const IPV4_HDR_LEN_MASK: u8 = 0x0F;
pub const IPV4_HDR_VER_SHIFT: u8 = 4;
pub const IPV4_VERSION: u8 = 4;

/// The largest header expressible by the 4-bit IHL field.
pub const IPV4_MAX_HDR_LEN: usize = 60;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Ipv4HdrError {
    /// The IHL field describes a header shorter than the fixed part.
    BadHeaderLen { hdr_len: u16 },
    ReadError(ReadErr),
}

impl From<ReadErr> for Ipv4HdrError {
    fn from(error: ReadErr) -> Self {
        Ipv4HdrError::ReadError(error)
    }
}

impl Display for Ipv4HdrError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::BadHeaderLen { hdr_len } => {
                write!(f, "bad header length: {hdr_len}")
            }
            Self::ReadError(e) => write!(f, "{e}"),
        }
    }
}

/// A view of an IPv4 header, options included, inside a frame.
#[derive(Debug)]
pub struct Ipv4Hdr<'a> {
    base: &'a mut Ipv4HdrRaw,
    opts: &'a mut [u8],
}

impl<'a> Ipv4Hdr<'a> {
    /// Parse the header at the reader's position, leaving the reader
    /// just past the last option byte.
    ///
    /// The version nibble is not checked: the ethertype has already
    /// claimed this is IPv4, and only the header length matters for
    /// locating the next header.
    pub fn parse(rdr: &mut PacketReaderMut<'a>) -> Result<Self, Ipv4HdrError> {
        let base = rdr.header_mut::<Ipv4HdrRaw>()?;
        let hdr_len = usize::from(base.ver_hdr_len & IPV4_HDR_LEN_MASK) * 4;

        if hdr_len < Ipv4HdrRaw::SIZE {
            return Err(Ipv4HdrError::BadHeaderLen { hdr_len: hdr_len as u16 });
        }

        let opts = rdr.slice_mut(hdr_len - Ipv4HdrRaw::SIZE)?;
        Ok(Self { base, opts })
    }

    #[inline]
    pub fn csum(&self) -> [u8; 2] {
        self.base.csum
    }

    #[inline]
    pub fn dst(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.base.dst)
    }

    /// Return the header length, in bytes.
    #[inline]
    pub fn hdr_len(&self) -> u16 {
        u16::from(self.base.ver_hdr_len & IPV4_HDR_LEN_MASK) * 4
    }

    #[inline]
    pub fn ident(&self) -> u16 {
        u16::from_be_bytes(self.base.ident)
    }

    /// Is the next header TCP?
    #[inline]
    pub fn is_tcp(&self) -> bool {
        self.base.proto == PROTO_TCP
    }

    /// Return the options bytes, if any.
    #[inline]
    pub fn options_bytes(&self) -> Option<&[u8]> {
        if self.opts.is_empty() { None } else { Some(&*self.opts) }
    }

    /// Return the [`Protocol`].
    #[inline]
    pub fn proto(&self) -> Protocol {
        Protocol::from(self.base.proto)
    }

    #[inline]
    pub fn set_csum(&mut self, csum: [u8; 2]) {
        self.base.csum = csum;
    }

    #[inline]
    pub fn set_dst(&mut self, dst: Ipv4Addr) {
        self.base.dst = dst.bytes();
    }

    #[inline]
    pub fn set_tos(&mut self, tos: u8) {
        self.base.tos = tos;
    }

    /// Return the source address.
    #[inline]
    pub fn src(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.base.src)
    }

    /// Return the value of the `Total Length` field.
    #[inline]
    pub fn total_len(&self) -> u16 {
        u16::from_be_bytes(self.base.total_len)
    }

    #[inline]
    pub fn ttl(&self) -> u8 {
        self.base.ttl
    }

    /// Return the length of the Upper Layer Protocol (ULP) portion of
    /// the packet, as claimed by the header.
    #[inline]
    pub fn ulp_len(&self) -> u16 {
        self.total_len().saturating_sub(self.hdr_len())
    }

    /// Return the reported IP version field from the packet.
    #[inline]
    pub fn version(&self) -> u8 {
        self.base.ver_hdr_len >> IPV4_HDR_VER_SHIFT
    }

    /// Sum the entire header, options included, treating the checksum
    /// field as zero.
    pub fn sum_hdr(&self) -> Checksum {
        let mut base = *self.base;
        base.csum = [0; 2];
        let mut csum = Checksum::compute(base.as_bytes());
        csum.add_bytes(&*self.opts);
        csum
    }

    /// Recompute the header checksum from scratch and store it.
    pub fn compute_hdr_csum(&mut self) {
        self.base.csum = [0; 2];
        let csum = self.sum_hdr();
        self.base.csum = HeaderChecksum::from(csum).bytes();
    }
}

/// Note: For now we keep this unaligned to be safe.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct Ipv4HdrRaw {
    pub ver_hdr_len: u8,
    pub tos: u8,
    pub total_len: [u8; 2],
    pub ident: [u8; 2],
    pub frag_and_flags: [u8; 2],
    pub ttl: u8,
    pub proto: u8,
    pub csum: [u8; 2],
    pub src: [u8; 4],
    pub dst: [u8; 4],
}

impl RawHeader for Ipv4HdrRaw {}

#[cfg(test)]
mod test {
    use super::*;

    #[rustfmt::skip]
    const HDR: [u8; 20] = [
        // version + IHL
        0x45,
        // TOS
        0x00,
        // total length
        0x00, 0x3C,
        // ident
        0x0A, 0x66,
        // flags + frag offset
        0x40, 0x00,
        // TTL
        0x40,
        // protocol
        0x06,
        // checksum
        0x00, 0x00,
        // source
        0x0A, 0x00, 0x00, 0x36,
        // dest
        0x34, 0x0A, 0x80, 0x45,
    ];

    #[test]
    fn parse_no_opts() {
        let mut bytes = HDR;
        let mut rdr = PacketReaderMut::new(&mut bytes);
        let ip = Ipv4Hdr::parse(&mut rdr).unwrap();

        assert_eq!(ip.version(), IPV4_VERSION);
        assert_eq!(ip.hdr_len(), 20);
        assert_eq!(ip.total_len(), 60);
        assert_eq!(ip.ulp_len(), 40);
        assert_eq!(ip.ident(), 2662);
        assert_eq!(ip.ttl(), 64);
        assert_eq!(ip.proto(), Protocol::TCP);
        assert!(ip.is_tcp());
        assert_eq!(ip.src(), Ipv4Addr::from([10, 0, 0, 54]));
        assert_eq!(ip.dst(), Ipv4Addr::from([52, 10, 128, 69]));
        assert_eq!(ip.options_bytes(), None);
        assert_eq!(rdr.pos(), 20);
    }

    #[test]
    fn parse_opts() {
        let mut bytes = [0u8; 28];
        bytes[..20].copy_from_slice(&HDR);
        // IHL = 6, one word of options (NOP, NOP, NOP, EOL).
        bytes[0] = 0x46;
        bytes[20..24].copy_from_slice(&[0x01, 0x01, 0x01, 0x00]);

        let mut rdr = PacketReaderMut::new(&mut bytes);
        let ip = Ipv4Hdr::parse(&mut rdr).unwrap();
        assert_eq!(ip.hdr_len(), 24);
        assert_eq!(ip.options_bytes(), Some(&[0x01, 0x01, 0x01, 0x00][..]));
        assert_eq!(rdr.pos(), 24);
        assert_eq!(rdr.remaining(), 4);
    }

    #[test]
    fn parse_opts_truncated() {
        let mut bytes = [0u8; 22];
        bytes[..20].copy_from_slice(&HDR);
        bytes[0] = 0x46;

        let mut rdr = PacketReaderMut::new(&mut bytes);
        assert_eq!(
            Ipv4Hdr::parse(&mut rdr).unwrap_err(),
            Ipv4HdrError::ReadError(ReadErr::NotEnoughBytes {
                available: 2,
                needed: 4,
            })
        );
    }

    #[test]
    fn parse_bad_ihl() {
        let mut bytes = HDR;
        bytes[0] = 0x44;
        let mut rdr = PacketReaderMut::new(&mut bytes);
        assert_eq!(
            Ipv4Hdr::parse(&mut rdr).unwrap_err(),
            Ipv4HdrError::BadHeaderLen { hdr_len: 16 }
        );
    }

    #[test]
    fn hdr_csum() {
        let mut bytes = HDR;
        {
            let mut rdr = PacketReaderMut::new(&mut bytes);
            let mut ip = Ipv4Hdr::parse(&mut rdr).unwrap();
            // A stale value must not leak into the new sum.
            ip.set_csum([0xDE, 0xAD]);
            ip.compute_hdr_csum();
        }

        assert_eq!(Checksum::compute(&bytes).finalize(), 0xFFFF);
    }

    #[test]
    fn hdr_csum_covers_options() {
        let mut bytes = [0u8; 24];
        bytes[..20].copy_from_slice(&HDR);
        bytes[0] = 0x46;
        bytes[20..24].copy_from_slice(&[0x94, 0x04, 0x00, 0x00]);
        {
            let mut rdr = PacketReaderMut::new(&mut bytes);
            let mut ip = Ipv4Hdr::parse(&mut rdr).unwrap();
            ip.compute_hdr_csum();
        }

        assert_eq!(Checksum::compute(&bytes).finalize(), 0xFFFF);
        assert_ne!(
            Checksum::compute(&bytes[..20]).finalize(),
            0xFFFF,
            "options must participate in the checksum"
        );
    }
}
