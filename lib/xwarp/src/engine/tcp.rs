// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! TCP headers.

use super::packet::PacketReaderMut;
use super::packet::RawHeader;
use super::packet::ReadErr;
use bitflags::bitflags;
use core::fmt;
use core::fmt::Display;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const TCP_HDR_OFFSET_MASK: u8 = 0xF0;
pub const TCP_HDR_OFFSET_SHIFT: u8 = 4;
pub const TCP_HDR_NS_MASK: u8 = 0x01;

pub const TCP_PORT_SMTP: u16 = 25;

bitflags! {
    /// The standard TCP flags, decoded from the 13th header byte. The
    /// experimental NS bit lives in the offset byte and is exposed
    /// separately by [`TcpHdr::ns`].
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct TcpFlags: u8 {
        const FIN = 1 << 0;
        const SYN = 1 << 1;
        const RST = 1 << 2;
        const PSH = 1 << 3;
        const ACK = 1 << 4;
        const URG = 1 << 5;
        const ECE = 1 << 6;
        const CWR = 1 << 7;
    }
}

impl Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }

        for (name, _) in self.iter_names() {
            write!(f, "{}", &name[..1])?;
        }

        Ok(())
    }
}

/// A view of the fixed 20-byte part of a TCP header inside a frame.
///
/// Options are never parsed; the reader is left just past the fixed
/// part regardless of the data offset.
#[derive(Debug)]
pub struct TcpHdr<'a> {
    base: &'a mut TcpHdrRaw,
}

impl<'a> TcpHdr<'a> {
    pub const SIZE: usize = TcpHdrRaw::SIZE;
    pub const CSUM_BEGIN: usize = 16;
    pub const CSUM_END: usize = 18;

    pub fn parse(rdr: &mut PacketReaderMut<'a>) -> Result<Self, ReadErr> {
        Ok(Self { base: rdr.header_mut()? })
    }

    #[inline]
    pub fn ack(&self) -> u32 {
        u32::from_be_bytes(self.base.ack)
    }

    #[inline]
    pub fn csum(&self) -> [u8; 2] {
        self.base.csum
    }

    /// Return the header length in bytes, as claimed by the data
    /// offset field.
    #[inline]
    pub fn data_offset(&self) -> u8 {
        ((self.base.offset & TCP_HDR_OFFSET_MASK) >> TCP_HDR_OFFSET_SHIFT)
            * 4
    }

    #[inline]
    pub fn dst_port(&self) -> u16 {
        u16::from_be_bytes(self.base.dst_port)
    }

    /// Return the destination port as it sits on the wire.
    #[inline]
    pub fn dst_port_raw(&self) -> [u8; 2] {
        self.base.dst_port
    }

    #[inline]
    pub fn flags(&self) -> TcpFlags {
        TcpFlags::from_bits_retain(self.base.flags)
    }

    #[inline]
    pub fn ns(&self) -> bool {
        self.base.offset & TCP_HDR_NS_MASK != 0
    }

    #[inline]
    pub fn seq(&self) -> u32 {
        u32::from_be_bytes(self.base.seq)
    }

    #[inline]
    pub fn set_csum(&mut self, csum: [u8; 2]) {
        self.base.csum = csum;
    }

    #[inline]
    pub fn src_port(&self) -> u16 {
        u16::from_be_bytes(self.base.src_port)
    }

    #[inline]
    pub fn urg(&self) -> u16 {
        u16::from_be_bytes(self.base.urg)
    }

    #[inline]
    pub fn window(&self) -> u16 {
        u16::from_be_bytes(self.base.window)
    }
}

/// Note: For now we keep this unaligned to be safe.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct TcpHdrRaw {
    pub src_port: [u8; 2],
    pub dst_port: [u8; 2],
    pub seq: [u8; 4],
    pub ack: [u8; 4],
    pub offset: u8,
    pub flags: u8,
    pub window: [u8; 2],
    pub csum: [u8; 2],
    pub urg: [u8; 2],
}

impl RawHeader for TcpHdrRaw {}

#[cfg(test)]
mod test {
    use super::*;

    #[rustfmt::skip]
    const HDR: [u8; 20] = [
        // source port
        0xC3, 0x50,
        // dest port
        0x00, 0x19,
        // sequence
        0x00, 0x00, 0x10, 0x00,
        // ack
        0x00, 0x00, 0x20, 0x01,
        // offset + NS
        0x51,
        // flags (PSH|ACK)
        0x18,
        // window
        0xFA, 0xF0,
        // checksum
        0x12, 0x34,
        // urgent
        0x00, 0x00,
    ];

    #[test]
    fn parse() {
        let mut bytes = HDR;
        let mut rdr = PacketReaderMut::new(&mut bytes);
        let tcp = TcpHdr::parse(&mut rdr).unwrap();

        assert_eq!(tcp.src_port(), 50000);
        assert_eq!(tcp.dst_port(), TCP_PORT_SMTP);
        assert_eq!(tcp.dst_port_raw(), [0x00, 0x19]);
        assert_eq!(tcp.seq(), 4096);
        assert_eq!(tcp.ack(), 8193);
        assert_eq!(tcp.data_offset(), 20);
        assert!(tcp.ns());
        assert_eq!(tcp.flags(), TcpFlags::PSH | TcpFlags::ACK);
        assert_eq!(tcp.window(), 64240);
        assert_eq!(tcp.csum(), [0x12, 0x34]);
        assert_eq!(tcp.urg(), 0);
        assert_eq!(rdr.pos(), TcpHdr::SIZE);
    }

    #[test]
    fn flags_are_masked_not_laid_out() {
        let mut bytes = HDR;
        bytes[13] = 0xC3;
        let mut rdr = PacketReaderMut::new(&mut bytes);
        let tcp = TcpHdr::parse(&mut rdr).unwrap();
        let flags = tcp.flags();

        assert!(flags.contains(TcpFlags::FIN | TcpFlags::SYN));
        assert!(flags.contains(TcpFlags::ECE | TcpFlags::CWR));
        assert!(!flags.intersects(TcpFlags::RST | TcpFlags::ACK));
        assert_eq!(format!("{flags}"), "FSEC");
        assert_eq!(format!("{}", TcpFlags::empty()), "-");
    }

    #[test]
    fn set_csum() {
        let mut bytes = HDR;
        {
            let mut rdr = PacketReaderMut::new(&mut bytes);
            let mut tcp = TcpHdr::parse(&mut rdr).unwrap();
            tcp.set_csum([0xAB, 0xCD]);
        }
        assert_eq!(&bytes[TcpHdr::CSUM_BEGIN..TcpHdr::CSUM_END], &[0xAB, 0xCD]);
    }

    #[test]
    fn truncated() {
        let mut bytes = [0u8; 19];
        let mut rdr = PacketReaderMut::new(&mut bytes);
        assert_eq!(
            TcpHdr::parse(&mut rdr).unwrap_err(),
            ReadErr::NotEnoughBytes { available: 19, needed: 20 }
        );
    }
}
