// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Ethernet frames.

use super::packet::PacketReaderMut;
use super::packet::RawHeader;
use super::packet::ReadErr;
use core::fmt;
use core::fmt::Debug;
use core::fmt::Display;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const ETHER_TYPE_IPV4: u16 = 0x0800;
pub const ETHER_TYPE_ARP: u16 = 0x0806;
pub const ETHER_TYPE_IPV6: u16 = 0x86DD;

pub const ETHER_ADDR_LEN: usize = 6;

#[repr(u16)]
#[derive(Clone, Copy, Eq, Ord, PartialEq, PartialOrd)]
pub enum EtherType {
    Ipv4,
    Arp,
    Ipv6,
    Unknown(u16),
}

impl From<u16> for EtherType {
    fn from(raw: u16) -> Self {
        match raw {
            ETHER_TYPE_IPV4 => Self::Ipv4,
            ETHER_TYPE_ARP => Self::Arp,
            ETHER_TYPE_IPV6 => Self::Ipv6,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<EtherType> for u16 {
    fn from(et: EtherType) -> Self {
        use EtherType::*;

        match et {
            Ipv4 => ETHER_TYPE_IPV4,
            Arp => ETHER_TYPE_ARP,
            Ipv6 => ETHER_TYPE_IPV6,
            Unknown(val) => val,
        }
    }
}

impl Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04X}", u16::from(*self))
    }
}

/// We are never really interested in internal representation of
/// [`EtherType`].
impl Debug for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// A view of an Ethernet II header inside a frame.
#[derive(Debug)]
pub struct EtherHdr<'a> {
    bytes: &'a mut EtherHdrRaw,
}

impl<'a> EtherHdr<'a> {
    pub const SIZE: usize = EtherHdrRaw::SIZE;

    pub fn parse(rdr: &mut PacketReaderMut<'a>) -> Result<Self, ReadErr> {
        Ok(Self { bytes: rdr.header_mut()? })
    }

    #[inline]
    pub fn dst(&self) -> [u8; ETHER_ADDR_LEN] {
        self.bytes.dst
    }

    #[inline]
    pub fn src(&self) -> [u8; ETHER_ADDR_LEN] {
        self.bytes.src
    }

    #[inline]
    pub fn ether_type(&self) -> EtherType {
        EtherType::from(u16::from_be_bytes(self.bytes.ether_type))
    }

    /// Is this frame carrying IPv4?
    ///
    /// The comparison is made against the wire bytes of the constant,
    /// so the answer does not depend on host byte order.
    #[inline]
    pub fn is_ipv4(&self) -> bool {
        self.bytes.ether_type == ETHER_TYPE_IPV4.to_be_bytes()
    }
}

#[repr(C)]
#[derive(
    Clone, Copy, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct EtherHdrRaw {
    pub dst: [u8; ETHER_ADDR_LEN],
    pub src: [u8; ETHER_ADDR_LEN],
    pub ether_type: [u8; 2],
}

impl RawHeader for EtherHdrRaw {}
