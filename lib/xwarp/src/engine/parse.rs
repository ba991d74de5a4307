// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Walking a frame down to its TCP header.

use super::ether::EtherHdr;
use super::ether::EtherType;
use super::ip4::Ipv4Hdr;
use super::ip4::Ipv4HdrError;
use super::ip4::Protocol;
use super::packet::PacketReaderMut;
use super::packet::ReadErr;
use super::tcp::TcpHdr;
use core::fmt;
use core::fmt::Display;

/// The header layer at which a walk stopped.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Layer {
    L2,
    L3,
    L4,
}

impl Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::L2 => "L2",
            Self::L3 => "L3",
            Self::L4 => "L4",
        };
        write!(f, "{s}")
    }
}

/// A frame that cannot be walked. Every case aborts the frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// The buffer ends before the header at `layer` does.
    Truncated { layer: Layer, available: usize, needed: usize },
    /// The IPv4 IHL field describes fewer than 20 bytes.
    BadIpv4HdrLen { hdr_len: u16 },
}

impl ParseError {
    fn from_read(layer: Layer, err: ReadErr) -> Self {
        match err {
            ReadErr::NotEnoughBytes { available, needed } => {
                Self::Truncated { layer, available, needed }
            }
        }
    }
}

impl From<Ipv4HdrError> for ParseError {
    fn from(err: Ipv4HdrError) -> Self {
        match err {
            Ipv4HdrError::BadHeaderLen { hdr_len } => {
                Self::BadIpv4HdrLen { hdr_len }
            }
            Ipv4HdrError::ReadError(e) => Self::from_read(Layer::L3, e),
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Truncated { layer, available, needed } => write!(
                f,
                "truncated {layer} header: needed {needed} bytes, \
                 {available} available"
            ),
            Self::BadIpv4HdrLen { hdr_len } => {
                write!(f, "bad IPv4 header length: {hdr_len}")
            }
        }
    }
}

/// The headers of a frame carrying TCP over IPv4.
#[derive(Debug)]
pub struct TcpFrame<'a> {
    pub ether: EtherHdr<'a>,
    pub ip: Ipv4Hdr<'a>,
    pub tcp: TcpHdr<'a>,
}

/// How far a frame could be walked.
#[derive(Debug)]
pub enum Walk<'a> {
    /// The ethertype is not IPv4.
    NotIpv4(EtherType),
    /// The IPv4 payload is not TCP.
    NotTcp(Protocol),
    Tcp(TcpFrame<'a>),
}

/// Walk the Ethernet, IPv4 and TCP headers at the front of `pkt`.
///
/// Each header is checked to lie within `pkt` before any of its fields
/// are read. The TCP header is located `ihl * 4` bytes past the start
/// of the IPv4 header, so IPv4 options are stepped over.
pub fn parse(pkt: &mut [u8]) -> Result<Walk<'_>, ParseError> {
    let mut rdr = PacketReaderMut::new(pkt);

    let ether = EtherHdr::parse(&mut rdr)
        .map_err(|e| ParseError::from_read(Layer::L2, e))?;
    if !ether.is_ipv4() {
        return Ok(Walk::NotIpv4(ether.ether_type()));
    }

    let ip = Ipv4Hdr::parse(&mut rdr)?;
    if !ip.is_tcp() {
        return Ok(Walk::NotTcp(ip.proto()));
    }

    let tcp = TcpHdr::parse(&mut rdr)
        .map_err(|e| ParseError::from_read(Layer::L4, e))?;

    Ok(Walk::Tcp(TcpFrame { ether, ip, tcp }))
}
