// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Deciding whether a packet is rewritten.

use super::ether::EtherType;
use super::ip4::Ipv4Hdr;
use super::ip4::Protocol;
use super::tcp::TcpHdr;
use core::fmt;
use core::fmt::Display;
use xwarp_api::AddrGuard;
use xwarp_api::RewriteCfg;

/// Why a packet was forwarded untouched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PassReason {
    NotIpv4(EtherType),
    NotTcp(Protocol),
    /// The destination already is the override address.
    OverrideDst,
    /// The packet comes from the override address.
    OverrideSrc,
    /// The TCP destination port is not the target port.
    PortMismatch(u16),
}

impl Display for PassReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotIpv4(et) => write!(f, "not IPv4 (ethertype {et})"),
            Self::NotTcp(proto) => write!(f, "not TCP ({proto})"),
            Self::OverrideDst => write!(f, "already sent to override"),
            Self::OverrideSrc => write!(f, "sent from override"),
            Self::PortMismatch(port) => write!(f, "port {port} not targeted"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    Rewrite,
    Pass(PassReason),
}

/// Classify a TCP/IPv4 packet against `cfg`.
///
/// The address guard is checked before the port. All comparisons are
/// made on wire bytes.
pub fn classify(ip: &Ipv4Hdr, tcp: &TcpHdr, cfg: &RewriteCfg) -> Decision {
    let over = cfg.override_ip;

    if ip.dst() == over {
        return Decision::Pass(PassReason::OverrideDst);
    }

    if cfg.guard == AddrGuard::SrcOrDst && ip.src() == over {
        return Decision::Pass(PassReason::OverrideSrc);
    }

    if tcp.dst_port_raw() != cfg.target_port.to_be_bytes() {
        return Decision::Pass(PassReason::PortMismatch(tcp.dst_port()));
    }

    Decision::Rewrite
}
