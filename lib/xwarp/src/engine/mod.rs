// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The rewrite engine.
//!
//! All code under this namespace is guarded by the `engine` feature flag.
//!
//! A frame moves through three stages, each of which may end its trip:
//!
//! 1. [`parse::parse`] walks the Ethernet, IPv4 and TCP headers. A
//!    truncated or malformed frame is aborted; a frame which is not
//!    TCP over IPv4 is passed.
//! 2. [`predicate::classify`] compares the headers against the
//!    [`RewriteCfg`] and either passes the frame or selects it.
//! 3. [`rewrite::rewrite`] points a selected frame at the override
//!    address and fixes up its checksums.
//!
//! Nothing here allocates, blocks, or logs. The configuration is only
//! ever borrowed, so any number of lanes may process frames against
//! the same one at once.

pub mod checksum;
pub mod ether;
pub mod ip4;
pub mod packet;
pub mod parse;
pub mod predicate;
pub mod rewrite;
#[cfg(target_has_atomic = "64")]
pub mod stat;
pub mod tcp;

use core::fmt;
use core::fmt::Display;
use ether::EtherHdr;
use ip4::IPV4_MAX_HDR_LEN;
use parse::ParseError;
use parse::Walk;
use predicate::Decision;
use predicate::PassReason;
use tcp::TcpHdr;
pub use xwarp_api::Disposition;
pub use xwarp_api::RewriteCfg;

/// The engine never reads or writes a byte of a frame past this
/// offset. A host may run [`process`] over a copy of this prefix and
/// write the copy back to obtain the same result.
pub const MAX_HDR_LEN: usize =
    EtherHdr::SIZE + IPV4_MAX_HDR_LEN + TcpHdr::SIZE;

/// What the engine did with a frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The frame could not be walked and was left untouched.
    Aborted(ParseError),
    /// The frame was left untouched.
    Passed(PassReason),
    /// The frame was redirected to the override address.
    Rewritten,
}

impl Outcome {
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Aborted(_) => Disposition::Aborted,
            Self::Passed(_) | Self::Rewritten => Disposition::Pass,
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Aborted(e) => write!(f, "aborted: {e}"),
            Self::Passed(reason) => write!(f, "passed: {reason}"),
            Self::Rewritten => write!(f, "rewritten"),
        }
    }
}

/// Run one frame through the pipeline, rewriting it in place if it is
/// selected by `cfg`.
///
/// `pkt` must hold the frame starting at its Ethernet header. Bytes
/// past the end of `pkt` are never read, and `pkt` is only modified
/// when [`Outcome::Rewritten`] is returned.
pub fn process(pkt: &mut [u8], cfg: &RewriteCfg) -> Outcome {
    let mut frame = match parse::parse(pkt) {
        Ok(Walk::Tcp(frame)) => frame,
        Ok(Walk::NotIpv4(et)) => {
            return Outcome::Passed(PassReason::NotIpv4(et));
        }
        Ok(Walk::NotTcp(proto)) => {
            return Outcome::Passed(PassReason::NotTcp(proto));
        }
        Err(e) => return Outcome::Aborted(e),
    };

    match predicate::classify(&frame.ip, &frame.tcp, cfg) {
        Decision::Pass(reason) => Outcome::Passed(reason),
        Decision::Rewrite => {
            rewrite::rewrite(&mut frame, cfg);
            Outcome::Rewritten
        }
    }
}
