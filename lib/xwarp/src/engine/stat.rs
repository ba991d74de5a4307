// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Outcome counters.
//!
//! The engine itself keeps no state. A host which wants to observe the
//! pipeline owns a [`ProcessStats`], shares it between its lanes, and
//! records each [`Outcome`] returned by [`super::process`].

use super::Outcome;
use super::parse::Layer;
use super::parse::ParseError;
use super::predicate::PassReason;
use core::sync::atomic::AtomicU64;
use core::sync::atomic::Ordering;
use serde::Deserialize;
use serde::Serialize;

/// Lock-free counters, one per kind of outcome.
#[derive(Debug, Default)]
pub struct ProcessStats {
    /// Frames shorter than an Ethernet header.
    aborted_l2: AtomicU64,

    /// IPv4 frames whose IP header runs past the end of the buffer.
    aborted_l3: AtomicU64,

    /// TCP/IPv4 frames whose TCP header runs past the end of the
    /// buffer.
    aborted_l4: AtomicU64,

    /// Frames with an impossible IPv4 header length.
    malformed: AtomicU64,

    pass_not_ipv4: AtomicU64,
    pass_not_tcp: AtomicU64,
    pass_override_dst: AtomicU64,
    pass_override_src: AtomicU64,
    pass_port_mismatch: AtomicU64,

    rewritten: AtomicU64,
}

impl ProcessStats {
    pub const fn new() -> Self {
        Self {
            aborted_l2: AtomicU64::new(0),
            aborted_l3: AtomicU64::new(0),
            aborted_l4: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            pass_not_ipv4: AtomicU64::new(0),
            pass_not_tcp: AtomicU64::new(0),
            pass_override_dst: AtomicU64::new(0),
            pass_override_src: AtomicU64::new(0),
            pass_port_mismatch: AtomicU64::new(0),
            rewritten: AtomicU64::new(0),
        }
    }

    pub fn record(&self, outcome: &Outcome) {
        let ctr = match outcome {
            Outcome::Aborted(ParseError::Truncated { layer, .. }) => {
                match layer {
                    Layer::L2 => &self.aborted_l2,
                    Layer::L3 => &self.aborted_l3,
                    Layer::L4 => &self.aborted_l4,
                }
            }
            Outcome::Aborted(ParseError::BadIpv4HdrLen { .. }) => {
                &self.malformed
            }
            Outcome::Passed(reason) => match reason {
                PassReason::NotIpv4(_) => &self.pass_not_ipv4,
                PassReason::NotTcp(_) => &self.pass_not_tcp,
                PassReason::OverrideDst => &self.pass_override_dst,
                PassReason::OverrideSrc => &self.pass_override_src,
                PassReason::PortMismatch(_) => &self.pass_port_mismatch,
            },
            Outcome::Rewritten => &self.rewritten,
        };

        ctr.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a copy of the counters.
    ///
    /// Each counter is read individually; a snapshot taken while other
    /// lanes are recording is not a single point in time.
    pub fn snapshot(&self) -> ProcessStatsSnapshot {
        let ld = |ctr: &AtomicU64| ctr.load(Ordering::Relaxed);

        ProcessStatsSnapshot {
            aborted_l2: ld(&self.aborted_l2),
            aborted_l3: ld(&self.aborted_l3),
            aborted_l4: ld(&self.aborted_l4),
            malformed: ld(&self.malformed),
            pass_not_ipv4: ld(&self.pass_not_ipv4),
            pass_not_tcp: ld(&self.pass_not_tcp),
            pass_override_dst: ld(&self.pass_override_dst),
            pass_override_src: ld(&self.pass_override_src),
            pass_port_mismatch: ld(&self.pass_port_mismatch),
            rewritten: ld(&self.rewritten),
        }
    }
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize,
)]
pub struct ProcessStatsSnapshot {
    pub aborted_l2: u64,
    pub aborted_l3: u64,
    pub aborted_l4: u64,
    pub malformed: u64,
    pub pass_not_ipv4: u64,
    pub pass_not_tcp: u64,
    pub pass_override_dst: u64,
    pub pass_override_src: u64,
    pub pass_port_mismatch: u64,
    pub rewritten: u64,
}

impl ProcessStatsSnapshot {
    pub fn aborted(&self) -> u64 {
        self.aborted_l2 + self.aborted_l3 + self.aborted_l4 + self.malformed
    }

    pub fn passed(&self) -> u64 {
        self.pass_not_ipv4
            + self.pass_not_tcp
            + self.pass_override_dst
            + self.pass_override_src
            + self.pass_port_mismatch
    }

    /// Frames handed back to the host, rewritten or not.
    pub fn forwarded(&self) -> u64 {
        self.passed() + self.rewritten
    }

    pub fn total(&self) -> u64 {
        self.aborted() + self.forwarded()
    }
}
