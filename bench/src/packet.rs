// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Frames to time the engine against.

use xwarp_test_utils::*;

/// A family of related frames to benchmark.
pub trait BenchPacket {
    /// Label the frame family in a human-friendly manner.
    fn packet_label(&self) -> String;

    /// Return a list of discrete scenarios.
    fn test_cases(&self) -> Vec<Box<dyn BenchPacketInstance>>;
}

/// An individual frame to time the processing of.
pub trait BenchPacketInstance {
    /// Label for the experiment instance via BenchmarkId.
    fn instance_name(&self) -> String;

    /// Generate a single test frame.
    fn generate(&self) -> Vec<u8>;
}

fn guest() -> Ipv4Addr {
    Ipv4Addr::from([10, 0, 0, 54])
}

fn remote() -> Ipv4Addr {
    Ipv4Addr::from([52, 10, 128, 69])
}

/// SMTP frames which are redirected, with growing IPv4 options.
pub struct Rewrite {}

impl BenchPacket for Rewrite {
    fn packet_label(&self) -> String {
        "Rewrite".into()
    }

    fn test_cases(&self) -> Vec<Box<dyn BenchPacketInstance>> {
        [0usize, 20, 40]
            .into_iter()
            .map(|opts_len| {
                Box::new(RewriteInstance { opts_len })
                    as Box<dyn BenchPacketInstance>
            })
            .collect()
    }
}

#[derive(Copy, Clone, Debug)]
pub struct RewriteInstance {
    opts_len: usize,
}

impl BenchPacketInstance for RewriteInstance {
    fn instance_name(&self) -> String {
        format!("opts-{}B", self.opts_len)
    }

    fn generate(&self) -> Vec<u8> {
        TcpFrameBuilder::new(guest(), remote(), 50000, 25)
            .ip_opts(&vec![0x01; self.opts_len])
            .flags(TcpFlags::PSH | TcpFlags::ACK)
            .payload(&[0x61; 512])
            .build()
    }
}

/// Frames which leave the engine untouched.
pub struct Pass {}

impl BenchPacket for Pass {
    fn packet_label(&self) -> String {
        "Pass".into()
    }

    fn test_cases(&self) -> Vec<Box<dyn BenchPacketInstance>> {
        [
            PassInstance::PortMismatch,
            PassInstance::OverrideDst,
            PassInstance::NotTcp,
            PassInstance::NotIpv4,
            PassInstance::Truncated,
        ]
        .into_iter()
        .map(|v| Box::new(v) as Box<dyn BenchPacketInstance>)
        .collect()
    }
}

#[derive(Copy, Clone, Debug)]
pub enum PassInstance {
    PortMismatch,
    OverrideDst,
    NotTcp,
    NotIpv4,
    Truncated,
}

impl BenchPacketInstance for PassInstance {
    fn instance_name(&self) -> String {
        format!("{self:?}")
    }

    fn generate(&self) -> Vec<u8> {
        let over = RewriteCfg::default().override_ip;

        match self {
            Self::PortMismatch => {
                TcpFrameBuilder::new(guest(), remote(), 50000, 443).build()
            }
            Self::OverrideDst => {
                TcpFrameBuilder::new(guest(), over, 50000, 25).build()
            }
            Self::NotTcp => ipv4_frame(17, &[0; 32]),
            Self::NotIpv4 => ether_frame(ETHER_TYPE_IPV6, &[0; 60]),
            Self::Truncated => {
                let mut f =
                    TcpFrameBuilder::new(guest(), remote(), 50000, 25).build();
                f.truncate(ETHER_HDR_LEN + IPV4_HDR_LEN + 4);
                f
            }
        }
    }
}
