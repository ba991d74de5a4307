// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Routines for building packet capture files.

use pcap_parser::Linktype;
use pcap_parser::ToVec;
use pcap_parser::pcap::LegacyPcapBlock;
use pcap_parser::pcap::PcapHeader;

const PCAP_MAGIC: u32 = 0xa1b2c3d4;

/// Build an in-memory packet capture from a series of packets.
pub struct PcapBuilder {
    bytes: Vec<u8>,
    big_endian: bool,
}

impl PcapBuilder {
    /// Create a new capture in the host's usual little-endian layout.
    pub fn new() -> Self {
        let mut hdr = PcapHeader {
            magic_number: PCAP_MAGIC,
            version_major: 2,
            version_minor: 4,
            thiszone: 0,
            sigfigs: 0,
            snaplen: 1500,
            network: Linktype::ETHERNET,
        };

        Self { bytes: hdr.to_vec().unwrap(), big_endian: false }
    }

    /// Create a new capture as written by a big-endian host.
    pub fn new_big_endian() -> Self {
        let mut bytes = vec![];
        bytes.extend_from_slice(&PCAP_MAGIC.to_be_bytes());
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(&4u16.to_be_bytes());
        bytes.extend_from_slice(&0i32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&1500u32.to_be_bytes());
        bytes.extend_from_slice(&(Linktype::ETHERNET.0 as u32).to_be_bytes());

        Self { bytes, big_endian: true }
    }

    /// Add a packet to the capture.
    pub fn add_pkt(&mut self, pkt: &[u8]) {
        let len = pkt.len() as u32;

        if self.big_endian {
            for word in [7777u32, 7777, len, len] {
                self.bytes.extend_from_slice(&word.to_be_bytes());
            }
            self.bytes.extend_from_slice(pkt);
            return;
        }

        let mut block = LegacyPcapBlock {
            ts_sec: 7777,
            ts_usec: 7777,
            caplen: len,
            origlen: len,
            data: pkt,
        };

        self.bytes.extend_from_slice(&block.to_vec().unwrap());
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

impl Default for PcapBuilder {
    fn default() -> Self {
        Self::new()
    }
}
