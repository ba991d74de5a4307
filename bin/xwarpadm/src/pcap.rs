// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Reading and writing classic pcap files.

use crate::Error;
use pcap_parser::Linktype;
use pcap_parser::ToVec;
use pcap_parser::pcap;
use pcap_parser::pcap::LegacyPcapBlock;
use pcap_parser::pcap::PcapHeader;

const PCAP_MAGIC: u32 = 0xa1b2c3d4;
const DEFAULT_SNAPLEN: u32 = 65535;

/// A frame as recorded in a capture.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pub ts_sec: u32,
    pub ts_usec: u32,
    /// The captured bytes, which may be fewer than were on the wire.
    pub data: &'a [u8],
}

/// The frames of a capture, borrowed from the capture bytes.
#[derive(Debug)]
pub struct Capture<'a> {
    pub big_endian: bool,
    pub snaplen: u32,
    pub frames: Vec<Frame<'a>>,
}

/// Parse a classic pcap file written in either byte order.
pub fn read_capture(bytes: &[u8]) -> Result<Capture<'_>, Error> {
    let (mut rest, hdr) = pcap::parse_pcap_header(bytes)
        .map_err(|e| Error::PcapDecode(format!("bad header: {e:?}")))?;

    if hdr.network != Linktype::ETHERNET {
        return Err(Error::Linktype(hdr.network.0));
    }

    let big_endian = hdr.is_bigendian();
    let mut frames = vec![];

    while !rest.is_empty() {
        let res = if big_endian {
            pcap::parse_pcap_frame_be(rest)
        } else {
            pcap::parse_pcap_frame(rest)
        };

        let (next, block) = res.map_err(|e| {
            Error::PcapDecode(format!("bad frame {}: {e:?}", frames.len()))
        })?;

        frames.push(Frame {
            ts_sec: block.ts_sec,
            ts_usec: block.ts_usec,
            data: block.data,
        });
        rest = next;
    }

    Ok(Capture { big_endian, snaplen: hdr.snaplen, frames })
}

/// Build a little-endian capture in memory.
pub struct CaptureWriter {
    bytes: Vec<u8>,
}

impl CaptureWriter {
    pub fn new(snaplen: u32) -> Result<Self, Error> {
        let mut hdr = PcapHeader {
            magic_number: PCAP_MAGIC,
            version_major: 2,
            version_minor: 4,
            thiszone: 0,
            sigfigs: 0,
            snaplen: if snaplen == 0 { DEFAULT_SNAPLEN } else { snaplen },
            network: Linktype::ETHERNET,
        };

        let bytes = hdr
            .to_vec()
            .map_err(|e| Error::PcapEncode(format!("{e:?}")))?;
        Ok(Self { bytes })
    }

    pub fn add_frame(
        &mut self,
        ts_sec: u32,
        ts_usec: u32,
        data: &[u8],
    ) -> Result<(), Error> {
        let len = u32::try_from(data.len())
            .map_err(|_| Error::PcapEncode("frame too large".to_string()))?;

        let mut block = LegacyPcapBlock {
            ts_sec,
            ts_usec,
            caplen: len,
            origlen: len,
            data,
        };

        let bytes = block
            .to_vec()
            .map_err(|e| Error::PcapEncode(format!("{e:?}")))?;
        self.bytes.extend_from_slice(&bytes);
        Ok(())
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}
