// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Common routines for integration tests.
//!
//! Frames are built and checked with smoltcp rather than with the
//! engine's own header code, so a checksum bug in the engine cannot
//! hide behind the same bug in the tests.

// This type of pedantry is more trouble than it's worth here.
#![allow(dead_code)]

pub mod pcap;

use rand::Rng;
use smoltcp::wire::EthernetAddress;
use smoltcp::wire::EthernetFrame;
use smoltcp::wire::EthernetProtocol;
use smoltcp::wire::IpAddress;
use smoltcp::wire::IpProtocol;
use smoltcp::wire::Ipv4Address;
use smoltcp::wire::Ipv4Packet;
use smoltcp::wire::TcpPacket;
use smoltcp::wire::TcpSeqNumber;

// Let's make our lives easier and pub use a bunch of stuff.
pub use xwarp::api::AddrGuard;
pub use xwarp::api::Disposition;
pub use xwarp::api::Ipv4Addr;
pub use xwarp::api::PRIORITY_TOS;
pub use xwarp::api::Protocol;
pub use xwarp::api::RewriteCfg;
pub use xwarp::engine::Outcome;
pub use xwarp::engine::ether::ETHER_TYPE_ARP;
pub use xwarp::engine::ether::ETHER_TYPE_IPV4;
pub use xwarp::engine::ether::ETHER_TYPE_IPV6;
pub use xwarp::engine::parse::Layer;
pub use xwarp::engine::parse::ParseError;
pub use xwarp::engine::predicate::PassReason;
pub use xwarp::engine::process;
pub use xwarp::engine::stat::ProcessStats;
pub use xwarp::engine::tcp::TcpFlags;

pub const ETHER_HDR_LEN: usize = 14;
pub const IPV4_HDR_LEN: usize = 20;
pub const TCP_HDR_LEN: usize = 20;

/// Offsets into a frame without IPv4 options.
pub const IP_TOS_OFF: usize = ETHER_HDR_LEN + 1;
pub const IP_CSUM_OFF: usize = ETHER_HDR_LEN + 10;
pub const IP_DST_OFF: usize = ETHER_HDR_LEN + 16;

pub const GW_MAC: [u8; 6] = [0xA8, 0x40, 0x25, 0xF7, 0x00, 0x01];
pub const GUEST_MAC: [u8; 6] = [0xA8, 0x40, 0x25, 0xFA, 0xFA, 0x37];

fn smol_addr(ip: Ipv4Addr) -> Ipv4Address {
    Ipv4Address(ip.bytes())
}

/// Build an Ethernet/IPv4/TCP frame with valid checksums.
#[derive(Clone, Debug)]
pub struct TcpFrameBuilder {
    pub eth_src: [u8; 6],
    pub eth_dst: [u8; 6],
    pub ip_src: Ipv4Addr,
    pub ip_dst: Ipv4Addr,
    pub tos: u8,
    pub ident: u16,
    pub ttl: u8,
    /// Raw IPv4 options, zero padded out to a multiple of 4 bytes.
    pub ip_opts: Vec<u8>,
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: TcpFlags,
    pub window: u16,
    pub payload: Vec<u8>,
}

impl TcpFrameBuilder {
    pub fn new(
        ip_src: Ipv4Addr,
        ip_dst: Ipv4Addr,
        src_port: u16,
        dst_port: u16,
    ) -> Self {
        Self {
            eth_src: GUEST_MAC,
            eth_dst: GW_MAC,
            ip_src,
            ip_dst,
            tos: 0,
            ident: 7777,
            ttl: 64,
            ip_opts: vec![],
            src_port,
            dst_port,
            seq: 4224936861,
            ack: 0,
            flags: TcpFlags::SYN,
            window: 64240,
            payload: vec![],
        }
    }

    pub fn tos(mut self, tos: u8) -> Self {
        self.tos = tos;
        self
    }

    pub fn ip_opts(mut self, opts: &[u8]) -> Self {
        self.ip_opts = opts.to_vec();
        self
    }

    pub fn flags(mut self, flags: TcpFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    fn ip_hdr_len(&self) -> usize {
        IPV4_HDR_LEN + self.ip_opts.len().div_ceil(4) * 4
    }

    pub fn build(&self) -> Vec<u8> {
        let ip_hdr_len = self.ip_hdr_len();
        assert!(ip_hdr_len <= 60, "too many IPv4 options");
        let seg_len = TCP_HDR_LEN + self.payload.len();
        let ip_len = ip_hdr_len + seg_len;
        let mut bytes = vec![0u8; ETHER_HDR_LEN + ip_len];

        let mut eth = EthernetFrame::new_unchecked(&mut bytes[..]);
        eth.set_src_addr(EthernetAddress(self.eth_src));
        eth.set_dst_addr(EthernetAddress(self.eth_dst));
        eth.set_ethertype(EthernetProtocol::Ipv4);

        let l3 = &mut bytes[ETHER_HDR_LEN..];
        l3[IPV4_HDR_LEN..IPV4_HDR_LEN + self.ip_opts.len()]
            .copy_from_slice(&self.ip_opts);
        let seg = &mut l3[ip_hdr_len..];
        {
            let mut tcp = TcpPacket::new_unchecked(&mut seg[..]);
            tcp.set_src_port(self.src_port);
            tcp.set_dst_port(self.dst_port);
            tcp.set_seq_number(TcpSeqNumber(self.seq as i32));
            tcp.set_ack_number(TcpSeqNumber(self.ack as i32));
            tcp.set_header_len(TCP_HDR_LEN as u8);
            tcp.set_window_len(self.window);
            tcp.set_urgent_at(0);
        }
        seg[13] = self.flags.bits();
        seg[TCP_HDR_LEN..].copy_from_slice(&self.payload);

        let mut ip = Ipv4Packet::new_unchecked(&mut l3[..]);
        ip.set_version(4);
        ip.set_header_len(ip_hdr_len as u8);
        ip.set_total_len(ip_len as u16);
        ip.set_ident(self.ident);
        ip.clear_flags();
        ip.set_dont_frag(true);
        ip.set_frag_offset(0);
        ip.set_hop_limit(self.ttl);
        ip.set_next_header(IpProtocol::Tcp);
        ip.set_src_addr(smol_addr(self.ip_src));
        ip.set_dst_addr(smol_addr(self.ip_dst));
        ip.set_dscp(self.tos >> 2);
        ip.set_ecn(self.tos & 0x03);
        ip.fill_checksum();

        fill_tcp_csum(&mut bytes);
        bytes
    }
}

/// Build an IPv4 frame carrying `payload` as protocol `proto`.
pub fn ipv4_frame(proto: u8, payload: &[u8]) -> Vec<u8> {
    let ip_len = IPV4_HDR_LEN + payload.len();
    let mut bytes = ether_frame(ETHER_TYPE_IPV4, &vec![0u8; ip_len]);

    let mut ip = Ipv4Packet::new_unchecked(&mut bytes[ETHER_HDR_LEN..]);
    ip.set_version(4);
    ip.set_header_len(IPV4_HDR_LEN as u8);
    ip.set_total_len(ip_len as u16);
    ip.set_hop_limit(64);
    ip.set_next_header(IpProtocol::from(proto));
    ip.set_src_addr(Ipv4Address([10, 0, 0, 5]));
    ip.set_dst_addr(Ipv4Address([10, 0, 0, 6]));
    ip.payload_mut().copy_from_slice(payload);
    ip.fill_checksum();
    bytes
}

/// Build an Ethernet frame carrying `payload` as `ether_type`.
pub fn ether_frame(ether_type: u16, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; ETHER_HDR_LEN + payload.len()];
    let mut eth = EthernetFrame::new_unchecked(&mut bytes[..]);
    eth.set_src_addr(EthernetAddress(GUEST_MAC));
    eth.set_dst_addr(EthernetAddress(GW_MAC));
    eth.set_ethertype(EthernetProtocol::from(ether_type));
    eth.payload_mut().copy_from_slice(payload);
    bytes
}

/// Return the IPv4 header and TCP segment of `frame`.
fn split_l3_l4(frame: &[u8]) -> (&[u8], &[u8]) {
    let l3 = &frame[ETHER_HDR_LEN..];
    let ip = Ipv4Packet::new_checked(l3).expect("bad IPv4 header");
    let hdr_len = usize::from(ip.header_len());
    let total_len = usize::from(ip.total_len());
    (&l3[..hdr_len], &l3[hdr_len..total_len])
}

fn pseudo_addrs(frame: &[u8]) -> (IpAddress, IpAddress) {
    let ip = Ipv4Packet::new_checked(&frame[ETHER_HDR_LEN..])
        .expect("bad IPv4 header");
    (IpAddress::Ipv4(ip.src_addr()), IpAddress::Ipv4(ip.dst_addr()))
}

/// Recompute the TCP checksum of `frame` from scratch and store it.
pub fn fill_tcp_csum(frame: &mut [u8]) {
    let (src, dst) = pseudo_addrs(frame);
    let (hdr, seg) = split_l3_l4(frame);
    let begin = ETHER_HDR_LEN + hdr.len();
    let end = begin + seg.len();
    let mut tcp = TcpPacket::new_unchecked(&mut frame[begin..end]);
    tcp.fill_checksum(&src, &dst);
}

/// Return the IPv4 header checksum `frame` should carry.
pub fn scratch_ipv4_csum(frame: &[u8]) -> [u8; 2] {
    let mut copy = frame.to_vec();
    let mut ip = Ipv4Packet::new_unchecked(&mut copy[ETHER_HDR_LEN..]);
    ip.fill_checksum();
    ip.checksum().to_be_bytes()
}

/// Return the TCP checksum `frame` should carry.
pub fn scratch_tcp_csum(frame: &[u8]) -> [u8; 2] {
    let mut copy = frame.to_vec();
    fill_tcp_csum(&mut copy);
    let (_, seg) = split_l3_l4(&copy);
    TcpPacket::new_unchecked(seg).checksum().to_be_bytes()
}

pub fn verify_ipv4_csum(frame: &[u8]) -> bool {
    Ipv4Packet::new_checked(&frame[ETHER_HDR_LEN..])
        .map(|ip| ip.verify_checksum())
        .unwrap_or(false)
}

pub fn verify_tcp_csum(frame: &[u8]) -> bool {
    let (src, dst) = pseudo_addrs(frame);
    let (_, seg) = split_l3_l4(frame);
    TcpPacket::new_checked(seg)
        .map(|tcp| tcp.verify_checksum(&src, &dst))
        .unwrap_or(false)
}

/// Return the IPv4 destination of `frame`.
pub fn ip_dst(frame: &[u8]) -> Ipv4Addr {
    let ip = Ipv4Packet::new_checked(&frame[ETHER_HDR_LEN..])
        .expect("bad IPv4 header");
    Ipv4Addr::from(ip.dst_addr().0)
}

/// Generate a random, well formed TCP frame.
///
/// Roughly half of the generated frames are bound for `target_port`.
/// Addresses, IPv4 options, flags and payload are all drawn from
/// `rng`, so a seeded generator yields a reproducible fixture set.
pub fn random_tcp_frame(rng: &mut impl Rng, target_port: u16) -> Vec<u8> {
    let src = Ipv4Addr::from(rng.random::<[u8; 4]>());
    let dst = Ipv4Addr::from(rng.random::<[u8; 4]>());
    let dst_port = if rng.random_bool(0.5) {
        target_port
    } else {
        rng.random_range(1..=u16::MAX)
    };

    let mut opts = vec![0u8; 4 * rng.random_range(0..=10)];
    rng.fill(&mut opts[..]);
    let mut payload = vec![0u8; rng.random_range(0..=96)];
    rng.fill(&mut payload[..]);

    let mut b = TcpFrameBuilder::new(src, dst, rng.random(), dst_port)
        .tos(rng.random())
        .ip_opts(&opts)
        .flags(TcpFlags::from_bits_retain(rng.random()))
        .payload(&payload);
    b.ident = rng.random();
    b.ttl = rng.random_range(1..=255);
    b.seq = rng.random();
    b.ack = rng.random();
    b.window = rng.random();
    b.build()
}
