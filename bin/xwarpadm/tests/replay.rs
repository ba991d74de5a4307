// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Replaying captures through the engine.

use slog::Discard;
use slog::Logger;
use slog::o;
use xwarp_test_utils::pcap::PcapBuilder;
use xwarp_test_utils::*;
use xwarpadm::Error;
use xwarpadm::pcap::read_capture;
use xwarpadm::replay;

fn log() -> Logger {
    Logger::root(Discard, o!())
}

fn frames() -> Vec<Vec<u8>> {
    let guest: Ipv4Addr = "10.0.0.54".parse().unwrap();
    let remote: Ipv4Addr = "52.10.128.69".parse().unwrap();

    vec![
        // SYN to port 25, rewritten.
        TcpFrameBuilder::new(guest, remote, 50000, 25).build(),
        // HTTPS, passed.
        TcpFrameBuilder::new(guest, remote, 50001, 443).build(),
        // ARP, passed.
        ether_frame(ETHER_TYPE_ARP, &[0; 28]),
        // Runt, aborted.
        vec![0xFF; 10],
        // Data to port 25 with options, rewritten.
        TcpFrameBuilder::new(guest, remote, 50000, 25)
            .ip_opts(&[0x01; 8])
            .flags(TcpFlags::PSH | TcpFlags::ACK)
            .payload(b"DATA\r\n")
            .build(),
    ]
}

fn check_replay(capture: &[u8]) {
    let cfg = RewriteCfg::default();
    let input = frames();
    let out = replay(capture, &cfg, &log()).unwrap();

    assert_eq!(out.stats.rewritten, 2);
    assert_eq!(out.stats.pass_port_mismatch, 1);
    assert_eq!(out.stats.pass_not_ipv4, 1);
    assert_eq!(out.stats.aborted_l2, 1);
    assert_eq!(out.stats.total(), 5);

    let written = read_capture(&out.output).unwrap();
    assert!(!written.big_endian);
    assert_eq!(written.frames.len(), 4);

    // Forwarded frames keep their order; the runt is gone.
    let rewritten = [written.frames[0].data, written.frames[3].data];
    for frame in rewritten {
        assert_eq!(ip_dst(frame), cfg.override_ip);
        assert!(verify_ipv4_csum(frame));
        assert!(verify_tcp_csum(frame));
    }
    assert_eq!(written.frames[1].data, &input[1][..]);
    assert_eq!(written.frames[2].data, &input[2][..]);
}

#[test]
fn replay_little_endian() {
    let mut pcap = PcapBuilder::new();
    for f in frames() {
        pcap.add_pkt(&f);
    }
    check_replay(&pcap.finish());
}

#[test]
fn replay_big_endian() {
    let mut pcap = PcapBuilder::new_big_endian();
    for f in frames() {
        pcap.add_pkt(&f);
    }

    let bytes = pcap.finish();
    assert!(read_capture(&bytes).unwrap().big_endian);
    check_replay(&bytes);
}

#[test]
fn replay_output_is_stable() {
    // Replaying an already rewritten capture changes nothing more.
    let mut pcap = PcapBuilder::new();
    for f in frames() {
        pcap.add_pkt(&f);
    }

    let cfg = RewriteCfg::default();
    let first = replay(&pcap.finish(), &cfg, &log()).unwrap();
    let second = replay(&first.output, &cfg, &log()).unwrap();

    assert_eq!(second.output, first.output);
    assert_eq!(second.stats.rewritten, 0);
    assert_eq!(second.stats.pass_override_dst, 2);
}

#[test]
fn truncated_capture_fails() {
    let mut pcap = PcapBuilder::new();
    pcap.add_pkt(&frames()[0]);
    let mut bytes = pcap.finish();
    bytes.truncate(bytes.len() - 5);

    assert!(matches!(
        replay(&bytes, &RewriteCfg::default(), &log()),
        Err(Error::PcapDecode(_))
    ));
}
