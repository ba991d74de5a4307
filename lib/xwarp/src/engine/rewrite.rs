// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Rewriting the IPv4 destination in place.
//!
//! Only four fields are ever written: the IPv4 destination, the TOS
//! byte (when configured), and the two checksums. The IPv4 checksum is
//! recomputed over at most 60 header bytes. The TCP checksum is never
//! recomputed; the destination address enters it only through the
//! pseudo header, so it is adjusted by the difference between the old
//! and new address words.

use super::checksum::Checksum;
use super::checksum::HeaderChecksum;
use super::parse::TcpFrame;
use xwarp_api::RewriteCfg;

/// Point `frame` at `cfg.override_ip`, keeping both checksums valid.
pub fn rewrite(frame: &mut TcpFrame, cfg: &RewriteCfg) {
    let old = frame.ip.dst().bytes();
    let new = cfg.override_ip.bytes();

    frame.ip.set_dst(cfg.override_ip);
    if let Some(tos) = cfg.tos {
        frame.ip.set_tos(tos);
    }
    frame.ip.compute_hdr_csum();

    // Both halves of the address are folded into the delta.
    let mut csum = Checksum::from(HeaderChecksum::wrap(frame.tcp.csum()));
    csum.replace(&old, &new);
    frame.tcp.set_csum(HeaderChecksum::from(csum).bytes());
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::parse::Walk;
    use crate::engine::parse::parse;

    #[rustfmt::skip]
    const FRAME: [u8; 54] = [
        // ---- Ethernet ----
        0xA8, 0x40, 0x25, 0xFF, 0x77, 0x77,
        0xA8, 0x40, 0x25, 0xFA, 0xFA, 0x37,
        0x08, 0x00,
        // ---- IPv4 ----
        0x45, 0x00, 0x00, 0x28,
        0x1C, 0x46, 0x40, 0x00,
        0x40, 0x06,
        // checksum
        0x00, 0x00,
        0x0A, 0x00, 0x00, 0x36,
        0x34, 0x0A, 0x80, 0x45,
        // ---- TCP ----
        0xC3, 0x50, 0x00, 0x19,
        0x00, 0x00, 0x10, 0x00,
        0x00, 0x00, 0x00, 0x00,
        0x50, 0x02, 0xFA, 0xF0,
        // checksum
        0x00, 0x00,
        0x00, 0x00,
    ];

    // Fill in both checksums from scratch.
    fn seal(bytes: &mut [u8]) {
        bytes[24..26].copy_from_slice(&[0, 0]);
        let ip_csum = HeaderChecksum::from(Checksum::compute(&bytes[14..34]));
        bytes[24..26].copy_from_slice(&ip_csum.bytes());
        let tcp = tcp_csum(bytes);
        bytes[50..52].copy_from_slice(&tcp);
    }

    fn tcp_csum(bytes: &[u8]) -> [u8; 2] {
        let seg_len = (bytes.len() - 34) as u16;
        let mut csum = Checksum::compute(&bytes[26..34]);
        csum.add_bytes(&[0, 6]);
        csum.add_bytes(&seg_len.to_be_bytes());
        let mut seg = bytes[34..].to_vec();
        seg[16..18].copy_from_slice(&[0, 0]);
        csum.add_bytes(&seg);
        HeaderChecksum::from(csum).bytes()
    }

    fn run(bytes: &mut [u8], cfg: &RewriteCfg) {
        let Walk::Tcp(mut frame) = parse(bytes).unwrap() else {
            panic!("expected a TCP frame");
        };
        rewrite(&mut frame, cfg);
    }

    #[test]
    fn touches_only_dst_and_checksums() {
        let mut bytes = FRAME;
        seal(&mut bytes);
        let orig = bytes;

        run(&mut bytes, &RewriteCfg::default());

        assert_eq!(&bytes[30..34], &[192, 168, 30, 30]);
        for (i, (a, b)) in orig.iter().zip(bytes.iter()).enumerate() {
            let allowed = matches!(i, 24..=25 | 30..=33 | 50..=51);
            assert!(allowed || a == b, "byte {i} changed");
        }
    }

    #[test]
    fn checksums_match_scratch() {
        let mut bytes = FRAME;
        seal(&mut bytes);
        run(&mut bytes, &RewriteCfg::default());

        let mut expected = bytes;
        seal(&mut expected);
        assert_eq!(&bytes[24..26], &expected[24..26]);
        assert_eq!(&bytes[50..52], &expected[50..52]);
    }

    #[test]
    fn low_half_only_change() {
        // Only the low 16-bit word of the address differs.
        let mut bytes = FRAME;
        bytes[30..34].copy_from_slice(&[192, 168, 1, 1]);
        seal(&mut bytes);
        run(&mut bytes, &RewriteCfg::default());

        let mut expected = bytes;
        seal(&mut expected);
        assert_eq!(&bytes[50..52], &expected[50..52]);
    }

    #[test]
    fn tos_is_stamped_without_touching_tcp() {
        let mut plain = FRAME;
        seal(&mut plain);
        let mut marked = plain;

        run(&mut plain, &RewriteCfg::default());
        let cfg = RewriteCfg::default().with_tos(xwarp_api::PRIORITY_TOS);
        run(&mut marked, &cfg);

        assert_eq!(marked[15], 0x1C);
        assert_eq!(&plain[50..52], &marked[50..52]);

        let mut expected = marked;
        seal(&mut expected);
        assert_eq!(&marked[24..26], &expected[24..26]);
    }

    #[test]
    fn zero_tcp_csum_wraps() {
        // A stored checksum of 0x0000 is rolled forward like any other.
        let mut bytes = FRAME;
        seal(&mut bytes);
        bytes[50..52].copy_from_slice(&[0x00, 0x00]);
        let mut csum = Checksum::from(HeaderChecksum::wrap([0, 0]));
        csum.replace(&[52, 10, 128, 69], &[192, 168, 30, 30]);
        let want = HeaderChecksum::from(csum).bytes();

        run(&mut bytes, &RewriteCfg::default());
        assert_eq!(&bytes[50..52], &want);
    }
}
