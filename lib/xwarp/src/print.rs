// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Print engine state in a human-friendly manner.
//!
//! This is mostly just a place to hang printing routines so that they
//! can be used by both xwarpadm and integration tests.

use crate::api::RewriteCfg;
use crate::engine::stat::ProcessStatsSnapshot;
use std::io::Write;
use tabwriter::TabWriter;

/// Print a [`RewriteCfg`].
pub fn print_cfg(cfg: &RewriteCfg) -> std::io::Result<()> {
    print_cfg_into(&mut std::io::stdout(), cfg)
}

/// Print a [`RewriteCfg`].
pub fn print_cfg_into(
    writer: &mut impl Write,
    cfg: &RewriteCfg,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);
    let tos = match cfg.tos {
        Some(tos) => format!("0x{tos:02X}"),
        None => "unchanged".to_string(),
    };

    writeln!(t, "TARGET PORT\t{}", cfg.target_port)?;
    writeln!(t, "OVERRIDE IP\t{}", cfg.override_ip)?;
    writeln!(t, "GUARD\t{}", cfg.guard)?;
    writeln!(t, "TOS\t{tos}")?;
    t.flush()
}

/// Print a [`ProcessStatsSnapshot`].
pub fn print_stats(snap: &ProcessStatsSnapshot) -> std::io::Result<()> {
    print_stats_into(&mut std::io::stdout(), snap)
}

/// Print a [`ProcessStatsSnapshot`].
pub fn print_stats_into(
    writer: &mut impl Write,
    snap: &ProcessStatsSnapshot,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);

    writeln!(t, "Frames")?;
    write_hrb(&mut t)?;
    writeln!(t, "OUTCOME\tREASON\tCOUNT")?;
    write_hr(&mut t)?;

    let rows = [
        ("REWRITTEN", "-", snap.rewritten),
        ("PASS", "not ipv4", snap.pass_not_ipv4),
        ("PASS", "not tcp", snap.pass_not_tcp),
        ("PASS", "override dst", snap.pass_override_dst),
        ("PASS", "override src", snap.pass_override_src),
        ("PASS", "port mismatch", snap.pass_port_mismatch),
        ("ABORTED", "truncated L2", snap.aborted_l2),
        ("ABORTED", "truncated L3", snap.aborted_l3),
        ("ABORTED", "truncated L4", snap.aborted_l4),
        ("ABORTED", "malformed", snap.malformed),
    ];
    for (outcome, reason, count) in rows {
        writeln!(t, "{outcome}\t{reason}\t{count}")?;
    }

    write_hr(&mut t)?;
    writeln!(t, "TOTAL\t\t{}", snap.total())?;
    t.flush()
}

/// Print a horizontal rule in bold.
pub fn write_hrb(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "{:=<70}", "=")
}

/// Print a horizontal rule.
pub fn write_hr(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "{:-<70}", "-")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stats_table() {
        let snap = ProcessStatsSnapshot {
            rewritten: 3,
            pass_port_mismatch: 2,
            aborted_l2: 1,
            ..Default::default()
        };

        let mut out = Vec::new();
        print_stats_into(&mut out, &snap).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.starts_with("Frames\n"));
        let total = out.lines().last().unwrap();
        assert!(total.starts_with("TOTAL"));
        assert!(total.ends_with('6'));

        let mismatch = out
            .lines()
            .find(|l| l.contains("port mismatch"))
            .unwrap();
        assert!(mismatch.starts_with("PASS"));
        assert!(mismatch.ends_with('2'));
    }

    #[test]
    fn cfg_table() {
        let cfg = RewriteCfg::default().with_tos(0x1C);
        let mut out = Vec::new();
        print_cfg_into(&mut out, &cfg).unwrap();
        let out = String::from_utf8(out).unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("TARGET PORT"));
        assert!(lines[0].ends_with("25"));
        assert!(lines[1].ends_with("192.168.30.30"));
        assert!(lines[2].ends_with("src-or-dst"));
        assert!(lines[3].ends_with("0x1C"));
    }
}
