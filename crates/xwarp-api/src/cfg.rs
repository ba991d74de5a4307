// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Rewrite configuration.
//!
//! The configuration is supplied once, at load time, and is never
//! modified afterwards. Hosts that support reconfiguration must swap
//! in a whole new [`RewriteCfg`] value rather than editing the fields
//! of one that packets may currently be processed against.

use super::ip::Ipv4Addr;
use core::fmt;
use core::fmt::Display;
use core::result;
use core::str::FromStr;
use serde::Deserialize;
use serde::Serialize;

/// The TCP port redirected when none is configured (SMTP).
pub const DEFAULT_TARGET_PORT: u16 = 25;

/// The address written into matching packets when none is configured.
pub const DEFAULT_OVERRIDE_IP: Ipv4Addr =
    Ipv4Addr::from_const([192, 168, 30, 30]);

/// A TOS byte carrying IP precedence 7 (network control).
pub const PRIORITY_TOS: u8 = 7 << 2;

/// Which of a packet's addresses are compared against the override
/// address before the packet is rewritten.
///
/// The destination is always checked; rewriting a packet that already
/// carries the override address as its destination would not be
/// idempotent.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum AddrGuard {
    /// Leave packets alone if either the source or the destination is
    /// the override address, e.g. replies coming back from it.
    #[default]
    SrcOrDst,
    /// Only leave packets alone whose destination is already the
    /// override address.
    Dst,
}

impl FromStr for AddrGuard {
    type Err = CfgError;

    fn from_str(s: &str) -> result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("src-or-dst") {
            Ok(Self::SrcOrDst)
        } else if s.eq_ignore_ascii_case("dst") {
            Ok(Self::Dst)
        } else {
            Err(CfgError::BadGuard)
        }
    }
}

impl Display for AddrGuard {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::SrcOrDst => "src-or-dst",
            Self::Dst => "dst",
        };

        write!(f, "{s}")
    }
}

/// Errors found while validating a configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CfgError {
    BadGuard,
    ZeroTargetPort,
    UnspecifiedOverride,
}

impl Display for CfgError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::BadGuard => {
                write!(f, "guard must be one of: src-or-dst, dst")
            }
            Self::ZeroTargetPort => write!(f, "target port must be non-zero"),
            Self::UnspecifiedOverride => {
                write!(f, "override address must not be 0.0.0.0")
            }
        }
    }
}

impl core::error::Error for CfgError {}

/// The immutable parameters of the rewrite pipeline.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RewriteCfg {
    /// The TCP destination port selecting packets for rewrite.
    pub target_port: u16,
    /// The IPv4 destination address written into matching packets.
    pub override_ip: Ipv4Addr,
    #[serde(default)]
    pub guard: AddrGuard,
    /// A TOS byte to stamp on rewritten packets, if any.
    #[serde(default)]
    pub tos: Option<u8>,
}

impl Default for RewriteCfg {
    fn default() -> Self {
        Self {
            target_port: DEFAULT_TARGET_PORT,
            override_ip: DEFAULT_OVERRIDE_IP,
            guard: AddrGuard::default(),
            tos: None,
        }
    }
}

impl RewriteCfg {
    pub fn new(target_port: u16, override_ip: Ipv4Addr) -> Self {
        Self { target_port, override_ip, ..Default::default() }
    }

    pub fn with_guard(mut self, guard: AddrGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_tos(mut self, tos: u8) -> Self {
        self.tos = Some(tos);
        self
    }

    /// Check the configuration is usable before handing it to the
    /// engine.
    pub fn validate(&self) -> result::Result<(), CfgError> {
        if self.target_port == 0 {
            return Err(CfgError::ZeroTargetPort);
        }

        if self.override_ip == Ipv4Addr::ANY_ADDR {
            return Err(CfgError::UnspecifiedOverride);
        }

        Ok(())
    }
}

impl Display for RewriteCfg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "tcp/{} => {} (guard: {}",
            self.target_port, self.override_ip, self.guard
        )?;

        match self.tos {
            Some(tos) => write!(f, ", tos: 0x{tos:02X})"),
            None => write!(f, ")"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = RewriteCfg::default();
        assert_eq!(cfg.target_port, 25);
        assert_eq!(cfg.override_ip.bytes(), [192, 168, 30, 30]);
        assert_eq!(cfg.guard, AddrGuard::SrcOrDst);
        assert_eq!(cfg.tos, None);
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(
            format!("{cfg}"),
            "tcp/25 => 192.168.30.30 (guard: src-or-dst)"
        );
    }

    #[test]
    fn validate_rejects_unusable() {
        let cfg = RewriteCfg::new(0, DEFAULT_OVERRIDE_IP);
        assert_eq!(cfg.validate(), Err(CfgError::ZeroTargetPort));

        let cfg = RewriteCfg::new(25, Ipv4Addr::ANY_ADDR);
        assert_eq!(cfg.validate(), Err(CfgError::UnspecifiedOverride));
    }

    #[test]
    fn guard_from_str() {
        assert_eq!("src-or-dst".parse(), Ok(AddrGuard::SrcOrDst));
        assert_eq!("DST".parse(), Ok(AddrGuard::Dst));
        assert_eq!("src".parse::<AddrGuard>(), Err(CfgError::BadGuard));
    }

    #[test]
    fn deserialize_with_defaults() {
        let cfg: RewriteCfg = serde_json::from_str(
            r#"{ "target_port": 587, "override_ip": "10.0.0.9" }"#,
        )
        .unwrap();
        assert_eq!(cfg.target_port, 587);
        assert_eq!(cfg.override_ip, Ipv4Addr::from([10, 0, 0, 9]));
        assert_eq!(cfg.guard, AddrGuard::SrcOrDst);
        assert_eq!(cfg.tos, None);

        let cfg: RewriteCfg = serde_json::from_str(
            r#"{ "target_port": 25, "override_ip": "10.0.0.9",
                 "guard": "dst", "tos": 28 }"#,
        )
        .unwrap();
        assert_eq!(cfg.guard, AddrGuard::Dst);
        assert_eq!(cfg.tos, Some(PRIORITY_TOS));

        assert!(
            serde_json::from_str::<RewriteCfg>(
                r#"{ "target_port": 25, "override_ip": "10.0.0.9",
                     "bogus": 1 }"#,
            )
            .is_err()
        );
    }
}
