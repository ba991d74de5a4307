// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Loading the rewrite configuration.
//!
//! A configuration is assembled from up to three layers: the built-in
//! defaults, an optional TOML file, and command line flags. Each layer
//! only names the fields it wants to change.
//!
//! ```toml
//! target_port = 25
//! override_ip = "192.168.30.30"
//! guard = "src-or-dst"
//! tos = 28
//! ```

use crate::Error;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::path::Path;
use xwarp::api::AddrGuard;
use xwarp::api::Ipv4Addr;
use xwarp::api::RewriteCfg;

/// A partial configuration.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CfgLayer {
    pub target_port: Option<u16>,
    pub override_ip: Option<Ipv4Addr>,
    pub guard: Option<AddrGuard>,
    pub tos: Option<u8>,
}

impl CfgLayer {
    pub fn from_toml(s: &str) -> Result<Self, Error> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let s = fs::read_to_string(path).map_err(|err| Error::ReadFile {
            path: path.to_path_buf(),
            err,
        })?;
        Self::from_toml(&s)
    }

    /// Return this layer with every field set in `top` replaced.
    pub fn overlay(self, top: CfgLayer) -> CfgLayer {
        CfgLayer {
            target_port: top.target_port.or(self.target_port),
            override_ip: top.override_ip.or(self.override_ip),
            guard: top.guard.or(self.guard),
            tos: top.tos.or(self.tos),
        }
    }

    /// Fill in the unset fields from the defaults and validate the
    /// result.
    pub fn resolve(&self) -> Result<RewriteCfg, Error> {
        let dflt = RewriteCfg::default();
        let cfg = RewriteCfg {
            target_port: self.target_port.unwrap_or(dflt.target_port),
            override_ip: self.override_ip.unwrap_or(dflt.override_ip),
            guard: self.guard.unwrap_or(dflt.guard),
            tos: self.tos.or(dflt.tos),
        };

        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use xwarp::api::CfgError;

    #[test]
    fn empty_is_default() {
        let layer = CfgLayer::from_toml("").unwrap();
        assert_eq!(layer, CfgLayer::default());
        assert_eq!(layer.resolve().unwrap(), RewriteCfg::default());
    }

    #[test]
    fn full_file() {
        let layer = CfgLayer::from_toml(
            r#"
            target_port = 587
            override_ip = "10.1.2.3"
            guard = "dst"
            tos = 28
            "#,
        )
        .unwrap();
        let cfg = layer.resolve().unwrap();

        assert_eq!(cfg.target_port, 587);
        assert_eq!(cfg.override_ip, Ipv4Addr::from([10, 1, 2, 3]));
        assert_eq!(cfg.guard, AddrGuard::Dst);
        assert_eq!(cfg.tos, Some(28));
    }

    #[test]
    fn flags_win_over_file() {
        let file = CfgLayer::from_toml(
            "target_port = 587\noverride_ip = \"10.1.2.3\"\n",
        )
        .unwrap();
        let flags = CfgLayer { target_port: Some(465), ..Default::default() };
        let cfg = file.overlay(flags).resolve().unwrap();

        assert_eq!(cfg.target_port, 465);
        assert_eq!(cfg.override_ip, Ipv4Addr::from([10, 1, 2, 3]));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            CfgLayer::from_toml("target_prot = 25"),
            Err(Error::ConfigDecode(_))
        ));
        assert!(matches!(
            CfgLayer::from_toml("override_ip = \"10.1.2\""),
            Err(Error::ConfigDecode(_))
        ));
        assert!(matches!(
            CfgLayer::from_toml("guard = \"src\""),
            Err(Error::ConfigDecode(_))
        ));
        assert!(matches!(
            CfgLayer::from_toml("target_port = 70000"),
            Err(Error::ConfigDecode(_))
        ));

        let layer = CfgLayer::from_toml("target_port = 0").unwrap();
        assert!(matches!(
            layer.resolve(),
            Err(Error::InvalidConfig(CfgError::ZeroTargetPort))
        ));
    }

    #[test]
    fn missing_file() {
        let err =
            CfgLayer::load(Path::new("/nonexistent/xwarp.toml")).unwrap_err();
        assert!(matches!(err, Error::ReadFile { .. }));
        assert!(err.to_string().contains("/nonexistent/xwarp.toml"));
    }
}
