// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! xwarp administration library.
//!
//! Everything a host needs to drive the engine from userland: loading
//! a configuration and replaying packet captures through
//! [`xwarp::engine::process`].

pub mod config;
pub mod pcap;

use slog::Logger;
use slog::debug;
use slog::info;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use xwarp::api::CfgError;
use xwarp::api::Disposition;
use xwarp::api::RewriteCfg;
use xwarp::engine::process;
use xwarp::engine::stat::ProcessStats;
use xwarp::engine::stat::ProcessStatsSnapshot;

pub use xwarp::api::API_VERSION;
pub use xwarp::api::MAJOR_VERSION;

/// Errors related to configuring and driving the engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {err}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    #[error("malformed config: {0}")]
    ConfigDecode(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(#[from] CfgError),

    #[error("malformed capture: {0}")]
    PcapDecode(String),

    #[error("failed to encode capture: {0}")]
    PcapEncode(String),

    /// Only Ethernet captures can be replayed.
    #[error("unsupported link type {0}")]
    Linktype(i32),
}

/// The result of replaying a capture.
#[derive(Debug)]
pub struct Replay {
    /// A capture holding every frame the engine forwarded, in order.
    pub output: Vec<u8>,
    pub stats: ProcessStatsSnapshot,
}

/// Run every frame of the capture `input` through the engine.
///
/// Forwarded frames, rewritten or not, are written to the output
/// capture. Aborted frames are left out of it, as the host would drop
/// them.
pub fn replay(
    input: &[u8],
    cfg: &RewriteCfg,
    log: &Logger,
) -> Result<Replay, Error> {
    let capture = pcap::read_capture(input)?;
    let stats = ProcessStats::new();
    let mut writer = pcap::CaptureWriter::new(capture.snaplen)?;

    info!(log, "replaying capture";
        "frames" => capture.frames.len(),
        "big_endian" => capture.big_endian,
        "config" => %cfg
    );

    for (idx, frame) in capture.frames.iter().enumerate() {
        let mut bytes = frame.data.to_vec();
        let outcome = process(&mut bytes, cfg);
        stats.record(&outcome);

        debug!(log, "frame";
            "idx" => idx,
            "len" => bytes.len(),
            "outcome" => %outcome
        );

        if outcome.disposition() == Disposition::Pass {
            writer.add_frame(frame.ts_sec, frame.ts_usec, &bytes)?;
        }
    }

    let stats = stats.snapshot();
    info!(log, "replay done";
        "rewritten" => stats.rewritten,
        "passed" => stats.passed(),
        "aborted" => stats.aborted()
    );

    Ok(Replay { output: writer.finish(), stats })
}
