// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use slog::Drain;
use slog::Level;
use slog::Logger;
use slog::o;

use xwarp::api::AddrGuard;
use xwarp::api::Ipv4Addr;
use xwarp::api::RewriteCfg;
use xwarp::print::print_cfg;
use xwarp::print::print_stats;
use xwarpadm::API_VERSION;
use xwarpadm::MAJOR_VERSION;
use xwarpadm::config::CfgLayer;

/// Administer the xwarp IPv4/TCP destination rewriter
#[derive(Debug, Parser)]
#[command(version = xwarp_pkg_version())]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the configuration in effect.
    ShowConfig {
        #[command(flatten)]
        cfg: CfgArgs,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run every frame of a packet capture through the engine.
    Replay {
        /// The capture to read.
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the forwarded frames.
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        cfg: CfgArgs,

        /// Print the counters as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
struct CfgArgs {
    /// A TOML configuration file. Flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// The TCP destination port to redirect.
    #[arg(long)]
    target_port: Option<u16>,

    /// The address matching packets are redirected to.
    #[arg(long)]
    override_ip: Option<Ipv4Addr>,

    /// Which addresses are checked against the override address.
    #[arg(long)]
    guard: Option<AddrGuard>,

    /// A TOS byte to stamp on redirected packets (decimal or 0x hex).
    #[arg(long, value_parser = parse_tos)]
    tos: Option<u8>,
}

impl CfgArgs {
    fn resolve(self) -> anyhow::Result<RewriteCfg> {
        let file = match &self.config {
            Some(path) => CfgLayer::load(path)?,
            None => CfgLayer::default(),
        };

        let flags = CfgLayer {
            target_port: self.target_port,
            override_ip: self.override_ip,
            guard: self.guard,
            tos: self.tos,
        };

        Ok(file.overlay(flags).resolve()?)
    }
}

fn parse_tos(s: &str) -> Result<u8, String> {
    let res = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };

    res.map_err(|e| format!("bad TOS byte {s:?}: {e}"))
}

fn xwarp_pkg_version() -> String {
    format!("{MAJOR_VERSION}.{API_VERSION}.{}", env!("CARGO_PKG_VERSION"))
}

fn build_logger(verbose: u8) -> Logger {
    let level = match verbose {
        0 => Level::Info,
        1 => Level::Debug,
        _ => Level::Trace,
    };

    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!("component" => "xwarpadm"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log = build_logger(cli.verbose);

    match cli.cmd {
        Command::ShowConfig { cfg, json } => {
            let cfg = cfg.resolve()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                print_cfg(&cfg)?;
            }
        }

        Command::Replay { input, output, cfg, json } => {
            let cfg = cfg.resolve()?;
            let bytes = fs::read(&input).with_context(|| {
                format!("failed to read {}", input.display())
            })?;

            let replay = xwarpadm::replay(&bytes, &cfg, &log)?;

            fs::write(&output, &replay.output).with_context(|| {
                format!("failed to write {}", output.display())
            })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&replay.stats)?);
            } else {
                print_stats(&replay.stats)?;
            }
        }
    }

    Ok(())
}
