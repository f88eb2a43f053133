// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::net::SocketAddr;
use std::path::PathBuf;

use address::Address;
use clap::{Parser, Subcommand};

/// Local-testing Filecoin simulator node.
#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"), author = env!("CARGO_PKG_AUTHORS"), version, about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    #[clap(flatten)]
    pub opts: Opts,
    #[clap(subcommand)]
    pub cmd: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the node and serve the HTTP surface (default if no
    /// subcommand is given).
    Run,
    /// Mine a single tipset against the node's own store and exit.
    Mine {
        #[clap(long, default_value_t = 1)]
        count: u64,
    },
}

/// CLI flag overrides for [`crate::config::Config`]. Every field is
/// optional so an unset flag leaves the config-file or default value
/// untouched.
#[derive(Parser, Clone, Debug, Default)]
pub struct Opts {
    /// A TOML file containing node configuration.
    #[clap(short, long)]
    pub config: Option<PathBuf>,
    #[clap(long)]
    pub data_dir: Option<PathBuf>,
    #[clap(long)]
    pub block_time_ms: Option<u64>,
    #[clap(long)]
    pub instamine: Option<bool>,
    #[clap(long)]
    pub miner: Option<Address>,
    #[clap(long)]
    pub wallet_seed: Option<u64>,
    #[clap(long)]
    pub rpc_address: Option<SocketAddr>,
}
