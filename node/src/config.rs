// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use address::Address;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::cli::Opts;
use crate::Error;

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_block_time_ms() -> u64 {
    2_000
}

fn default_miner() -> Address {
    Address::new_id(1_000)
}

fn default_wallet_seed() -> u64 {
    0
}

fn default_rpc_address() -> SocketAddr {
    "127.0.0.1:2345".parse().expect("valid default address")
}

/// Node configuration, merged from a TOML file (if any) and CLI flag
/// overrides. Every field has a default so an empty or absent config
/// file is a valid configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Milliseconds between automatically mined tipsets. Ignored when
    /// `instamine` is set.
    #[serde(default = "default_block_time_ms")]
    pub block_time_ms: u64,
    /// When set, every accepted message mines a tipset immediately
    /// instead of waiting for the block-time timer.
    #[serde(default)]
    pub instamine: bool,
    #[serde(default = "default_miner")]
    pub miner: Address,
    /// Seed for the deterministic PRNG used to generate genesis accounts.
    #[serde(default = "default_wallet_seed")]
    pub wallet_seed: u64,
    #[serde(default = "default_rpc_address")]
    pub rpc_address: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            block_time_ms: default_block_time_ms(),
            instamine: false,
            miner: default_miner(),
            wallet_seed: default_wallet_seed(),
            rpc_address: default_rpc_address(),
        }
    }
}

fn read_config_or_none(path: &Path) -> Option<Config> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("could not read config file at {}: {e}", path.display());
            return None;
        }
    };
    match toml::from_str(&contents) {
        Ok(cfg) => {
            info!("loaded configuration from {}", path.display());
            Some(cfg)
        }
        Err(e) => {
            warn!("malformed config file at {}: {e}, using defaults", path.display());
            None
        }
    }
}

impl Opts {
    /// Loads the base config from `self.config` if set, then layers the
    /// rest of the CLI flags on top — mirroring how the teacher's
    /// `CliOpts::to_config` starts from a file and overrides field by
    /// field with whatever flags were actually passed.
    pub fn to_config(&self) -> Result<Config, Error> {
        let mut cfg = match &self.config {
            Some(path) => read_config_or_none(path).unwrap_or_default(),
            None => Config::default(),
        };

        if let Some(data_dir) = &self.data_dir {
            cfg.data_dir = data_dir.clone();
        }
        if let Some(block_time_ms) = self.block_time_ms {
            cfg.block_time_ms = block_time_ms;
        }
        if let Some(instamine) = self.instamine {
            cfg.instamine = instamine;
        }
        if let Some(miner) = &self.miner {
            cfg.miner = miner.clone();
        }
        if let Some(wallet_seed) = self.wallet_seed {
            cfg.wallet_seed = wallet_seed;
        }
        if let Some(rpc_address) = self.rpc_address {
            cfg.rpc_address = rpc_address;
        }

        Ok(cfg)
    }
}
