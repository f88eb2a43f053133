// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::process;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use node::cli::{Cli, Command};
use node::engine::Simulator;
use node::rpc;

#[tokio::main]
async fn main() {
    node::logger::setup_logger();

    let cli = Cli::parse();
    let config = match cli.opts.to_config() {
        Ok(config) => config,
        Err(e) => cli_error_and_die(format!("error loading configuration: {e}")),
    };

    let sim = Arc::new(Simulator::new(config.clone()));
    if let Err(e) = sim.init().await {
        cli_error_and_die(format!("failed to initialize simulator: {e}"));
    }
    sim.wait_for_ready().await;

    match cli.cmd {
        Some(Command::Mine { count }) => match sim.mine_tipset(count).await {
            Ok(tipset) => info!("mined {count} tipset(s); now at height {}", tipset.epoch()),
            Err(e) => cli_error_and_die(format!("mining failed: {e}")),
        },
        Some(Command::Run) | None => {
            info!("serving HTTP surface on {}", config.rpc_address);
            let app = rpc::router(sim.clone());
            let listener = match tokio::net::TcpListener::bind(config.rpc_address).await {
                Ok(listener) => listener,
                Err(e) => cli_error_and_die(format!("failed to bind {}: {e}", config.rpc_address)),
            };
            if let Err(e) = axum::serve(listener, app).await {
                cli_error_and_die(format!("HTTP server error: {e}"));
            }
        }
    }
}

fn cli_error_and_die(msg: String) -> ! {
    error!("{msg}");
    process::exit(1);
}
