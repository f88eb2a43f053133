// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use log::LevelFilter;

/// Installs a `pretty_env_logger` builder defaulting to `Info`, honoring
/// `RUST_LOG` overrides. The node runs its own tokio executor rather
/// than async-std, so unlike the teacher's logger there is no
/// `async_log` wrapping step.
pub fn setup_logger() {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.filter(None, LevelFilter::Info);

    if let Ok(s) = std::env::var("RUST_LOG") {
        builder.parse_filters(&s);
    }

    let _ = builder.try_init();
}
