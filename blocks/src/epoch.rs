// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

/// A period in which a tipset may be produced. The simulator's epochs are
/// assigned by the mining engine rather than derived from wall-clock
/// time, so the type lives alongside the headers it numbers instead of a
/// standalone clock crate.
pub type ChainEpoch = i64;
