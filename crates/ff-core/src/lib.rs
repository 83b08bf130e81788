// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Fastfood random features with two evaluation paths.
//!
//! The software path applies `H G P H B` through in-place Hadamard
//! transforms. The hardware path multiplies by pre-fused dense operators
//! (`Vp`, `Vg`, `Vf`) the way a fixed-point datapath would. Both feed the
//! same length correction and nonlinearity, so a fitted model produces the
//! same features through either path up to rounding.

pub mod config;
pub mod dims;
pub mod error;
pub mod fht;
pub mod hardware;
pub mod model;
pub mod observability;
pub mod phi;
pub mod random;
pub mod software;

pub use config::FastfoodConfig;
pub use dims::Dimensions;
pub use error::{FastfoodError, FastfoodResult};
pub use hardware::{HardwareOperators, HardwareStage, StageOperator};
pub use model::{Fastfood, FittedFastfood, TransformPath};
pub use phi::{HardwareScaling, Tradeoff};
pub use random::{DrawSeed, GeneratorMode, SeedPlan};
