// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Runtime configuration shared by the Fastfood crates: the determinism
//! policy that seeds unseeded draws and the global tracing subscriber.

pub mod determinism;
pub mod tracing;
