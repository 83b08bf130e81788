// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Parameter dumps for hardware builds of a fitted Fastfood model:
//! fixed-point initialiser records, delimited tables, the cosine lookup
//! table and a JSON manifest.

pub mod error;
pub mod fixed;
pub mod params;
pub mod table;
pub mod writer;

pub use error::{ExportError, ExportResult};
pub use fixed::FixedPointFormat;
pub use params::{cosine_lut, readout_weights, ExportConfig, Parameter, ParameterSet};
pub use table::TableFormat;
pub use writer::{Manifest, ParameterWriter, MANIFEST_FILE};
