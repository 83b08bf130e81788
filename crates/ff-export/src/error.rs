// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use thiserror::Error;

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("manifest serialisation failed: {0}")]
    Json(#[from] serde_json::Error),
    /// A value does not fit the signed fixed-point word.
    #[error("{name}: {value} does not fit in {total_bits} signed bits with {fractional_bits} fractional bits")]
    Overflow {
        name: String,
        value: f64,
        total_bits: u32,
        fractional_bits: u32,
    },
    #[error("{name}: non-finite value cannot be exported")]
    NonFinite { name: String },
    #[error("invalid export format: {message}")]
    InvalidFormat { message: String },
}
