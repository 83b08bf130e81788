// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Signed fixed-point encoding and the C-style initialiser records consumed
//! by HLS test benches.

use std::fmt::Write as _;

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ExportResult};

/// Two's-complement word with `fractional_bits` of the `total_bits` after the
/// binary point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedPointFormat {
    pub fractional_bits: u32,
    pub total_bits: u32,
    /// Cast emitted in every record, usually a typedef of the datapath word.
    pub type_name: String,
}

impl Default for FixedPointFormat {
    fn default() -> Self {
        Self {
            fractional_bits: 9,
            total_bits: 32,
            type_name: "PRECTYPE".to_string(),
        }
    }
}

impl FixedPointFormat {
    pub fn new(fractional_bits: u32, total_bits: u32, type_name: impl Into<String>) -> ExportResult<Self> {
        let format = Self {
            fractional_bits,
            total_bits,
            type_name: type_name.into(),
        };
        format.validate()?;
        Ok(format)
    }

    pub fn validate(&self) -> ExportResult<()> {
        if !(2..=64).contains(&self.total_bits) {
            return Err(ExportError::InvalidFormat {
                message: format!("total_bits {} outside 2..=64", self.total_bits),
            });
        }
        if self.fractional_bits >= self.total_bits {
            return Err(ExportError::InvalidFormat {
                message: format!(
                    "fractional_bits {} must be below total_bits {}",
                    self.fractional_bits, self.total_bits
                ),
            });
        }
        if self.type_name.trim().is_empty() {
            return Err(ExportError::InvalidFormat {
                message: "type_name is empty".to_string(),
            });
        }
        Ok(())
    }

    /// Smallest and largest representable raw words.
    pub fn raw_range(&self) -> (i64, i64) {
        let half = 1i128 << (self.total_bits - 1);
        ((-half) as i64, (half - 1) as i64)
    }

    /// `round_half_away_from_zero(value · 2^fractional_bits)`.
    pub fn encode(&self, name: &str, value: f64) -> ExportResult<i64> {
        if !value.is_finite() {
            return Err(ExportError::NonFinite {
                name: name.to_string(),
            });
        }
        let scaled = (value * 2f64.powi(self.fractional_bits as i32)).round();
        let limit = 2f64.powi(self.total_bits as i32 - 1);
        if scaled < -limit || scaled >= limit {
            return Err(ExportError::Overflow {
                name: name.to_string(),
                value,
                total_bits: self.total_bits,
                fractional_bits: self.fractional_bits,
            });
        }
        Ok(scaled as i64)
    }

    pub fn decode(&self, raw: i64) -> f64 {
        raw as f64 / 2f64.powi(self.fractional_bits as i32)
    }

    /// `NAME[i][j] = (TYPE) raw`, one line per entry in row-major order.
    pub fn matrix_records(&self, name: &str, values: ArrayView2<'_, f64>) -> ExportResult<String> {
        let mut out = String::with_capacity(values.len() * (name.len() + 24));
        for ((i, j), &value) in values.indexed_iter() {
            let raw = self.encode(name, value)?;
            let _ = writeln!(out, "{name}[{i}][{j}] = ({}) {raw}", self.type_name);
        }
        Ok(out)
    }

    /// `NAME[i] = (TYPE) raw` for one-dimensional tables.
    pub fn vector_records(&self, name: &str, values: ArrayView1<'_, f64>) -> ExportResult<String> {
        let mut out = String::with_capacity(values.len() * (name.len() + 20));
        for (i, &value) in values.iter().enumerate() {
            let raw = self.encode(name, value)?;
            let _ = writeln!(out, "{name}[{i}] = ({}) {raw}", self.type_name);
        }
        Ok(out)
    }
}
