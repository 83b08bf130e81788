// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use thiserror::Error;

/// Result alias used throughout the Fastfood engine.
pub type FastfoodResult<T> = Result<T, FastfoodError>;

/// Errors emitted while configuring, fitting or applying a Fastfood model.
///
/// None of these are recoverable inside the engine: `fit` either returns a
/// complete parameter set or one of these, and transforms never return a
/// partially filled feature matrix.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FastfoodError {
    /// Generator mode tag outside `{0, 1, 2}`.
    #[error("unsupported generator mode {tag} (expected 0, 1 or 2)")]
    UnsupportedGenerator { tag: i64 },
    /// Hardware stage tag other than `Vp`, `Vg` or `Vf`.
    #[error("unsupported hardware stage {tag:?} (expected Vp, Vg or Vf)")]
    UnsupportedStage { tag: String },
    /// Nonlinearity tag other than `accuracy` or `mem`.
    #[error("unsupported tradeoff {tag:?} (expected accuracy or mem)")]
    UnsupportedTradeoff { tag: String },
    /// Sparsity must keep the density `1 - sparsity` inside `(0, 1]`.
    #[error("sparsity {sparsity} must lie in [0, 1)")]
    InvalidSparsity { sparsity: f64 },
    /// Kernel bandwidth must be positive and finite.
    #[error("sigma must be positive and finite, got {sigma}")]
    InvalidSigma { sigma: f64 },
    /// A requested dimension was zero.
    #[error("{label} must be at least 1")]
    InvalidDimension { label: &'static str },
    /// Hadamard lengths must be powers of two larger than one.
    #[error("row length {len} is not a power of two greater than one")]
    NotPowerOfTwo { len: usize },
    /// Input batch width does not match the fitted feature count.
    #[error("input has {got} features but the model was fitted for {expected}")]
    InputWidth { expected: usize, got: usize },
    /// A row of `coeff * G` had zero Euclidean norm, so `S` is undefined.
    #[error("row {row} of the scaled generator matrix has zero norm")]
    ZeroRowNorm { row: usize },
    /// A derived quantity became NaN or infinite.
    #[error("non-finite value while computing {label}")]
    NonFinite { label: &'static str },
    /// Configuration could not be parsed.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
    /// Reshaping an intermediate buffer failed.
    #[error("buffer layout error: {0}")]
    Layout(#[from] ndarray::ShapeError),
}
