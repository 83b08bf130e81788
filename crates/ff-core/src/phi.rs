// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Feature nonlinearities applied to the scaled projection.

use core::f64::consts::{PI, TAU};
use core::fmt;
use core::str::FromStr;

use ndarray::{s, Array1, Array2, ArrayView1, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{FastfoodError, FastfoodResult};

/// Which feature map the model emits. Changes the output width.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tradeoff {
    /// `[cos(x), sin(x)] / sqrt(n)`, two features per projection.
    Accuracy,
    /// `cos(2π(x + U)) · sqrt(2/n)`, one feature per projection, suited to a
    /// cosine lookup table addressed in turns rather than radians.
    #[default]
    #[serde(rename = "mem", alias = "memory")]
    Memory,
}

impl Tradeoff {
    /// Width of the feature vector for `n` projections.
    pub fn output_width(self, n: usize) -> usize {
        match self {
            Tradeoff::Accuracy => 2 * n,
            Tradeoff::Memory => n,
        }
    }

    /// Applies the map to an `(examples, n)` projection.
    ///
    /// `phase` must hold one offset per projection column; only the memory
    /// map reads it.
    pub fn apply(
        self,
        projection: Array2<f64>,
        phase: ArrayView1<'_, f64>,
    ) -> FastfoodResult<Array2<f64>> {
        if phase.len() != projection.ncols() {
            return Err(FastfoodError::InputWidth {
                expected: phase.len(),
                got: projection.ncols(),
            });
        }
        Ok(match self {
            Tradeoff::Accuracy => cos_sin(&projection),
            Tradeoff::Memory => shifted_cosine(projection, phase),
        })
    }
}

impl FromStr for Tradeoff {
    type Err = FastfoodError;

    fn from_str(s: &str) -> FastfoodResult<Self> {
        match s {
            "accuracy" => Ok(Tradeoff::Accuracy),
            "mem" | "memory" => Ok(Tradeoff::Memory),
            other => Err(FastfoodError::UnsupportedTradeoff {
                tag: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Tradeoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tradeoff::Accuracy => f.write_str("accuracy"),
            Tradeoff::Memory => f.write_str("mem"),
        }
    }
}

fn cos_sin(projection: &Array2<f64>) -> Array2<f64> {
    let (rows, n) = projection.dim();
    let norm = 1.0 / (n as f64).sqrt();
    let mut out = Array2::zeros((rows, 2 * n));
    Zip::from(out.slice_mut(s![.., ..n]))
        .and(projection)
        .for_each(|dst, &x| *dst = x.cos() * norm);
    Zip::from(out.slice_mut(s![.., n..]))
        .and(projection)
        .for_each(|dst, &x| *dst = x.sin() * norm);
    out
}

fn shifted_cosine(mut projection: Array2<f64>, phase: ArrayView1<'_, f64>) -> Array2<f64> {
    let amplitude = (2.0 / projection.ncols() as f64).sqrt();
    for mut row in projection.axis_iter_mut(Axis(0)) {
        Zip::from(&mut row)
            .and(&phase)
            .for_each(|x, &u| *x = (TAU * (*x + u)).cos() * amplitude);
    }
    projection
}

/// Constants of the lookup-table datapath: the scale already folded with
/// `1/(sigma·sqrt(d))`, the phase in radians and the cosine amplitude.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HardwareScaling {
    /// `S / (sigma · sqrt(d))`, k×d.
    pub scaling: Array2<f64>,
    /// `2π · U`, length n.
    pub phase: Array1<f64>,
    /// `sqrt(2/n)`.
    pub amplitude: f64,
}

impl HardwareScaling {
    pub fn new(scaling: &Array2<f64>, phase: &Array1<f64>, sigma: f64, d: usize) -> Self {
        let factor = 1.0 / (sigma * (d as f64).sqrt());
        Self {
            scaling: scaling.mapv(|s| s * factor),
            phase: phase.mapv(|u| TAU * u),
            amplitude: (2.0 / phase.len() as f64).sqrt(),
        }
    }

    /// Lookup-table feature for one unscaled projection row:
    /// `A · cos(π · (h ⊙ S_hw) + U_hw)`, with the lookup argument in
    /// half-turns.
    pub fn lut_features(&self, projection: ArrayView1<'_, f64>) -> Array1<f64> {
        projection
            .iter()
            .zip(self.scaling.iter())
            .zip(self.phase.iter())
            .map(|((&h, &s), &u)| self.amplitude * (PI * h * s + u).cos())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn widths_follow_tradeoff() {
        assert_eq!(Tradeoff::Accuracy.output_width(16), 32);
        assert_eq!(Tradeoff::Memory.output_width(16), 16);
    }

    #[test]
    fn parses_tags() {
        assert_eq!("accuracy".parse::<Tradeoff>().unwrap(), Tradeoff::Accuracy);
        assert_eq!("mem".parse::<Tradeoff>().unwrap(), Tradeoff::Memory);
        assert_eq!("memory".parse::<Tradeoff>().unwrap(), Tradeoff::Memory);
        assert!(matches!(
            "fast".parse::<Tradeoff>(),
            Err(FastfoodError::UnsupportedTradeoff { .. })
        ));
    }

    #[test]
    fn accuracy_map_of_zero() {
        let zeros = Array2::zeros((3, 4));
        let phase = Array1::zeros(4);
        let out = Tradeoff::Accuracy.apply(zeros, phase.view()).unwrap();
        assert_eq!(out.dim(), (3, 8));
        for row in out.rows() {
            for &v in row.slice(s![..4]) {
                assert_relative_eq!(v, 0.5, epsilon = 1e-15);
            }
            for &v in row.slice(s![4..]) {
                assert_eq!(v, 0.0);
            }
        }
    }

    #[test]
    fn memory_map_uses_turns() {
        let projection = array![[0.25, 0.5]];
        let phase = array![0.0, 0.25];
        let out = Tradeoff::Memory.apply(projection, phase.view()).unwrap();
        assert_relative_eq!(out[[0, 0]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(out[[0, 1]], 0.0, epsilon = 1e-12);
        let out = Tradeoff::Memory
            .apply(array![[1.0, 0.5]], array![0.0, 0.0].view())
            .unwrap();
        assert_relative_eq!(out[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(out[[0, 1]], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn phase_length_must_match_projection() {
        for tradeoff in [Tradeoff::Accuracy, Tradeoff::Memory] {
            let err = tradeoff
                .apply(Array2::zeros((2, 4)), Array1::zeros(3).view())
                .unwrap_err();
            assert_eq!(err, FastfoodError::InputWidth { expected: 3, got: 4 });
        }
    }

    #[test]
    fn serde_tags_match_display() {
        for tradeoff in [Tradeoff::Accuracy, Tradeoff::Memory] {
            let json = serde_json::to_string(&tradeoff).unwrap();
            assert_eq!(json, format!("\"{tradeoff}\""));
        }
        assert_eq!(
            serde_json::from_str::<Tradeoff>("\"memory\"").unwrap(),
            Tradeoff::Memory
        );
    }

    #[test]
    fn hardware_scaling_folds_sigma() {
        let s = array![[2.0, 4.0]];
        let u = array![0.5, 0.0];
        let hw = HardwareScaling::new(&s, &u, 0.5, 4);
        assert_eq!(hw.scaling, array![[2.0, 4.0]]);
        assert_relative_eq!(hw.phase[0], PI, epsilon = 1e-15);
        assert_relative_eq!(hw.amplitude, 1.0, epsilon = 1e-15);
        let feats = hw.lut_features(array![0.0, 0.25].view());
        assert_relative_eq!(feats[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(feats[1], -1.0, epsilon = 1e-12);
    }
}
