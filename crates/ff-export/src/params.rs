// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Named parameter tables collected from a fitted model.

use core::f64::consts::PI;

use ff_core::{Dimensions, FittedFastfood, HardwareStage, Tradeoff};
use ndarray::{s, Array1, Array2, Axis};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ExportResult};
use crate::table::TableFormat;

/// Which quantities end up in a [`ParameterSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Export `S_hw`/`U_hw` with `1/(sigma·sqrt(d))` and `2π` folded in,
    /// instead of the raw `S` and `U`.
    pub hardware_scaling: bool,
    /// Entries of the cosine lookup table, if one is wanted.
    pub lut_points: Option<usize>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            hardware_scaling: true,
            lut_points: None,
        }
    }
}

/// One exported matrix. Vectors are stored as a single row.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub name: &'static str,
    pub values: Array2<f64>,
    pub table: TableFormat,
}

/// Everything a hardware build needs from one fitted model.
///
/// `B` is exported with its `pad` trailing columns zeroed, matching the
/// operators folded into `PHB`, `GPHB` and `HGPHB`.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSet {
    pub dims: Dimensions,
    pub sigma: f64,
    pub mode_tag: u8,
    pub tradeoff: Tradeoff,
    pub coeff: f64,
    pub hardware_scaling: bool,
    pub parameters: Vec<Parameter>,
    /// Cosine table as `COS_LUT`, one-dimensional.
    pub cosine_lut: Option<Array1<f64>>,
}

impl ParameterSet {
    /// Collects the hardware-scaled parameter set.
    pub fn from_model(fitted: &FittedFastfood, alpha: &Array1<f64>) -> ExportResult<Self> {
        Self::from_model_with(fitted, alpha, &ExportConfig::default())
    }

    pub fn from_model_with(
        fitted: &FittedFastfood,
        alpha: &Array1<f64>,
        config: &ExportConfig,
    ) -> ExportResult<Self> {
        let dims = fitted.dimensions();
        if alpha.len() != dims.n {
            return Err(ExportError::InvalidFormat {
                message: format!("ALPHA has {} entries, model has n = {}", alpha.len(), dims.n),
            });
        }
        let (scaling, phase) = if config.hardware_scaling {
            let hw = fitted.hardware_scaling();
            (hw.scaling.clone(), hw.phase.clone())
        } else {
            (fitted.scaling().clone(), fitted.phase().clone())
        };
        // Padded inputs are zero there, so the datapath sees B with its pad columns cleared.
        let mut signs = fitted.signs().clone();
        signs.slice_mut(s![.., dims.d_orig..]).fill(0.0);
        let ops = fitted.hardware();
        let operator = |stage| ops.stage(stage).matrix().clone();
        let row = |v: Array1<f64>| v.insert_axis(Axis(0));
        let dense = TableFormat::default();

        let parameters = vec![
            Parameter {
                name: "B",
                values: signs,
                table: TableFormat::integer(),
            },
            Parameter {
                name: "G",
                values: fitted.gaussian().clone(),
                table: dense,
            },
            Parameter {
                name: "S",
                values: scaling,
                table: dense,
            },
            Parameter {
                name: "U",
                values: row(phase),
                table: dense,
            },
            Parameter {
                name: "PHB",
                values: operator(HardwareStage::Vp),
                table: TableFormat::integer(),
            },
            Parameter {
                name: "GPHB",
                values: operator(HardwareStage::Vg),
                table: TableFormat::fixed(10, 5),
            },
            Parameter {
                name: "HGPHB",
                values: operator(HardwareStage::Vf),
                table: TableFormat::fixed(10, 5),
            },
            Parameter {
                name: "H",
                values: ops.hadamard().clone(),
                table: TableFormat::integer(),
            },
            Parameter {
                name: "ALPHA",
                values: row(alpha.clone()),
                table: dense,
            },
        ];

        let amplitude = fitted.hardware_scaling().amplitude;
        let cosine_lut = config
            .lut_points
            .map(|npts| cosine_lut(npts, amplitude))
            .transpose()?;

        Ok(Self {
            dims,
            sigma: fitted.config().sigma,
            mode_tag: fitted.mode().tag(),
            tradeoff: fitted.tradeoff(),
            coeff: fitted.coeff(),
            hardware_scaling: config.hardware_scaling,
            parameters,
            cosine_lut,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Readout vector `alpha ~ N(0, 1)` of length `n`.
pub fn readout_weights<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Array1<f64> {
    Array1::from_shape_simple_fn(n, || StandardNormal.sample(rng))
}

/// `npts` samples of `amplitude · cos(π x)` over two half-turns, addressed the
/// way the datapath indexes its cosine ROM. `npts` must be a power of two.
pub fn cosine_lut(npts: usize, amplitude: f64) -> ExportResult<Array1<f64>> {
    if npts < 2 || !npts.is_power_of_two() {
        return Err(ExportError::InvalidFormat {
            message: format!("cosine table size {npts} is not a power of two above one"),
        });
    }
    let half = (1usize << (npts.trailing_zeros() - 1)) as f64;
    let step = npts as f64 / (npts - 1) as f64;
    Ok(Array1::from_shape_fn(npts, |i| {
        let x = i as f64 * step / half;
        amplitude * (PI * x).cos()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn cosine_lut_spans_a_full_period() {
        let lut = cosine_lut(8, 0.5).unwrap();
        assert_eq!(lut.len(), 8);
        assert_relative_eq!(lut[0], 0.5, epsilon = 1e-15);
        // x_7 = 7 · 8/7 / 4 = 2
        assert_relative_eq!(lut[7], 0.5, epsilon = 1e-12);
        let x1 = 8.0 / 7.0 / 4.0;
        assert_relative_eq!(lut[1], 0.5 * (PI * x1).cos(), epsilon = 1e-15);
    }

    #[test]
    fn cosine_lut_rejects_odd_sizes() {
        assert!(cosine_lut(1, 1.0).is_err());
        assert!(cosine_lut(12, 1.0).is_err());
        assert_eq!(cosine_lut(2, 1.0).unwrap().len(), 2);
    }

    #[test]
    fn readout_weights_follow_seed() {
        let mut a = StdRng::seed_from_u64(41);
        let mut b = StdRng::seed_from_u64(41);
        let alpha = readout_weights(64, &mut a);
        assert_eq!(alpha.len(), 64);
        assert_eq!(alpha, readout_weights(64, &mut b));
    }
}
