// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ff_core::{Dimensions, Tradeoff};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ExportResult;
use crate::fixed::FixedPointFormat;
use crate::params::ParameterSet;

pub const MANIFEST_FILE: &str = "manifest.json";
const LUT_NAME: &str = "COS_LUT";

/// Description of one export directory, written next to the tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub dims: Dimensions,
    pub sigma: f64,
    pub mode: u8,
    pub tradeoff: Tradeoff,
    pub coeff: f64,
    pub hardware_scaling: bool,
    /// Present when fixed-point records were written.
    pub fixed_point: Option<FixedPointFormat>,
    /// File names relative to the export directory, in write order.
    pub files: Vec<String>,
}

impl Manifest {
    pub fn load(path: impl AsRef<Path>) -> ExportResult<Self> {
        let reader = std::io::BufReader::new(File::open(path.as_ref())?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Writes a [`ParameterSet`] as `NAME.txt` fixed-point records and/or
/// `NAME.csv` tables, then `manifest.json`.
#[derive(Clone, Debug)]
pub struct ParameterWriter {
    dir: PathBuf,
    records: Option<FixedPointFormat>,
    tables: bool,
}

impl ParameterWriter {
    /// Writes both records (default fixed-point format) and tables.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            records: Some(FixedPointFormat::default()),
            tables: true,
        }
    }

    pub fn with_records(mut self, format: Option<FixedPointFormat>) -> Self {
        self.records = format;
        self
    }

    pub fn with_tables(mut self, tables: bool) -> Self {
        self.tables = tables;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, set: &ParameterSet) -> ExportResult<Manifest> {
        if let Some(format) = &self.records {
            format.validate()?;
        }
        fs::create_dir_all(&self.dir)?;
        let mut files = Vec::new();

        for param in &set.parameters {
            if let Some(format) = &self.records {
                let text = format.matrix_records(param.name, param.values.view())?;
                files.push(self.write_file(&format!("{}.txt", param.name), &text)?);
            }
            if self.tables {
                let text = param.table.render(param.values.view());
                files.push(self.write_file(&format!("{}.csv", param.name), &text)?);
            }
        }
        if let (Some(lut), Some(format)) = (&set.cosine_lut, &self.records) {
            let text = format.vector_records(LUT_NAME, lut.view())?;
            files.push(self.write_file(&format!("{LUT_NAME}.txt"), &text)?);
        }

        let manifest = Manifest {
            dims: set.dims,
            sigma: set.sigma,
            mode: set.mode_tag,
            tradeoff: set.tradeoff,
            coeff: set.coeff,
            hardware_scaling: set.hardware_scaling,
            fixed_point: self.records.clone(),
            files,
        };
        let writer = BufWriter::new(File::create(self.dir.join(MANIFEST_FILE))?);
        serde_json::to_writer_pretty(writer, &manifest)?;
        info!(
            target: "fastfood::export",
            dir = %self.dir.display(),
            files = manifest.files.len(),
            "parameters exported"
        );
        Ok(manifest)
    }

    fn write_file(&self, name: &str, contents: &str) -> ExportResult<String> {
        let path = self.dir.join(name);
        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
        debug!(target: "fastfood::export", path = %path.display(), bytes = contents.len(), "wrote");
        Ok(name.to_string())
    }
}
