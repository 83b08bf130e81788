// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Delimited text layout of a floating-point table, one matrix row per line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableFormat {
    /// Decimals after the point.
    pub precision: usize,
    /// Minimum field width; fields are right-aligned.
    pub width: usize,
    pub delimiter: char,
}

impl Default for TableFormat {
    fn default() -> Self {
        Self::fixed(10, 12)
    }
}

impl TableFormat {
    /// Right-aligned fixed-precision fields, comma separated.
    pub const fn fixed(width: usize, precision: usize) -> Self {
        Self {
            precision,
            width,
            delimiter: ',',
        }
    }

    /// Whole numbers with no padding, for sign and Hadamard matrices.
    pub const fn integer() -> Self {
        Self::fixed(0, 0)
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn format_field(&self, value: f64) -> String {
        format!("{:>width$.prec$}", value, width = self.width, prec = self.precision)
    }

    pub fn render(&self, values: ArrayView2<'_, f64>) -> String {
        let mut out = String::new();
        let mut buf = [0u8; 4];
        let sep: &str = self.delimiter.encode_utf8(&mut buf);
        for row in values.rows() {
            let fields: Vec<String> = row.iter().map(|&v| self.format_field(v)).collect();
            out.push_str(&fields.join(sep));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn fields_are_right_aligned() {
        let fmt = TableFormat::fixed(10, 5);
        assert_eq!(fmt.format_field(1.5), "   1.50000");
        assert_eq!(fmt.format_field(-0.25), "  -0.25000");
        assert_eq!(TableFormat::integer().format_field(-3.0), "-3");
    }

    #[test]
    fn renders_rows_with_delimiter() {
        let m = array![[1.0, -1.0], [0.0, 2.0]];
        assert_eq!(TableFormat::integer().render(m.view()), "1,-1\n0,2\n");
        assert_eq!(
            TableFormat::fixed(0, 1).with_delimiter(';').render(m.view()),
            "1.0;-1.0\n0.0;2.0\n"
        );
    }

    #[test]
    fn empty_table_renders_nothing() {
        let m = ndarray::Array2::<f64>::zeros((0, 3));
        assert_eq!(TableFormat::default().render(m.view()), "");
    }
}
