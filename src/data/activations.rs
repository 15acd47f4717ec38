//! Hidden-state activation tables and their thresholded form.

use crate::error::ShapeError;

/// Per-unit activations over the context window of one query.
///
/// Rows are hidden units, columns are timesteps (offsets inside the requested
/// left/right context).  Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivationMatrix {
    rows: Vec<Vec<f64>>,
    timesteps: usize,
}

impl ActivationMatrix {
    /// Build from unit rows.  All rows must share one length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ShapeError> {
        let timesteps = rows.first().map_or(0, Vec::len);
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != timesteps) {
            return Err(ShapeError {
                row,
                len: r.len(),
                expected: timesteps,
            });
        }
        Ok(Self { rows, timesteps })
    }

    /// Build from a timestep-major table (one row per timestep).
    pub fn from_timestep_rows(table: &[Vec<f64>]) -> Result<Self, ShapeError> {
        let units = table.first().map_or(0, Vec::len);
        if let Some((row, r)) = table.iter().enumerate().find(|(_, r)| r.len() != units) {
            return Err(ShapeError {
                row,
                len: r.len(),
                expected: units,
            });
        }
        let rows = (0..units)
            .map(|u| table.iter().map(|step| step[u]).collect())
            .collect();
        Ok(Self {
            rows,
            timesteps: table.len(),
        })
    }

    pub fn units(&self) -> usize {
        self.rows.len()
    }

    pub fn timesteps(&self) -> usize {
        self.timesteps
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.timesteps == 0
    }

    pub fn row(&self, unit: usize) -> Option<&[f64]> {
        self.rows.get(unit).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn value(&self, unit: usize, t: usize) -> Option<f64> {
        self.rows.get(unit).and_then(|r| r.get(t)).copied()
    }

    /// Smallest and largest value, `None` when empty.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.rows
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Threshold every value: `value >= threshold` becomes 1, everything else 0.
    pub fn discretize(&self, threshold: f64) -> BitMatrix {
        let bits = self
            .rows
            .iter()
            .flat_map(|r| r.iter().map(move |&v| u8::from(v >= threshold)))
            .collect();
        BitMatrix {
            units: self.units(),
            timesteps: self.timesteps,
            bits,
        }
    }
}

/// Thresholded activations, one `0`/`1` per unit and timestep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitMatrix {
    units: usize,
    timesteps: usize,
    bits: Vec<u8>,
}

impl BitMatrix {
    pub fn units(&self) -> usize {
        self.units
    }

    pub fn timesteps(&self) -> usize {
        self.timesteps
    }

    pub fn row(&self, unit: usize) -> &[u8] {
        if unit >= self.units {
            return &[];
        }
        &self.bits[unit * self.timesteps..(unit + 1) * self.timesteps]
    }

    /// Bit at `(unit, t)`; positions outside the table read as 0.
    pub fn bit(&self, unit: usize, t: i64) -> u8 {
        if t < 0 {
            return 0;
        }
        self.row(unit).get(t as usize).copied().unwrap_or(0)
    }

    /// Bits of `unit` over the half-open window `[start, end)`.
    pub fn window(&self, unit: usize, start: i64, end: i64) -> Vec<u8> {
        (start..end).map(|t| self.bit(unit, t)).collect()
    }

    /// Units whose bit is set at timestep `t`.
    pub fn active_units(&self, t: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.units).filter(move |&u| self.bit(u, t as i64) == 1)
    }

    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b == 1).count()
    }
}
