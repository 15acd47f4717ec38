//! Brush signature matching over thresholded activations.
//!
//! A brushed half-open range `[start, end)` plus zero padding `[left, right]`
//! defines a window `[start - left, end + right)` and an expected bit pattern
//! (the *signature*): 1 inside the brush, 0 in the padding.  A unit is
//! selected when its thresholded bits over the window equal the signature.
//!
//! Positions outside the matrix read as 0, so the window is clipped to the
//! matrix columns before matching.  A brush reaching outside the matrix can
//! never match and selects nothing.
//!
//! Everything here is recomputed from scratch whenever the threshold, brush or
//! padding change.

use std::collections::BTreeSet;

use crate::data::activations::{ActivationMatrix, BitMatrix};

/// Number of run segments kept for the preview by default.
pub const DEFAULT_SEGMENT_LIMIT: usize = 20;

/// Expected bit pattern for a brush of `brush_width` words with `zero_pad`
/// words of forced zeros on each side.
pub fn signature(brush_width: usize, zero_pad: [usize; 2]) -> Vec<u8> {
    let [left, right] = zero_pad;
    let mut sig = Vec::with_capacity(left + brush_width + right);
    sig.resize(left, 0);
    sig.resize(left + brush_width, 1);
    sig.resize(left + brush_width + right, 0);
    sig
}

/// Inputs of one selection pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionParams {
    pub threshold: f64,
    /// Half-open word range; `None` when nothing is brushed.
    pub brush: Option<[i64; 2]>,
    pub zero_pad: [usize; 2],
}

impl SelectionParams {
    pub fn brush_width(&self) -> usize {
        match self.brush {
            Some([start, end]) if end > start => {
                usize::try_from(end.abs_diff(start)).unwrap_or(usize::MAX)
            }
            _ => 0,
        }
    }

    /// Window `[start - left, end + right)` the signature is compared over.
    pub fn window(&self) -> Option<[i64; 2]> {
        let [start, end] = self.brush?;
        let [left, right] = self.zero_pad;
        Some([
            start.saturating_sub(to_i64(left)),
            end.max(start).saturating_add(to_i64(right)),
        ])
    }

    /// `window()` clipped to the columns `[0, timesteps)`.
    pub fn clipped_window(&self, timesteps: usize) -> Option<[i64; 2]> {
        let [lo, hi] = self.window()?;
        let t = to_i64(timesteps);
        let lo = lo.clamp(0, t);
        Some([lo, hi.clamp(lo, t)])
    }

    /// Whether the brush is non-empty and lies within `[0, timesteps)`.
    pub fn brush_inside(&self, timesteps: usize) -> bool {
        matches!(self.brush, Some([start, end]) if start >= 0 && end > start && end <= to_i64(timesteps))
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Signature of `brush` restricted to the columns `[lo, hi)`.
fn signature_over([start, end]: [i64; 2], lo: i64, hi: i64) -> Vec<u8> {
    (lo..hi).map(|t| u8::from(t >= start && t < end)).collect()
}

/// Half-open run of consecutive 1-bits of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSegment {
    pub start: usize,
    pub end: usize,
}

impl RunSegment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, t: i64) -> bool {
        t >= self.start as i64 && t < self.end as i64
    }
}

/// Run segments of one unit plus the run containing the brush start, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSegments {
    pub unit: usize,
    pub runs: Vec<RunSegment>,
    pub anchor: Option<RunSegment>,
}

/// Maximal runs of 1-bits in `bits`.
pub fn runs(bits: &[u8]) -> Vec<RunSegment> {
    let mut out = Vec::new();
    let mut open: Option<usize> = None;
    for (t, &b) in bits.iter().enumerate() {
        match (b == 1, open) {
            (true, None) => open = Some(t),
            (false, Some(start)) => {
                out.push(RunSegment { start, end: t });
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        out.push(RunSegment {
            start,
            end: bits.len(),
        });
    }
    out
}

/// Result of one selection pass over an activation matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    bits: BitMatrix,
    window: Option<[i64; 2]>,
    brush_start: Option<i64>,
    signature: Vec<u8>,
    cells: Vec<usize>,
}

impl Selection {
    /// Discretize `matrix` and match every unit against the brush signature.
    pub fn compute(matrix: &ActivationMatrix, params: &SelectionParams) -> Self {
        let bits = matrix.discretize(params.threshold);
        let window = params.clipped_window(bits.timesteps());
        let signature = clipped_signature(params, window);

        let cells = match window {
            Some([lo, hi]) if params.brush_inside(bits.timesteps()) => (0..bits.units())
                .filter(|&u| bits.window(u, lo, hi) == signature)
                .collect(),
            _ => Vec::new(),
        };

        Self {
            bits,
            window,
            brush_start: params.brush.map(|[s, _]| s),
            signature,
            cells,
        }
    }

    /// Discretize `matrix` but keep a previously chosen unit list instead of
    /// matching.  Units outside the matrix are dropped.
    pub fn preserved(matrix: &ActivationMatrix, params: &SelectionParams, cells: &[usize]) -> Self {
        let bits = matrix.discretize(params.threshold);
        let mut cells: Vec<usize> = cells.iter().copied().filter(|&c| c < bits.units()).collect();
        cells.sort_unstable();
        cells.dedup();
        let window = params.clipped_window(bits.timesteps());
        Self {
            bits,
            window,
            brush_start: params.brush.map(|[s, _]| s),
            signature: clipped_signature(params, window),
            cells,
        }
    }

    pub fn bits(&self) -> &BitMatrix {
        &self.bits
    }

    /// Units matching the signature, ascending.
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Expected bits over `window()`.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Compared window, clipped to the matrix.
    pub fn window(&self) -> Option<[i64; 2]> {
        self.window
    }

    /// Selected units that are not in `excluded`.
    pub fn effective_cells(&self, excluded: &[usize]) -> Vec<usize> {
        let excluded: BTreeSet<usize> = excluded.iter().copied().collect();
        self.cells
            .iter()
            .copied()
            .filter(|c| !excluded.contains(c))
            .collect()
    }

    /// Per timestep, how many effective units are active.
    pub fn sum_vector(&self, excluded: &[usize]) -> Vec<u32> {
        sum_vector(&self.bits, &self.effective_cells(excluded))
    }

    /// Per timestep, intersection over union of the active units and the
    /// effective selection.
    pub fn iou_preview(&self, excluded: &[usize]) -> Vec<f64> {
        iou_preview(&self.bits, &self.effective_cells(excluded))
    }

    /// Run segments of the effective units, ordered by the run that contains
    /// the brush start and truncated to `limit`.
    pub fn segments(&self, excluded: &[usize], limit: usize) -> Vec<UnitSegments> {
        let anchor = self.brush_start.unwrap_or(-1);
        ranked_segments(&self.bits, &self.effective_cells(excluded), anchor, limit)
    }
}

fn clipped_signature(params: &SelectionParams, window: Option<[i64; 2]>) -> Vec<u8> {
    match (params.brush, window) {
        (Some(brush), Some([lo, hi])) => signature_over(brush, lo, hi),
        _ => Vec::new(),
    }
}

/// Per timestep, number of `cells` whose bit is set.
pub fn sum_vector(bits: &BitMatrix, cells: &[usize]) -> Vec<u32> {
    let mut sums = vec![0u32; bits.timesteps()];
    for &c in cells {
        for (s, &b) in sums.iter_mut().zip(bits.row(c)) {
            *s += u32::from(b);
        }
    }
    sums
}

/// `|active(t) ∩ cells| / |active(t) ∪ cells|` per timestep, 0 when both are empty.
pub fn iou_preview(bits: &BitMatrix, cells: &[usize]) -> Vec<f64> {
    let selected: BTreeSet<usize> = cells.iter().copied().collect();
    (0..bits.timesteps())
        .map(|t| {
            let active: BTreeSet<usize> = bits.active_units(t).collect();
            let inter = active.intersection(&selected).count();
            let union = active.len() + selected.len() - inter;
            if union == 0 {
                0.0
            } else {
                inter as f64 / union as f64
            }
        })
        .collect()
}

/// Runs of every unit in `cells`, sorted by the run containing `anchor`
/// (start ascending, then end descending).  Units without such a run go last.
pub fn ranked_segments(
    bits: &BitMatrix,
    cells: &[usize],
    anchor: i64,
    limit: usize,
) -> Vec<UnitSegments> {
    let mut out: Vec<UnitSegments> = cells
        .iter()
        .map(|&unit| {
            let runs = runs(bits.row(unit));
            let anchor = runs.iter().copied().find(|r| r.contains(anchor));
            UnitSegments { unit, runs, anchor }
        })
        .collect();

    out.sort_by(|a, b| match (a.anchor, b.anchor) {
        (Some(x), Some(y)) => x.start.cmp(&y.start).then(y.end.cmp(&x.end)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    out.truncate(limit);
    out
}
