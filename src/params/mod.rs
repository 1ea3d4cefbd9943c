//! Parameter-space generation
//!
//! Spreads test points across a size range by repeatedly bisecting it.
//! Subdivision stops once the left half of a sub-range is within the
//! granularity. Only the left half is tested, so a final right half can
//! be one unit wider than the granularity allows whenever truncating
//! division splits a range unevenly. Callers relying on a symmetric bound
//! must check it themselves.

use crate::{IoBenchError, Result, DEFAULT_MAX_BREAKPOINTS};

/// Inclusive range to subdivide and the largest acceptable left half-width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    min: i64,
    max: i64,
    granularity: i64,
}

impl RangeSpec {
    pub fn new(min: i64, max: i64, granularity: i64) -> Result<Self> {
        if min >= max {
            return Err(IoBenchError::InvalidArgument(format!(
                "Range minimum {} must be below maximum {}",
                min, max
            )));
        }
        if granularity <= 0 {
            return Err(IoBenchError::InvalidArgument(format!(
                "Granularity must be greater than 0, got {}",
                granularity
            )));
        }
        Ok(Self {
            min,
            max,
            granularity,
        })
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn granularity(&self) -> i64 {
        self.granularity
    }
}

/// `(lo + hi) / 2`, truncated toward zero
pub fn midpoint(lo: i64, hi: i64) -> i64 {
    // The sum of two i64 always fits in i128 and the quotient lies in [lo, hi]
    ((lo as i128 + hi as i128) / 2) as i64
}

/// Unsorted breakpoints with an upper bound on their number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointSet {
    points: Vec<i64>,
    limit: usize,
}

impl BreakpointSet {
    /// Set holding `range`'s bounds, limited to [`DEFAULT_MAX_BREAKPOINTS`]
    pub fn seeded(range: &RangeSpec) -> Self {
        Self {
            points: vec![range.min, range.max],
            limit: DEFAULT_MAX_BREAKPOINTS,
        }
    }

    /// Set holding `range`'s bounds that refuses to grow beyond `limit`
    pub fn with_limit(range: &RangeSpec, limit: usize) -> Result<Self> {
        if limit < 2 {
            return Err(IoBenchError::InvalidArgument(format!(
                "Breakpoint limit must be at least 2, got {}",
                limit
            )));
        }
        Ok(Self {
            points: vec![range.min, range.max],
            limit,
        })
    }

    pub fn push(&mut self, point: i64) -> Result<()> {
        if self.points.len() >= self.limit {
            return Err(IoBenchError::CapacityExceeded { limit: self.limit });
        }
        self.points.push(point);
        Ok(())
    }

    /// Points in insertion order
    pub fn as_slice(&self) -> &[i64] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Points in ascending order; duplicates are kept
    pub fn into_sorted(self) -> Vec<i64> {
        let mut points = self.points;
        points.sort_unstable();
        points
    }
}

/// Append the midpoints subdividing `range` to `out`.
///
/// Midpoints are emitted in pre-order: a range's midpoint, then everything
/// from its left half, then everything from its right half. On
/// `CapacityExceeded` the points appended so far stay in `out`.
pub fn generate(range: &RangeSpec, out: &mut BreakpointSet) -> Result<()> {
    let granularity = range.granularity as i128;
    let mut pending = vec![(range.min, range.max)];

    while let Some((lo, hi)) = pending.pop() {
        let mid = midpoint(lo, hi);
        if mid as i128 - lo as i128 > granularity {
            out.push(mid)?;
            // right first so the left half is popped next
            pending.push((mid, hi));
            pending.push((lo, mid));
        }
    }

    log::debug!(
        "[{}, {}] at granularity {}: {} breakpoints",
        range.min,
        range.max,
        range.granularity,
        out.len()
    );
    Ok(())
}

/// Seed, generate and sort breakpoints for `range`
pub fn sorted_breakpoints(range: &RangeSpec, limit: usize) -> Result<Vec<i64>> {
    let mut set = BreakpointSet::with_limit(range, limit)?;
    generate(range, &mut set)?;
    Ok(set.into_sorted())
}
