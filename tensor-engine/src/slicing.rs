//! Slice requests in Python notation and their resolved, per-axis form.
//!
//! A [`SliceIndex`] is what the caller asked for, independent of any shape. Resolving it against
//! an axis length with [`SliceIndex::to_slice_def`] gives a [`SliceDef`]: a start, a signed step
//! and a count. Out-of-range bounds are clamped, never rejected; only plain indices fail when they
//! fall outside the axis.

use crate::{Result, TensorError};
use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull, RangeInclusive, RangeTo, RangeToInclusive};
use std::str::FromStr;

/// Represents different types of slice indices for tensor slicing operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceIndex {
    /// Single index that removes a dimension
    Index(isize),
    /// Range with optional start, stop, and step
    Range {
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    },
    /// Selects every axis that is not mentioned explicitly
    Ellipsis,
    /// Inserts a unit axis
    NewAxis,
}

impl SliceIndex {
    /// Selects the whole axis.
    pub fn all() -> Self {
        Self::range(None, None)
    }

    /// Selects nothing (`0:0`).
    pub fn none() -> Self {
        Self::range(Some(0), Some(0))
    }

    pub fn index(index: isize) -> Self {
        Self::Index(index)
    }

    /// Create a new range slice with default step of 1
    pub fn range(start: Option<isize>, stop: Option<isize>) -> Self {
        Self::Range { start, stop, step: 1 }
    }

    /// Create a new range slice with custom step. A zero step selects nothing.
    pub fn range_with_step(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        Self::Range { start, stop, step }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    pub fn is_ellipsis(&self) -> bool {
        matches!(self, Self::Ellipsis)
    }

    pub fn is_new_axis(&self) -> bool {
        matches!(self, Self::NewAxis)
    }

    /// Resolves the request against an axis of length `dim`.
    ///
    /// Negative values count from the end of the axis. Range bounds are clamped into the axis,
    /// an index outside it is an error. Ellipsis and new axis markers have no per-axis meaning
    /// and must be expanded before resolution.
    pub fn to_slice_def(&self, dim: usize) -> Result<SliceDef> {
        let dim = dim as isize;
        match *self {
            SliceIndex::Index(index) => {
                let resolved = if index < 0 { dim + index } else { index };
                if resolved < 0 || resolved >= dim {
                    return Err(TensorError::IndexOutOfBounds {
                        index,
                        axis: 0,
                        size: dim as usize,
                    });
                }
                Ok(SliceDef::index(resolved as usize))
            }
            SliceIndex::Range { step: 0, .. } => Ok(SliceDef::empty()),
            SliceIndex::Range { start, stop, step } if step > 0 => {
                let wrap = |value: isize| if value < 0 { (dim + value).max(0) } else { value };
                let start = start.map_or(0, wrap);
                let stop = stop.map_or(dim, wrap).min(dim);
                if start >= dim || start >= stop {
                    return Ok(SliceDef::empty());
                }
                Ok(SliceDef::new(start as usize, step, count_of(start, stop, step)))
            }
            SliceIndex::Range { start, stop, step } => {
                let start = match start {
                    None => dim - 1,
                    Some(value) if value < 0 => (dim + value).max(0),
                    Some(value) => value,
                }
                .min(dim - 1);
                // -1 is "before the first element", not the last one
                let stop = match stop {
                    None => -1,
                    Some(value) if value < 0 => (dim + value).max(-1),
                    Some(value) => value,
                };
                if start <= stop {
                    return Ok(SliceDef::empty());
                }
                Ok(SliceDef::new(start as usize, step, count_of(start, stop, step)))
            }
            SliceIndex::Ellipsis | SliceIndex::NewAxis => Err(TensorError::SliceParse(format!(
                "'{self}' cannot be resolved against a single axis"
            ))),
        }
    }
}

fn count_of(start: isize, stop: isize, step: isize) -> usize {
    let astep = step.unsigned_abs();
    (start.abs_diff(stop) + astep - 1) / astep
}

/// Parses comma separated slice notation such as `"..., 2"` or `"1:3, ::-1"`.
pub fn parse_slices(notation: &str) -> Result<Vec<SliceIndex>> {
    notation
        .split(',')
        .filter(|token| !token.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// Formats slices back into comma separated notation.
pub fn format_slices(slices: &[SliceIndex]) -> String {
    slices
        .iter()
        .map(|slice| slice.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Replaces the ellipsis with as many full-axis selections as needed to address `rank` axes and
/// pads missing trailing axes the same way.
pub fn expand_ellipsis(slices: &[SliceIndex], rank: usize) -> Result<Vec<SliceIndex>> {
    let ellipses = slices.iter().filter(|s| s.is_ellipsis()).count();
    if ellipses > 1 {
        return Err(TensorError::SliceParse(format!(
            "an index can only have a single ellipsis, got '{}'",
            format_slices(slices)
        )));
    }

    let explicit = slices
        .iter()
        .filter(|s| !s.is_ellipsis() && !s.is_new_axis())
        .count();
    if explicit > rank {
        return Err(TensorError::ShapeMismatch(format!(
            "too many indices for a tensor of rank {rank}: '{}'",
            format_slices(slices)
        )));
    }

    let fill = rank - explicit;
    let mut expanded = Vec::with_capacity(slices.len() + fill);
    for slice in slices {
        if slice.is_ellipsis() {
            expanded.extend(std::iter::repeat_n(SliceIndex::all(), fill));
        } else {
            expanded.push(*slice);
        }
    }
    if ellipses == 0 {
        expanded.extend(std::iter::repeat_n(SliceIndex::all(), fill));
    }
    Ok(expanded)
}

fn parse_signed(text: &str) -> Result<isize> {
    let invalid = || TensorError::SliceParse(format!("invalid number '{text}'"));
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, trimmed[1..].trim_start()),
        Some(b'+') => (false, trimmed[1..].trim_start()),
        _ => (false, trimmed),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let magnitude: isize = digits.parse().map_err(|_| invalid())?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn parse_bound(text: &str) -> Result<Option<isize>> {
    if text.trim().is_empty() {
        Ok(None)
    } else {
        parse_signed(text).map(Some)
    }
}

impl FromStr for SliceIndex {
    type Err = TensorError;

    fn from_str(token: &str) -> Result<Self> {
        let token = token.trim();
        match token {
            "" => Err(TensorError::SliceParse(
                "slice notation expected, got an empty string".to_string(),
            )),
            "..." => Ok(SliceIndex::Ellipsis),
            "newaxis" | "np.newaxis" => Ok(SliceIndex::NewAxis),
            _ if token.contains(':') => {
                let parts: Vec<&str> = token.split(':').collect();
                if parts.len() > 3 {
                    return Err(TensorError::SliceParse(format!(
                        "invalid slice notation '{token}'"
                    )));
                }
                let start = parse_bound(parts[0])?;
                let stop = parse_bound(parts[1])?;
                let step = match parts.get(2) {
                    Some(step) => parse_bound(step)?.unwrap_or(1),
                    None => 1,
                };
                Ok(SliceIndex::Range { start, stop, step })
            }
            _ => parse_signed(token)
                .map(SliceIndex::Index)
                .map_err(|_| TensorError::SliceParse(format!("invalid slice notation '{token}'"))),
        }
    }
}

impl fmt::Display for SliceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SliceIndex::Index(index) => write!(f, "{index}"),
            SliceIndex::NewAxis => f.write_str("np.newaxis"),
            SliceIndex::Ellipsis => f.write_str("..."),
            SliceIndex::Range { start, stop, step } => {
                if let Some(start) = start.filter(|&s| s != 0) {
                    write!(f, "{start}")?;
                }
                f.write_str(":")?;
                if let Some(stop) = stop {
                    write!(f, "{stop}")?;
                }
                if *step != 1 {
                    write!(f, ":{step}")?;
                }
                Ok(())
            }
        }
    }
}

macro_rules! impl_slice_index_from {
    ($($numeric_type:ty),+) => {
        $(
            impl From<$numeric_type> for SliceIndex {
                fn from(idx: $numeric_type) -> Self {
                    SliceIndex::Index(idx as isize)
                }
            }

            impl From<Range<$numeric_type>> for SliceIndex {
                fn from(range: Range<$numeric_type>) -> Self {
                    SliceIndex::range(Some(range.start as isize), Some(range.end as isize))
                }
            }

            impl From<RangeFrom<$numeric_type>> for SliceIndex {
                fn from(range: RangeFrom<$numeric_type>) -> Self {
                    SliceIndex::range(Some(range.start as isize), None)
                }
            }

            impl From<RangeTo<$numeric_type>> for SliceIndex {
                fn from(range: RangeTo<$numeric_type>) -> Self {
                    SliceIndex::range(None, Some(range.end as isize))
                }
            }

            impl From<RangeToInclusive<$numeric_type>> for SliceIndex {
                fn from(range: RangeToInclusive<$numeric_type>) -> Self {
                    SliceIndex::range(None, Some(range.end as isize + 1))
                }
            }

            impl From<RangeInclusive<$numeric_type>> for SliceIndex {
                fn from(range: RangeInclusive<$numeric_type>) -> Self {
                    SliceIndex::range(Some(*range.start() as isize), Some(*range.end() as isize + 1))
                }
            }
        )+
    };
}

impl_slice_index_from!(usize, isize, i32, i64, u32, u64);

impl From<RangeFull> for SliceIndex {
    fn from(_: RangeFull) -> Self {
        SliceIndex::all()
    }
}

/// Macro for creating slice indices
#[macro_export]
macro_rules! s {
    () => {
        &[] as &[$crate::SliceIndex]
    };
    ($($slice:expr),* $(,)?) => {
        &[$($crate::SliceIndex::from($slice)),*]
    };
}

/// Macro for creating stepped slices
#[macro_export]
macro_rules! step {
    ($range:expr, $step:expr) => {{
        match $crate::SliceIndex::from($range) {
            $crate::SliceIndex::Range { start, stop, .. } => {
                $crate::SliceIndex::range_with_step(start, stop, $step)
            }
            _ => panic!("step! can only be used with range expressions"),
        }
    }};
}

/// A slice resolved against one axis: `count` cells starting at `start`, `step` apart.
///
/// An index selection keeps `count == 1` and is flagged so that the axis is dropped from the
/// rank of the resulting view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SliceDef {
    pub start: usize,
    pub step: isize,
    pub count: usize,
    pub is_index: bool,
}

impl SliceDef {
    pub fn new(start: usize, step: isize, count: usize) -> Self {
        Self {
            start,
            step,
            count,
            is_index: false,
        }
    }

    pub fn index(index: usize) -> Self {
        Self {
            start: index,
            step: 1,
            count: 1,
            is_index: true,
        }
    }

    /// Selects a whole axis of length `dim`.
    pub fn all(dim: usize) -> Self {
        Self::new(0, 1, dim)
    }

    pub fn empty() -> Self {
        Self::new(0, 0, 0)
    }

    /// Position on the parent axis of the `i`-th selected cell.
    pub fn position(&self, i: usize) -> usize {
        (self.start as isize + i as isize * self.step) as usize
    }

    /// Composes `other`, resolved against the axis this slice produces, with this slice.
    pub fn merge(&self, other: &SliceDef) -> SliceDef {
        debug_assert!(!self.is_index, "an index selection has no axis to slice further");
        if other.count == 0 {
            return SliceDef::empty();
        }
        let start = self.position(other.start);
        if other.is_index {
            return SliceDef::index(start);
        }
        SliceDef::new(start, self.step * other.step, other.count)
    }

    /// The same cells walked in the opposite direction.
    pub fn invert(&self) -> SliceDef {
        if self.is_index || self.count == 0 {
            return *self;
        }
        SliceDef::new(self.position(self.count - 1), -self.step, self.count)
    }
}

impl fmt::Display for SliceDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_index {
            write!(f, "[{}]", self.start)
        } else if self.count == 0 {
            f.write_str("()")
        } else {
            write!(f, "({}>>{}*{})", self.start, self.step, self.count)
        }
    }
}

/// Maps coordinates of a parent tensor into the coordinate system of a view sliced by `slices`.
///
/// Axes selected by an index are dropped. Returns `None` when the parent coordinate is not part
/// of the selection.
pub fn replay_slicing_on_coords(parent_coords: &[usize], slices: &[SliceDef]) -> Option<Vec<usize>> {
    let mut coords = Vec::with_capacity(parent_coords.len());
    for (&coord, slice) in parent_coords.iter().zip(slices) {
        if slice.is_index {
            if coord != slice.start {
                return None;
            }
            continue;
        }
        if slice.count == 0 {
            return None;
        }
        let distance = coord as isize - slice.start as isize;
        if distance % slice.step != 0 {
            return None;
        }
        let position = distance / slice.step;
        if position < 0 || position as usize >= slice.count {
            return None;
        }
        coords.push(position as usize);
    }
    Some(coords)
}
