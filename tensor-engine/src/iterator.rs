use crate::layout::Dims;
use crate::view::ViewLayout;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cursor {
    Start,
    Running,
    Done,
}

/// Walks every coordinate vector of a shape in row-major order, like an odometer.
///
/// A rank zero shape yields one empty coordinate, a shape with a zero dimension yields nothing.
/// The iterator can be rewound with [`DimensionsIterator::reset`].
#[derive(Clone, Debug)]
pub struct DimensionsIterator {
    dims: Dims,
    coords: Dims,
    cursor: Cursor,
}

impl DimensionsIterator {
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: dims.iter().copied().collect(),
            coords: SmallVec::from_elem(0, dims.len()),
            cursor: Cursor::Start,
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Rewinds to the first coordinate.
    pub fn reset(&mut self) {
        self.coords.fill(0);
        self.cursor = Cursor::Start;
    }

    /// Moves to the next coordinate and borrows it, without allocating.
    pub fn advance(&mut self) -> Option<&[usize]> {
        match self.cursor {
            Cursor::Start => {
                if self.dims.contains(&0) {
                    self.cursor = Cursor::Done;
                    return None;
                }
                self.cursor = Cursor::Running;
            }
            Cursor::Running => {
                let mut axis = self.dims.len();
                loop {
                    if axis == 0 {
                        self.cursor = Cursor::Done;
                        return None;
                    }
                    axis -= 1;
                    self.coords[axis] += 1;
                    if self.coords[axis] < self.dims[axis] {
                        break;
                    }
                    self.coords[axis] = 0;
                }
            }
            Cursor::Done => return None,
        }
        Some(self.coords.as_slice())
    }
}

impl Iterator for DimensionsIterator {
    type Item = Dims;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().map(SmallVec::from_slice)
    }
}

/// Buffer offsets of every element of a layout, in row-major order of the coordinates.
///
/// Offsets are updated incrementally from the strides, never recomputed from the coordinates.
#[derive(Clone, Debug)]
pub struct Offsets<'a> {
    layout: &'a ViewLayout,
    coords: Dims,
    offset: isize,
    remaining: usize,
}

impl<'a> Offsets<'a> {
    pub fn new(layout: &'a ViewLayout) -> Self {
        Self {
            layout,
            coords: SmallVec::from_elem(0, layout.rank()),
            offset: layout.offset() as isize,
            remaining: layout.len(),
        }
    }
}

impl Iterator for Offsets<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.offset as usize;
        self.remaining -= 1;
        if self.remaining > 0 {
            let dims = self.layout.dims();
            let strides = self.layout.strides();
            for axis in (0..dims.len()).rev() {
                self.coords[axis] += 1;
                self.offset += strides[axis];
                if self.coords[axis] < dims[axis] {
                    break;
                }
                self.offset -= strides[axis] * dims[axis] as isize;
                self.coords[axis] = 0;
            }
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Offsets<'_> {}

/// An iterator over all elements of a tensor.
#[derive(Clone, Debug)]
pub struct Elements<'a, T> {
    buffer: &'a [T],
    offsets: Offsets<'a>,
}

impl<'a, T> Elements<'a, T> {
    pub fn new(buffer: &'a [T], layout: &'a ViewLayout) -> Self {
        Self {
            buffer,
            offsets: Offsets::new(layout),
        }
    }
}

impl<'a, T> Iterator for Elements<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let buffer = self.buffer;
        self.offsets.next().map(|offset| &buffer[offset])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.offsets.size_hint()
    }
}

impl<T> ExactSizeIterator for Elements<'_, T> {}
