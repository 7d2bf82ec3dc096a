//! Backing buffers of view tensors: a shared or a unique borrow of a dense tensor's elements.

use crate::Element;

/// Read access to the elements a view aliases.
pub trait Storage {
    type Elem: Element;

    fn as_slice(&self) -> &[Self::Elem];
}

/// Write access to the elements a view aliases.
pub trait StorageMut: Storage {
    fn as_mut_slice(&mut self) -> &mut [Self::Elem];
}

impl<T: Element> Storage for &[T] {
    type Elem = T;

    fn as_slice(&self) -> &[T] {
        self
    }
}

impl<T: Element> Storage for &mut [T] {
    type Elem = T;

    fn as_slice(&self) -> &[T] {
        self
    }
}

impl<T: Element> StorageMut for &mut [T] {
    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }
}
