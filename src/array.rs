use crate::{
    atomic::{Cell, Element, Node},
    cas2,
    error::IndexError,
};
use crossbeam_epoch::{self as epoch, Owned};
use std::{fmt, iter::FromIterator};

/// Fixed-size array of atomic cells.
///
/// Every operation is lock-free and linearizable. Indices outside `0..len()`
/// panic; the `try_*` variants report them as [`IndexError`] instead.
pub struct AtomicArray<T: Element> {
    cells: Box<[Cell<T>]>,
}

impl<T: Element> AtomicArray<T> {
    pub fn new(len: usize, initial: T) -> Self {
        (0..len).map(|_| initial.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, index: usize) -> T {
        or_panic(self.try_get(index))
    }

    pub fn try_get(&self, index: usize) -> Result<T, IndexError> {
        let cell = self.cell(index)?;
        let guard = epoch::pin();
        Ok(cell.read(&self.cells, &guard).clone())
    }

    pub fn set(&self, index: usize, value: T) {
        or_panic(self.try_set(index, value))
    }

    pub fn try_set(&self, index: usize, value: T) -> Result<(), IndexError> {
        let cell = self.cell(index)?;
        let guard = epoch::pin();
        cell.write(value, &self.cells, &guard);
        Ok(())
    }

    /// Replaces the value at `index` with `update` if it equals `expected`.
    pub fn cas(&self, index: usize, expected: T, update: T) -> bool {
        or_panic(self.try_cas(index, expected, update))
    }

    pub fn try_cas(&self, index: usize, expected: T, update: T) -> Result<bool, IndexError> {
        let cell = self.cell(index)?;
        let guard = epoch::pin();
        let swapped = cell
            .compare_and_set(&expected, Owned::new(Node::Value(update)), &self.cells, &guard)
            .is_ok();
        Ok(swapped)
    }

    /// Atomically sets both cells to their updates iff both hold their
    /// expected values; otherwise neither changes.
    ///
    /// Argument order does not matter. With `index0 == index1` the call fails
    /// when the two expectations differ and otherwise acts as
    /// `cas(index1, exp1, new1)`.
    pub fn cas2(&self, index0: usize, exp0: T, new0: T, index1: usize, exp1: T, new1: T) -> bool {
        or_panic(self.try_cas2(index0, exp0, new0, index1, exp1, new1))
    }

    pub fn try_cas2(
        &self,
        index0: usize,
        exp0: T,
        new0: T,
        index1: usize,
        exp1: T,
        new1: T,
    ) -> Result<bool, IndexError> {
        self.cell(index0)?;
        self.cell(index1)?;
        let guard = epoch::pin();
        Ok(cas2::cas2(
            &self.cells,
            (index0, exp0, new0),
            (index1, exp1, new1),
            &guard,
        ))
    }

    /// Reads every cell in turn. Each read is atomic, the whole is not.
    pub fn snapshot(&self) -> Vec<T> {
        let guard = epoch::pin();
        self.cells
            .iter()
            .map(|cell| cell.read(&self.cells, &guard).clone())
            .collect()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.cells
            .into_vec()
            .into_iter()
            .map(Cell::into_inner)
            .collect()
    }

    fn cell(&self, index: usize) -> Result<&Cell<T>, IndexError> {
        self.cells.get(index).ok_or(IndexError {
            index,
            len: self.cells.len(),
        })
    }
}

fn or_panic<R>(result: Result<R, IndexError>) -> R {
    match result {
        Ok(r) => r,
        Err(err) => panic!("{}", err),
    }
}

impl<T: Element> From<Vec<T>> for AtomicArray<T> {
    fn from(values: Vec<T>) -> Self {
        values.into_iter().collect()
    }
}

impl<T: Element> FromIterator<T> for AtomicArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(Cell::new).collect(),
        }
    }
}

impl<T: Element + fmt::Debug> fmt::Debug for AtomicArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.snapshot()).finish()
    }
}
