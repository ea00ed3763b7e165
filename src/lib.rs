//! Fixed-size lock-free array with single-cell and double-cell compare-and-swap.
//!
//! [`AtomicArray::cas2`] updates two cells at one indivisible point: no reader
//! ever sees one of them changed and the other not. Pending operations are
//! published as records inside the cells and any thread that runs into one
//! finishes it before going on, so a stalled thread never blocks the others.
//! Replaced nodes are reclaimed through [`crossbeam_epoch`].

mod array;
mod atomic;
mod cas2;
mod dcss;
mod error;
mod outcome;

pub use array::AtomicArray;
pub use atomic::Element;
pub use error::IndexError;
