use crate::{cas2::Cas2Record, dcss::DcssRecord};
use crossbeam_epoch::{self as epoch, Atomic as EpochAtomic, Guard, Owned, Shared};
use crossbeam_utils::Backoff;
use std::sync::{atomic::Ordering, Arc};
use tracing::trace;

/// Values that can be stored in an [`AtomicArray`](crate::AtomicArray).
pub trait Element: Clone + PartialEq + Send + Sync + 'static {}
impl<T> Element for T where T: Clone + PartialEq + Send + Sync + 'static {}

/// What a cell points to: a plain value or a pending operation record.
pub(crate) enum Node<T> {
    Value(T),
    Dcss(DcssRecord<T>),
    Cas2(Arc<Cas2Record<T>>),
}

impl<T> Node<T> {
    pub fn is_record(&self) -> bool {
        !matches!(self, Node::Value(_))
    }

    pub fn holds(&self, record: &Arc<Cas2Record<T>>) -> bool {
        match self {
            Node::Cas2(installed) => Arc::ptr_eq(installed, record),
            _ => false,
        }
    }
}

/// Drives the record behind `node` to completion. Plain values are left alone.
pub(crate) fn help<'g, T: Element>(node: Shared<'g, Node<T>>, cells: &[Cell<T>], guard: &'g Guard) {
    // safety: cells never hold null and nodes are retired through the guard
    match unsafe { node.deref() } {
        Node::Value(_) => {},
        Node::Dcss(record) => record.complete(node, cells, guard),
        Node::Cas2(record) => record.complete(cells, guard),
    }
}

pub(crate) struct Cell<T> {
    slot: EpochAtomic<Node<T>>,
}

impl<T: Element> Cell<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: EpochAtomic::new(Node::Value(value)),
        }
    }

    pub fn load_raw<'g>(&self, guard: &'g Guard) -> Shared<'g, Node<T>> {
        self.slot.load(Ordering::SeqCst, guard)
    }

    pub fn load_node<'g>(&self, guard: &'g Guard) -> (Shared<'g, Node<T>>, &'g Node<T>) {
        let current = self.load_raw(guard);
        // safety: see `help`
        (current, unsafe { current.deref() })
    }

    pub fn read<'g>(&self, cells: &[Cell<T>], guard: &'g Guard) -> &'g T {
        loop {
            let (current, node) = self.load_node(guard);
            match node {
                Node::Value(value) => return value,
                _ => help(current, cells, guard),
            }
        }
    }

    pub fn write(&self, value: T, cells: &[Cell<T>], guard: &Guard) {
        let backoff = Backoff::new();
        let mut new = Owned::new(Node::Value(value));
        loop {
            let (current, node) = self.load_node(guard);
            if node.is_record() {
                trace!("write found a pending record, helping");
                help(current, cells, guard);
                continue;
            }
            match self.replace(current, new, guard) {
                Ok(_) => return,
                Err(returned) => {
                    new = returned;
                    backoff.spin();
                },
            }
        }
    }

    /// Installs `new` if the cell holds `expected`, returning the installed
    /// pointer. `new` is handed back when the cell holds a different value.
    pub fn compare_and_set<'g>(
        &self,
        expected: &T,
        mut new: Owned<Node<T>>,
        cells: &[Cell<T>],
        guard: &'g Guard,
    ) -> Result<Shared<'g, Node<T>>, Owned<Node<T>>> {
        let backoff = Backoff::new();
        loop {
            let (current, node) = self.load_node(guard);
            match node {
                Node::Value(value) if value == expected => match self.replace(current, new, guard) {
                    Ok(installed) => return Ok(installed),
                    Err(returned) => {
                        // lost the race to another write, the value may still match
                        new = returned;
                        backoff.spin();
                    },
                },
                Node::Value(_) => return Err(new),
                _ => {
                    trace!("compare_and_set found a pending record, helping");
                    self.read(cells, guard);
                },
            }
        }
    }

    /// Raw CAS from `current` to `new`. The winner retires the node it unlinked.
    pub fn replace<'g>(
        &self,
        current: Shared<'g, Node<T>>,
        new: Owned<Node<T>>,
        guard: &'g Guard,
    ) -> Result<Shared<'g, Node<T>>, Owned<Node<T>>> {
        match self
            .slot
            .compare_exchange(current, new, Ordering::SeqCst, Ordering::SeqCst, guard)
        {
            Ok(installed) => {
                // safety: `current` is unreachable from this cell now and every
                // node is linked into a single cell exactly once
                unsafe { guard.defer_destroy(current) };
                Ok(installed)
            },
            Err(err) => Err(err.new),
        }
    }

    /// Swaps `record` out for `value` if this cell still holds it.
    pub fn resolve(&self, record: &Arc<Cas2Record<T>>, value: &T, guard: &Guard) {
        let (current, node) = self.load_node(guard);
        if node.holds(record) {
            let _ = self.replace(current, Owned::new(Node::Value(value.clone())), guard);
        }
    }

    // caller has exclusive access, so no record can be in flight
    pub fn into_inner(self) -> T {
        // safety: exclusive access
        let guard = unsafe { epoch::unprotected() };
        let node = self.slot.swap(Shared::null(), Ordering::Relaxed, guard);
        // safety: the slot was never null before the swap
        match *unsafe { node.into_owned() }.into_box() {
            Node::Value(value) => value,
            _ => unreachable!("operation record left in a quiescent cell"),
        }
    }
}

impl<T> Drop for Cell<T> {
    fn drop(&mut self) {
        // safety: `&mut self` means no other thread can observe the slot
        unsafe {
            let guard = epoch::unprotected();
            let node = self.slot.load(Ordering::Relaxed, guard);
            if !node.is_null() {
                drop(node.into_owned());
            }
        }
    }
}
