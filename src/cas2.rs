use crate::{
    atomic::{help, Cell, Element, Node},
    dcss::double_compare_single_set,
    outcome::{AtomicOutcome, Outcome},
};
use crossbeam_epoch::{Guard, Owned};
use crossbeam_utils::Backoff;
use std::sync::Arc;
use tracing::trace;

pub(crate) fn cas2<T: Element>(
    cells: &[Cell<T>],
    (index0, exp0, new0): (usize, T, T),
    (index1, exp1, new1): (usize, T, T),
    guard: &Guard,
) -> bool {
    if index0 == index1 {
        trace!(index = index0, "cas2 on a single cell");
        if exp0 != exp1 {
            return false;
        }
        return cells[index1]
            .compare_and_set(&exp1, Owned::new(Node::Value(new1)), cells, guard)
            .is_ok();
    }

    // a fixed order keeps crossing cas2 calls from helping each other in a cycle
    let record = if index0 < index1 {
        Cas2Record::new(index0, exp0, new0, index1, exp1, new1)
    } else {
        Cas2Record::new(index1, exp1, new1, index0, exp0, new0)
    };

    let installed = cells[record.a].compare_and_set(
        &record.expected_a,
        Owned::new(Node::Cas2(record.clone())),
        cells,
        guard,
    );
    if installed.is_err() {
        return false;
    }
    record.complete(cells, guard);
    record.outcome.load().succeeded()
}

/// Double-compare double-set of cells `a < b`. Lives in `a` from the moment
/// it is installed, and in `b` from a successful dcss until it is settled.
pub(crate) struct Cas2Record<T> {
    a: usize,
    expected_a: T,
    update_a: T,
    b: usize,
    expected_b: T,
    update_b: T,
    pub(crate) outcome: AtomicOutcome,
}

impl<T: Element> Cas2Record<T> {
    pub fn new(a: usize, expected_a: T, update_a: T, b: usize, expected_b: T, update_b: T) -> Arc<Self> {
        assert!(a < b, "cas2 record cells out of order: {} >= {}", a, b);
        Arc::new(Self {
            a,
            expected_a,
            update_a,
            b,
            expected_b,
            update_b,
            outcome: AtomicOutcome::new(),
        })
    }

    pub fn complete(self: &Arc<Self>, cells: &[Cell<T>], guard: &Guard) {
        let backoff = Backoff::new();
        loop {
            if double_compare_single_set(cells, self.b, &self.expected_b, self, Outcome::Undecided, guard) {
                break;
            }
            let decided = self.outcome.load();
            if decided != Outcome::Undecided {
                return self.settle(decided, cells, guard);
            }

            let (current, node) = cells[self.b].load_node(guard);
            if node.holds(self) {
                // some helper got it into b first
                break;
            }
            if !node.is_record() {
                trace!(index = self.b, "cas2 expectation on second cell does not hold");
                let decided = self.outcome.decide(Outcome::Fail);
                return self.settle(decided, cells, guard);
            }
            if backoff.is_completed() {
                trace!(index = self.b, "helping foreign record on second cell");
                help(current, cells, guard);
            } else {
                backoff.snooze();
            }
        }

        let decided = self.outcome.decide(Outcome::Success);
        self.settle(decided, cells, guard);
    }

    // a before b: once b shows a plain value again, a has been settled
    fn settle(self: &Arc<Self>, outcome: Outcome, cells: &[Cell<T>], guard: &Guard) {
        let (value_a, value_b) = if outcome.succeeded() {
            (&self.update_a, &self.update_b)
        } else {
            (&self.expected_a, &self.expected_b)
        };
        cells[self.a].resolve(self, value_a, guard);
        cells[self.b].resolve(self, value_b, guard);
    }
}
