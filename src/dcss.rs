use crate::{
    atomic::{Cell, Element, Node},
    cas2::Cas2Record,
    outcome::{AtomicOutcome, Outcome},
};
use crossbeam_epoch::{Guard, Owned, Shared};
use std::sync::Arc;

/// Installs `update` into cell `host` iff the host holds `expected` and the
/// gate (the outcome of `update`) still reads `witness`.
pub(crate) struct DcssRecord<T> {
    host: usize,
    expected: T,
    update: Arc<Cas2Record<T>>,
    witness: Outcome,
    outcome: AtomicOutcome,
}

impl<T: Element> DcssRecord<T> {
    /// `this` is the node the record was installed in. Safe to run any
    /// number of times from any number of threads.
    pub fn complete<'g>(&self, this: Shared<'g, Node<T>>, cells: &[Cell<T>], guard: &'g Guard) {
        let gate = self.update.outcome.load();
        let outcome = if gate == self.witness {
            Outcome::Success
        } else {
            Outcome::Fail
        };
        let decided = self.outcome.decide(outcome);

        let replacement = if decided.succeeded() {
            Node::Cas2(self.update.clone())
        } else {
            Node::Value(self.expected.clone())
        };
        let _ = cells[self.host].replace(this, Owned::new(replacement), guard);
    }
}

pub(crate) fn double_compare_single_set<T: Element>(
    cells: &[Cell<T>],
    host: usize,
    expected: &T,
    update: &Arc<Cas2Record<T>>,
    witness: Outcome,
    guard: &Guard,
) -> bool {
    let cell = &cells[host];

    // a helper already applied it; reporting success here would be ambiguous
    if cell.load_node(guard).1.holds(update) {
        return false;
    }

    let record = DcssRecord {
        host,
        expected: expected.clone(),
        update: update.clone(),
        witness,
        outcome: AtomicOutcome::new(),
    };
    let installed = match cell.compare_and_set(expected, Owned::new(Node::Dcss(record)), cells, guard) {
        Ok(installed) => installed,
        Err(_) => return false,
    };

    // safety: installed under `guard`, retired no earlier than its release
    match unsafe { installed.deref() } {
        Node::Dcss(record) => {
            record.complete(installed, cells, guard);
            record.outcome.load().succeeded()
        },
        _ => unreachable!("installed node is not the dcss record"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_epoch::pin;

    fn cells(values: &[u64]) -> Vec<Cell<u64>> {
        values.iter().map(|v| Cell::new(*v)).collect()
    }

    #[test]
    fn test_dcss_installs_update() {
        let g = pin();
        let cells = cells(&[0, 5]);
        let record = Cas2Record::new(0, 0, 1, 1, 5, 6);
        assert!(double_compare_single_set(&cells, 1, &5, &record, Outcome::Undecided, &g));
        assert!(cells[1].load_node(&g).1.holds(&record));

        // already there
        assert!(!double_compare_single_set(&cells, 1, &5, &record, Outcome::Undecided, &g));
        assert!(cells[1].load_node(&g).1.holds(&record));
    }

    #[test]
    fn test_dcss_value_mismatch() {
        let g = pin();
        let cells = cells(&[0, 5]);
        let record = Cas2Record::new(0, 0, 1, 1, 7, 8);
        assert!(!double_compare_single_set(&cells, 1, &7, &record, Outcome::Undecided, &g));
        assert!(matches!(cells[1].load_node(&g).1, Node::Value(5)));
    }

    #[test]
    fn test_dcss_gate_mismatch_restores_host() {
        let g = pin();
        let cells = cells(&[0, 5]);
        let record = Cas2Record::new(0, 0, 1, 1, 5, 6);
        assert_eq!(record.outcome.decide(Outcome::Fail), Outcome::Fail);

        let before = cells[1].load_raw(&g);
        assert!(!double_compare_single_set(&cells, 1, &5, &record, Outcome::Undecided, &g));
        let (after, node) = cells[1].load_node(&g);
        assert!(matches!(node, Node::Value(5)));
        // the host went through the record and back
        assert_ne!(before, after);
    }
}
