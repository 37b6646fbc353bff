//! `tee`: splits one [`OwningIter`] into two sibling iterators that each
//! observe the full stream in order (spec.md §4.2).
//!
//! A shared bounded queue buffers whichever element the leading sibling has
//! already consumed but the lagging sibling hasn't reached yet. Siblings
//! yield `Rc<I::Item>` rather than `I::Item` directly — sharing one
//! physical element between two independent consumers without requiring
//! `I::Item: Clone` is exactly what reference counting is for, and it keeps
//! the "whoever destroys the last sibling destroys the buffer" rule a plain
//! consequence of `Rc` drop order rather than something hand-tracked.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::iter::OwningIter;

struct PendingShare<T> {
    item: Rc<T>,
    /// The sibling that produced `item` and is still owed its own copy.
    owed_to: usize,
    /// The sibling whose queue still needs `item` pushed onto it.
    queue_for: usize,
}

struct State<I: OwningIter> {
    source: I,
    queues: [VecDeque<Rc<I::Item>>; 2],
    alive: [bool; 2],
    pending: Option<PendingShare<I::Item>>,
}

/// One side of a [`tee`] split.
pub struct TeeIter<I: OwningIter> {
    state: Rc<RefCell<State<I>>>,
    index: usize,
}

/// Splits `source` into two sibling iterators, each observing the full
/// stream in production order.
pub fn tee<I: OwningIter>(source: I) -> (TeeIter<I>, TeeIter<I>) {
    let state = Rc::new(RefCell::new(State {
        source,
        queues: [VecDeque::new(), VecDeque::new()],
        alive: [true, true],
        pending: None,
    }));
    (
        TeeIter {
            state: state.clone(),
            index: 0,
        },
        TeeIter { state, index: 1 },
    )
}

impl<I: OwningIter> OwningIter for TeeIter<I> {
    type Item = Rc<I::Item>;

    fn next(&mut self) -> Result<Option<Rc<I::Item>>> {
        let mut state = self.state.borrow_mut();

        if let Some(pending) = state.pending.take() {
            match state.queues[pending.queue_for].try_reserve(1) {
                Ok(()) => {
                    state.queues[pending.queue_for].push_back(pending.item.clone());
                    if self.index == pending.owed_to {
                        return Ok(Some(pending.item));
                    }
                    // self.index == pending.queue_for: it's now sitting at
                    // the front of our own queue, fall through to the
                    // normal path below.
                }
                Err(_) => {
                    state.pending = Some(pending);
                    return Err(Error::OutOfMemory);
                }
            }
        }

        if let Some(item) = state.queues[self.index].pop_front() {
            return Ok(Some(item));
        }

        let other = 1 - self.index;
        match state.source.next()? {
            None => Ok(None),
            Some(raw) => {
                let item = Rc::new(raw);
                if !state.alive[other] {
                    // no sibling left to share with
                    return Ok(Some(item));
                }
                match state.queues[other].try_reserve(1) {
                    Ok(()) => {
                        state.queues[other].push_back(item.clone());
                        Ok(Some(item))
                    }
                    Err(_) => {
                        state.pending = Some(PendingShare {
                            item,
                            owed_to: self.index,
                            queue_for: other,
                        });
                        Err(Error::OutOfMemory)
                    }
                }
            }
        }
    }
}

impl<I: OwningIter> Drop for TeeIter<I> {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.alive[self.index] = false;
        state.queues[self.index].clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::FromStdIter;

    fn drain<I: OwningIter>(it: &mut TeeIter<I>) -> Vec<I::Item>
    where
        I::Item: Clone,
    {
        let mut out = Vec::new();
        while let Some(item) = it.next().unwrap() {
            out.push((*item).clone());
        }
        out
    }

    #[test]
    fn s5_interleaved_reads_both_see_full_sequence() {
        let source = FromStdIter(vec![1, 2, 3].into_iter());
        let (mut a, mut b) = tee(source);

        assert_eq!(*a.next().unwrap().unwrap(), 1);
        assert_eq!(*a.next().unwrap().unwrap(), 2);
        assert_eq!(*b.next().unwrap().unwrap(), 1);
        assert_eq!(*a.next().unwrap().unwrap(), 3);
        assert_eq!(*b.next().unwrap().unwrap(), 2);
        assert_eq!(*b.next().unwrap().unwrap(), 3);
        assert!(a.next().unwrap().is_none());
        assert!(b.next().unwrap().is_none());
    }

    #[test]
    fn both_siblings_independently_observe_full_stream_regardless_of_order() {
        let source = FromStdIter(1..=5);
        let (mut a, mut b) = tee(source);
        let b_seq = drain(&mut b);
        let a_seq = drain(&mut a);
        assert_eq!(a_seq, vec![1, 2, 3, 4, 5]);
        assert_eq!(b_seq, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn dropping_one_sibling_lets_the_other_keep_reading() {
        let source = FromStdIter(vec!["x", "y", "z"].into_iter());
        let (mut a, b) = tee(source);
        drop(b);
        assert_eq!(drain(&mut a), vec!["x", "y", "z"]);
    }

    #[test]
    fn lagging_sibling_queue_holds_exactly_the_gap() {
        let source = FromStdIter(vec![10, 20, 30, 40].into_iter());
        let (mut a, b) = tee(source);
        a.next().unwrap();
        a.next().unwrap();
        a.next().unwrap();
        // a has observed 10,20,30 ; b has observed nothing yet: the shared
        // queue for b must hold exactly [10,20,30].
        assert_eq!(a.state.borrow().queues[b.index].len(), 3);
    }

    proptest::proptest! {
        // Property 5 (spec.md §8): both siblings observe the exact source
        // sequence, in order, regardless of which one runs ahead.
        #[test]
        fn both_siblings_always_see_the_source_sequence_in_order(
            items in proptest::collection::vec(0..1000i32, 0..64),
            lead_a_steps in 0usize..32,
        ) {
            let expected = items.clone();
            let source = FromStdIter(items.into_iter());
            let (mut a, mut b) = tee(source);

            let mut a_seq = Vec::new();
            for _ in 0..lead_a_steps {
                match a.next().unwrap() {
                    Some(item) => a_seq.push(*item),
                    None => break,
                }
            }
            a_seq.extend(drain(&mut a));
            let b_seq = drain(&mut b);

            proptest::prop_assert_eq!(a_seq, expected.clone());
            proptest::prop_assert_eq!(b_seq, expected);
        }
    }
}
