//! `chunkify`: groups an [`OwningIter`] into an owning iterator of
//! chunk-iterators that share one underlying cursor (spec.md §4.2).

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::iter::OwningIter;

struct Shared<I: OwningIter> {
    source: I,
    chunk_size: usize,
    generation: u64,
    remaining: usize,
    lookahead: Option<I::Item>,
}

/// Owning iterator of [`ChunkIter`]s, produced by [`chunkify`].
pub struct Chunks<I: OwningIter> {
    shared: Rc<RefCell<Shared<I>>>,
}

/// One chunk's worth of the underlying stream: at most `chunk` elements.
/// Sibling of the stream-wide cursor held in [`Chunks`] — advancing the
/// outer `Chunks` iterator invalidates any `ChunkIter` still in flight.
pub struct ChunkIter<I: OwningIter> {
    shared: Rc<RefCell<Shared<I>>>,
    generation: u64,
}

/// Splits `source` into chunks of up to `chunk` elements each. Fails with
/// [`Error::InvalidInput`] if `chunk == 0`.
pub fn chunkify<I: OwningIter>(source: I, chunk: usize) -> Result<Chunks<I>> {
    if chunk == 0 {
        return Err(Error::invalid_input("chunk size must be greater than zero"));
    }
    Ok(Chunks {
        shared: Rc::new(RefCell::new(Shared {
            source,
            chunk_size: chunk,
            generation: 0,
            remaining: 0,
            lookahead: None,
        })),
    })
}

impl<I: OwningIter> OwningIter for Chunks<I> {
    type Item = ChunkIter<I>;

    fn next(&mut self) -> Result<Option<ChunkIter<I>>> {
        let mut shared = self.shared.borrow_mut();
        if shared.lookahead.is_none() {
            shared.lookahead = shared.source.next()?;
        }
        if shared.lookahead.is_none() {
            return Ok(None);
        }
        shared.generation += 1;
        shared.remaining = shared.chunk_size;
        let generation = shared.generation;
        drop(shared);
        Ok(Some(ChunkIter {
            shared: self.shared.clone(),
            generation,
        }))
    }
}

impl<I: OwningIter> OwningIter for ChunkIter<I> {
    type Item = I::Item;

    fn next(&mut self) -> Result<Option<I::Item>> {
        let mut shared = self.shared.borrow_mut();
        if shared.generation != self.generation || shared.remaining == 0 {
            return Ok(None);
        }
        let item = match shared.lookahead.take() {
            Some(item) => item,
            None => match shared.source.next()? {
                Some(item) => item,
                None => {
                    shared.remaining = 0;
                    return Ok(None);
                }
            },
        };
        shared.remaining -= 1;
        Ok(Some(item))
    }
}
