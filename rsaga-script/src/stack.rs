use serde::{Deserialize, Serialize};

use crate::error::StackFault;
use crate::Word;

/// Direction the stack pointer moves on push.
///
/// The growth direction only changes where values land inside the backing
/// buffer; the LIFO behaviour is identical either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Growth {
    Up,
    #[default]
    Down,
}

/// Fixed-capacity operand stack of a script thread.
///
/// The same stack carries evaluation values and the return offsets pushed by
/// `GOSB`. Return offsets go through [`Stack::push_return`] and
/// [`Stack::pop_return`]; debug builds remember the depth at every call so an
/// unbalanced return gets reported.
#[derive(Debug, Clone)]
pub struct Stack {
    slots: Box<[Word]>,
    depth: usize,
    growth: Growth,
    #[cfg(debug_assertions)]
    frames: Vec<usize>,
}

impl Stack {
    pub fn new(capacity: usize, growth: Growth) -> Self {
        Self {
            slots: vec![0; capacity].into_boxed_slice(),
            depth: 0,
            growth,
            #[cfg(debug_assertions)]
            frames: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.depth == 0
    }

    pub fn is_full(&self) -> bool {
        self.depth == self.slots.len()
    }

    pub fn growth(&self) -> Growth {
        self.growth
    }

    // physical slot of the n-th pushed value (0 = bottom)
    fn slot(&self, n: usize) -> usize {
        match self.growth {
            Growth::Up => n,
            Growth::Down => self.slots.len() - 1 - n,
        }
    }

    fn grow(&mut self) -> Result<usize, StackFault> {
        if self.is_full() {
            return Err(StackFault::Overflow {
                capacity: self.slots.len(),
            });
        }
        let idx = self.slot(self.depth);
        self.depth += 1;
        Ok(idx)
    }

    /// Reserve a slot without a meaningful value; it reads back as 0.
    pub fn push_null(&mut self) -> Result<(), StackFault> {
        let idx = self.grow()?;
        self.slots[idx] = 0;
        Ok(())
    }

    pub fn push(&mut self, value: Word) -> Result<(), StackFault> {
        let idx = self.grow()?;
        self.slots[idx] = value;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Word, StackFault> {
        let value = self.top()?;
        self.depth -= 1;
        Ok(value)
    }

    /// Peek at the top value without removing it.
    pub fn top(&self) -> Result<Word, StackFault> {
        if self.depth == 0 {
            return Err(StackFault::Underflow);
        }
        Ok(self.slots[self.slot(self.depth - 1)])
    }

    /// Pop `n` values and drop them.
    pub fn discard(&mut self, n: usize) -> Result<(), StackFault> {
        for _ in 0..n {
            self.pop()?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.depth = 0;
        #[cfg(debug_assertions)]
        self.frames.clear();
    }

    /// Values from the top of the stack down to the bottom.
    pub fn iter(&self) -> impl Iterator<Item = Word> + '_ {
        (0..self.depth).rev().map(move |n| self.slots[self.slot(n)])
    }

    /// Push the offset a subroutine returns to.
    pub fn push_return(&mut self, offset: u16) -> Result<(), StackFault> {
        #[cfg(debug_assertions)]
        let depth = self.depth;
        self.push(offset as Word)?;
        #[cfg(debug_assertions)]
        self.frames.push(depth);
        Ok(())
    }

    /// Pop the offset to return to. Fails when the stack is empty, which means
    /// the outermost frame is returning.
    pub fn pop_return(&mut self) -> Result<u16, StackFault> {
        #[cfg(debug_assertions)]
        match self.frames.pop() {
            Some(depth) if depth + 1 != self.depth => {
                log::warn!(
                    "unbalanced return: call frame started at depth {}, stack depth is {}",
                    depth,
                    self.depth
                );
            }
            None if self.depth > 0 => {
                log::warn!(
                    "outermost return with {} value(s) left on the stack",
                    self.depth
                );
            }
            _ => {}
        }
        self.pop().map(|v| v as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lifo_in_both_directions() {
        for growth in [Growth::Up, Growth::Down] {
            let mut stack = Stack::new(4, growth);
            for v in [1, -2, 3, 4] {
                stack.push(v).unwrap();
            }
            assert_eq!(stack.iter().collect::<Vec<_>>(), vec![4, 3, -2, 1]);
            assert_eq!(stack.pop(), Ok(4));
            assert_eq!(stack.pop(), Ok(3));
            assert_eq!(stack.pop(), Ok(-2));
            assert_eq!(stack.pop(), Ok(1));
            assert!(stack.is_empty());
        }
    }

    #[test]
    fn overflow_keeps_contents() {
        let mut stack = Stack::new(2, Growth::Down);
        stack.push(7).unwrap();
        stack.push(8).unwrap();
        assert_eq!(stack.push(9), Err(StackFault::Overflow { capacity: 2 }));
        assert_eq!(stack.push_null(), Err(StackFault::Overflow { capacity: 2 }));
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.top(), Ok(8));
    }

    #[test]
    fn underflow_on_empty() {
        let mut stack = Stack::new(2, Growth::Up);
        assert_eq!(stack.pop(), Err(StackFault::Underflow));
        assert_eq!(stack.top(), Err(StackFault::Underflow));
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn push_null_reads_zero() {
        let mut stack = Stack::new(2, Growth::Up);
        stack.push(5).unwrap();
        stack.pop().unwrap();
        stack.push_null().unwrap();
        assert_eq!(stack.top(), Ok(0));
    }

    #[test]
    fn return_offsets_share_the_stack() {
        let mut stack = Stack::new(4, Growth::Down);
        stack.push(11).unwrap();
        stack.push_return(0x1234).unwrap();
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.pop_return(), Ok(0x1234));
        assert_eq!(stack.pop(), Ok(11));
        assert_eq!(stack.pop_return(), Err(StackFault::Underflow));
    }

    #[test]
    fn high_return_offsets_survive_the_word_cast() {
        let mut stack = Stack::new(1, Growth::Up);
        stack.push_return(0xFFF0).unwrap();
        assert_eq!(stack.pop_return(), Ok(0xFFF0));
    }
}
