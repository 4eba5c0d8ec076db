use serde::{Deserialize, Serialize};

use crate::Word;

/// The game-state store scripts read and write.
///
/// Flags are addressed by bit index inside a buffer, words by word offset.
/// The VM uses whatever these return; an implementation reports its own
/// failures.
pub trait DataStore {
    fn get_bit(&self, buf: u8, bit: u16) -> bool;

    fn set_bit(&mut self, buf: u8, bit: u16, on: bool);

    fn get_word(&self, buf: u8, offset: u16) -> Word;

    fn put_word(&mut self, buf: u8, offset: u16, value: Word);

    /// Read a word of the primary buffer as an unsigned quantity.
    fn read_word_unsigned(&self, offset: u16) -> u16;
}

/// In-memory data store: a fixed set of word buffers.
///
/// Bit `n` of a buffer lives in word `n / 16`, bit `n % 16`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBuffers {
    buffers: Vec<Vec<Word>>,
}

impl DataBuffers {
    pub fn new(buffer_count: usize, words_per_buffer: usize) -> Self {
        Self {
            buffers: vec![vec![0; words_per_buffer]; buffer_count],
        }
    }

    pub fn buffer(&self, buf: u8) -> Option<&[Word]> {
        self.buffers.get(buf as usize).map(Vec::as_slice)
    }

    fn word(&self, buf: u8, offset: u16) -> Option<Word> {
        self.buffers.get(buf as usize)?.get(offset as usize).copied()
    }

    fn word_mut(&mut self, buf: u8, offset: u16) -> Option<&mut Word> {
        self.buffers.get_mut(buf as usize)?.get_mut(offset as usize)
    }
}

impl DataStore for DataBuffers {
    fn get_bit(&self, buf: u8, bit: u16) -> bool {
        match self.word(buf, bit / 16) {
            Some(w) => (w as u16) & (1 << (bit % 16)) != 0,
            None => {
                log::warn!("get_bit: bit {} of buffer {} is out of range", bit, buf);
                false
            }
        }
    }

    fn set_bit(&mut self, buf: u8, bit: u16, on: bool) {
        let Some(w) = self.word_mut(buf, bit / 16) else {
            log::warn!("set_bit: bit {} of buffer {} is out of range", bit, buf);
            return;
        };
        let mask = 1u16 << (bit % 16);
        let bits = if on {
            (*w as u16) | mask
        } else {
            (*w as u16) & !mask
        };
        *w = bits as Word;
    }

    fn get_word(&self, buf: u8, offset: u16) -> Word {
        self.word(buf, offset).unwrap_or_else(|| {
            log::warn!("get_word: offset {} of buffer {} is out of range", offset, buf);
            0
        })
    }

    fn put_word(&mut self, buf: u8, offset: u16, value: Word) {
        match self.word_mut(buf, offset) {
            Some(w) => *w = value,
            None => log::warn!("put_word: offset {} of buffer {} is out of range", offset, buf),
        }
    }

    fn read_word_unsigned(&self, offset: u16) -> u16 {
        self.get_word(0, offset) as u16
    }
}
