//! Identifier generation
//!
//! `random_int` draws an inclusive-range integer; `random_id` builds an
//! alphanumeric string from independent `random_int(0, 61)` draws. The uniform
//! source is injected so tests can force the output.

mod source;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::errors::ArgsError;

pub use source::{FixedSequence, SeededRandom, ThreadRandom, UniformSource};

/// Symbols used by `random_id`: digits, lowercase, uppercase
pub const ID_ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Random integer and id generator over a shared uniform source.
///
/// Clones share the same source, so a sequence injected once is consumed
/// by every holder in call order.
#[derive(Clone)]
pub struct Randoms {
    source: Arc<Mutex<Box<dyn UniformSource>>>,
}

impl Randoms {
    pub fn new(source: impl UniformSource + 'static) -> Self {
        Self {
            source: Arc::new(Mutex::new(Box::new(source))),
        }
    }

    /// Generator backed by thread-local entropy
    pub fn thread() -> Self {
        Self::new(ThreadRandom)
    }

    /// Reproducible generator
    pub fn seeded(seed: u64) -> Self {
        Self::new(SeededRandom::new(seed))
    }

    fn next_unit(&self) -> f64 {
        self.source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_unit()
    }

    /// Returns a random integer in `[from, to]`, inclusive.
    ///
    /// Missing bounds default to 0, and reversed bounds are swapped, so
    /// `random_int(None, Some(-5))` draws from `[-5, 0]`.
    pub fn random_int(&self, from: Option<i64>, to: Option<i64>) -> i64 {
        let (mut low, mut high) = (from.unwrap_or(0), to.unwrap_or(0));
        if low > high {
            std::mem::swap(&mut low, &mut high);
        }

        let range = (high as i128 - low as i128 + 1) as f64;
        let offset = (self.next_unit() * range).floor() as i128;
        (low as i128 + offset).min(high as i128) as i64
    }

    /// Returns a random alphanumeric string of `length` symbols.
    ///
    /// Fails with `ArgsError` when `length` is negative or does not fit a `usize`.
    pub fn random_id<L>(&self, length: L) -> Result<String, ArgsError>
    where
        L: TryInto<usize> + Copy + fmt::Display,
    {
        let length: usize = length.try_into().map_err(|_| {
            ArgsError::invalid_argument(format!(
                "id length must be a non-negative integer, got {}",
                length
            ))
        })?;

        let last = (ID_ALPHABET.len() - 1) as i64;
        let id = (0..length)
            .map(|_| ID_ALPHABET[self.random_int(Some(0), Some(last)) as usize] as char)
            .collect();
        Ok(id)
    }
}

impl Default for Randoms {
    fn default() -> Self {
        Self::thread()
    }
}

impl fmt::Debug for Randoms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Randoms").finish_non_exhaustive()
    }
}
