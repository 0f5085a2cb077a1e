//! Masked byte-signature matching.
//!
//! A signature is a byte pattern paired with a per-byte mask. A mask byte
//! of zero accepts any buffer value at that position; any other mask value
//! requires the buffer byte to equal the pattern byte exactly.
//!
//! Searches return `Option<usize>`: offset 0 is a legitimate match and is
//! never used to signal absence.

use std::fmt;

use serde::Serialize;

use crate::error::{AnalyzerError, Result};

/// A named byte pattern with a wildcard mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Signature<'a> {
    /// Short identifier used in logs and errors
    pub name: &'a str,
    /// Expected byte values
    pub pattern: &'a [u8],
    /// Per-byte mask, zero = wildcard
    pub mask: &'a [u8],
}

impl<'a> Signature<'a> {
    /// Create a signature, checking that pattern and mask agree in length.
    pub fn new(name: &'a str, pattern: &'a [u8], mask: &'a [u8]) -> Result<Self> {
        let signature = Self {
            name,
            pattern,
            mask,
        };
        signature.validate()?;
        Ok(signature)
    }

    /// Check the pattern/mask length invariant.
    pub fn validate(&self) -> Result<()> {
        if self.pattern.is_empty() || self.pattern.len() != self.mask.len() {
            return Err(AnalyzerError::InvalidSignature {
                name: self.name.to_string(),
                pattern_len: self.pattern.len(),
                mask_len: self.mask.len(),
            });
        }
        Ok(())
    }

    /// Length of the signature in bytes.
    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    /// Whether the signature has no bytes.
    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    /// Number of wildcard positions.
    pub fn wildcards(&self) -> usize {
        self.mask.iter().filter(|&&m| m == 0).count()
    }

    /// First match at or after `start`.
    pub fn find(&self, buffer: &[u8], start: usize) -> Option<usize> {
        find(buffer, start, self.pattern, self.mask)
    }

    /// First match starting inside the `window` bytes that precede `origin`.
    pub fn find_before(&self, buffer: &[u8], origin: usize, window: usize) -> Option<usize> {
        if origin == 0 || self.is_empty() {
            return None;
        }
        let limit = (origin - 1 + self.len()).min(buffer.len());
        find(
            &buffer[..limit],
            origin.saturating_sub(window),
            self.pattern,
            self.mask,
        )
    }

    /// Iterate over every match, resuming one byte past the previous one.
    pub fn find_iter<'b>(&self, buffer: &'b [u8]) -> Matches<'a, 'b> {
        Matches {
            signature: *self,
            buffer,
            next: 0,
        }
    }
}

impl fmt::Display for Signature<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (&p, &m)) in self.pattern.iter().zip(self.mask).enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            if m == 0 {
                write!(f, "??")?;
            } else {
                write!(f, "{}", hex::encode_upper([p]))?;
            }
        }
        Ok(())
    }
}

/// Iterator over successive matches of a signature.
#[derive(Debug, Clone)]
pub struct Matches<'a, 'b> {
    signature: Signature<'a>,
    buffer: &'b [u8],
    next: usize,
}

impl Iterator for Matches<'_, '_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let found = self.signature.find(self.buffer, self.next)?;
        self.next = found + 1;
        Some(found)
    }
}

/// Find the lowest `i >= start` where `pattern` matches `buffer` under `mask`.
///
/// Returns `None` when nothing matches, when the pattern is empty, or when
/// pattern and mask differ in length.
pub fn find(buffer: &[u8], start: usize, pattern: &[u8], mask: &[u8]) -> Option<usize> {
    if pattern.is_empty() || pattern.len() != mask.len() {
        return None;
    }
    let last = buffer.len().checked_sub(pattern.len())?;
    if start > last {
        return None;
    }

    let matches_at = |i: usize| {
        pattern
            .iter()
            .zip(mask)
            .zip(&buffer[i..])
            .all(|((&p, &m), &b)| m == 0 || b == p)
    };

    // Anchor the scan on the first fixed byte so memchr can skip ahead
    let Some(pivot) = mask.iter().position(|&m| m != 0) else {
        return Some(start);
    };
    let haystack = &buffer[start + pivot..=last + pivot];
    memchr::memchr_iter(pattern[pivot], haystack)
        .map(|offset| start + offset)
        .find(|&i| matches_at(i))
}
