//! Structural table scanner.
//!
//! EDC16 firmware stores calibration tables as
//!
//! ```text
//! LL LL  LL LL  X[len1]  Y[len2]  DATA[len1 * len2]
//! ```
//!
//! where both length fields and every element are big-endian 16-bit words.
//! Nothing else marks a table, so the scanner proposes a candidate at every
//! aligned offset whose two length fields are small and non-zero, then skips
//! over the region the candidate claims.

use byteorder::{BigEndian, ByteOrder};

use crate::types::Symbol;

/// Bytes at the end of the image that are never used as a header.
pub const SCAN_TAIL: usize = 32;

/// Bytes occupied by the two length fields.
pub const HEADER_LEN: usize = 4;

/// Iterator over candidate tables in an image.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    data: &'a [u8],
    max_axis_len: usize,
    cursor: usize,
}

impl<'a> Scanner<'a> {
    /// Scan `data`, accepting length fields in `1..max_axis_len`.
    pub fn new(data: &'a [u8], max_axis_len: usize) -> Self {
        Self {
            data,
            max_axis_len,
            cursor: 0,
        }
    }

    fn end(&self) -> usize {
        self.data.len().saturating_sub(SCAN_TAIL)
    }
}

impl Iterator for Scanner<'_> {
    type Item = Symbol;

    fn next(&mut self) -> Option<Symbol> {
        while self.cursor < self.end() {
            let t = self.cursor;
            let header = probe(self.data, t, self.max_axis_len);
            let skip = header.map_or(0, |(len1, len2)| aligned_skip(len1, len2));
            self.cursor = t + skip + 2;

            // a data block may run past the end of the image; samples are clipped
            if let Some((len1, len2)) = header {
                return Some(Symbol::table(t + HEADER_LEN, len1, len2));
            }
        }
        None
    }
}

/// Read the two length fields at `t` and test them.
pub fn probe(data: &[u8], t: usize, max_axis_len: usize) -> Option<(usize, usize)> {
    let header = data.get(t..t + HEADER_LEN)?;
    let len1 = usize::from(BigEndian::read_u16(&header[0..2]));
    let len2 = usize::from(BigEndian::read_u16(&header[2..4]));
    let plausible = |len: usize| len > 0 && len < max_axis_len;
    (plausible(len1) && plausible(len2)).then_some((len1, len2))
}

/// Bytes to skip after a candidate, kept even so the scan stays 16-bit aligned.
pub fn aligned_skip(len1: usize, len2: usize) -> usize {
    let skip = (len1 + len2) * 2 + len1 * len2 * 2;
    if skip % 2 == 0 {
        skip
    } else if skip > 2 {
        skip - 1
    } else {
        skip + 1
    }
}

/// Collect every candidate in `data`.
pub fn scan(data: &[u8], max_axis_len: usize) -> Vec<Symbol> {
    Scanner::new(data, max_axis_len).collect()
}
