//! Code-bank resolution.
//!
//! EDC16-class controllers mirror their calibration data into two flash
//! regions. A bank id lets same-shaped tables from the two mirrors be told
//! apart and numbered independently.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyzerError, Result};

/// Logical calibration bank of a flash address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeBank(pub u8);

impl CodeBank {
    /// Bootloader / program code below the calibration area.
    pub const CODE: CodeBank = CodeBank(0);
    /// Lower calibration mirror.
    pub const PRIMARY: CodeBank = CodeBank(1);
    /// Upper calibration mirror.
    pub const MIRROR: CodeBank = CodeBank(2);

    /// Whether this bank holds calibration data.
    pub fn is_calibration(self) -> bool {
        self != Self::CODE
    }
}

impl fmt::Display for CodeBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Codeblock {}", self.0)
    }
}

/// Address thresholds splitting an image into code banks.
///
/// `[0, low)` resolves to bank 0, `[low, high)` to bank 1 and
/// everything from `high` upward to bank 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankLayout {
    /// First address of the calibration area
    pub low: usize,
    /// First address of the mirrored calibration bank
    pub high: usize,
}

impl BankLayout {
    /// Create a layout, rejecting thresholds that are out of order.
    pub fn new(low: usize, high: usize) -> Result<Self> {
        let layout = Self { low, high };
        layout.validate()?;
        Ok(layout)
    }

    /// Check that `low <= high`.
    pub fn validate(&self) -> Result<()> {
        if self.low > self.high {
            return Err(AnalyzerError::InvalidBankLayout {
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }

    /// Resolve the bank an address lives in.
    pub fn resolve(&self, address: usize) -> CodeBank {
        if address < self.low {
            CodeBank::CODE
        } else if address >= self.high {
            CodeBank::MIRROR
        } else {
            CodeBank::PRIMARY
        }
    }
}
