//! Firmware identification strings.
//!
//! EDC16 images carry an ASCII block around an `"EDC  "` marker holding the
//! hardware part number, an info string and the software number. Values
//! are read from fixed windows relative to the first marker.

use serde::Serialize;

use crate::family::IdentMarkers;
use crate::signature::Signature;

const INFO_BACK: usize = 8;
const INFO_LEN: usize = 12;
const PART_NUMBER_BACK: usize = 20;
const PART_NUMBER_LEN: usize = 12;
const SOFTWARE_NUMBER_LEN: usize = 8;

/// Identification strings of one image. Absent values were not found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FirmwareIdent {
    /// Free-form info string before the marker
    pub info: Option<String>,
    /// Hardware part number
    pub part_number: Option<String>,
    /// Software number following the marker, spaces removed
    pub software_number: Option<String>,
    /// Controller version string
    pub ecu_version: Option<String>,
}

impl FirmwareIdent {
    /// Whether nothing was found.
    pub fn is_empty(&self) -> bool {
        self.info.is_none()
            && self.part_number.is_none()
            && self.software_number.is_none()
            && self.ecu_version.is_none()
    }
}

/// Extract every identification string.
pub fn extract(data: &[u8], markers: &IdentMarkers) -> FirmwareIdent {
    let ident = FirmwareIdent {
        info: info(data, &markers.info),
        part_number: part_number(data, &markers.info),
        software_number: software_number(data, &markers.info),
        ecu_version: ecu_version(data, &markers.version),
    };
    tracing::debug!(?ident, "identification extracted");
    ident
}

/// Info string, 12 bytes starting 8 bytes before the marker.
pub fn info(data: &[u8], marker: &Signature<'_>) -> Option<String> {
    let at = marker.find(data, 0)?;
    window(data, at.checked_sub(INFO_BACK)?, INFO_LEN)
}

/// Hardware part number, 12 bytes starting 20 bytes before the marker.
pub fn part_number(data: &[u8], marker: &Signature<'_>) -> Option<String> {
    let at = marker.find(data, 0)?;
    window(data, at.checked_sub(PART_NUMBER_BACK)?, PART_NUMBER_LEN)
}

/// Software number, 8 bytes directly after the marker with spaces removed.
pub fn software_number(data: &[u8], marker: &Signature<'_>) -> Option<String> {
    let at = marker.find(data, 0)?;
    let raw = window(data, at + marker.len(), SOFTWARE_NUMBER_LEN)?;
    let compact: String = raw.chars().filter(|&c| c != ' ').collect();
    Some(compact)
}

/// Controller version string: the version marker itself.
pub fn ecu_version(data: &[u8], marker: &Signature<'_>) -> Option<String> {
    let at = marker.find(data, 0)?;
    window(data, at, marker.len())
}

/// Read `len` bytes at `start` as ASCII, trimmed. Empty results are absent.
fn window(data: &[u8], start: usize, len: usize) -> Option<String> {
    let bytes = data.get(start..start.checked_add(len)?)?;
    let text: String = bytes
        .iter()
        .map(|&b| if b.is_ascii() { char::from(b) } else { '?' })
        .collect();
    let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
