//! Value sampling over a symbol's axes and data block.
//!
//! All samples are big-endian unsigned 16-bit words read consecutively
//! from the start of the array. Samples that would fall outside the image
//! are not produced.

use byteorder::{BigEndian, ByteOrder};

use crate::types::Symbol;

/// Which array of a table to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
    /// X-axis breakpoints
    X,
    /// Y-axis breakpoints
    Y,
    /// Data block
    Z,
}

/// Iterate over the samples of one plane.
pub fn samples<'a>(data: &'a [u8], symbol: &Symbol, plane: Plane) -> impl Iterator<Item = u16> + 'a {
    let (address, count) = match plane {
        Plane::X => (symbol.x_axis.address, symbol.x_axis.length),
        Plane::Y => (symbol.y_axis.address, symbol.y_axis.length),
        Plane::Z => (symbol.data_address, symbol.length / 2),
    };
    let end = address.saturating_add(count * 2).min(data.len());
    data.get(address..end)
        .unwrap_or(&[])
        .chunks_exact(2)
        .map(BigEndian::read_u16)
}

/// Largest sample in a plane, 0 when the plane is empty.
pub fn max_value(data: &[u8], symbol: &Symbol, plane: Plane) -> u16 {
    samples(data, symbol, plane).max().unwrap_or(0)
}

/// Whether samples never decrease and every step lies in `[min_step, max_step]`.
///
/// Steps are measured in raw sample units.
pub fn is_monotonic(data: &[u8], symbol: &Symbol, plane: Plane, min_step: f64, max_step: f64) -> bool {
    let mut previous: Option<u16> = None;
    for value in samples(data, symbol, plane) {
        if let Some(last) = previous {
            if last > value {
                return false;
            }
            let step = f64::from(value - last);
            if step < min_step || step > max_step {
                return false;
            }
        }
        previous = Some(value);
    }
    true
}

/// Whether every data sample equals the first one.
pub fn is_flat(data: &[u8], symbol: &Symbol) -> bool {
    let mut values = samples(data, symbol, Plane::Z);
    match values.next() {
        Some(first) => values.all(|v| v == first),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lay out a table at offset 0: header, axes, data.
    fn image(x: &[u16], y: &[u16], z: &[u16]) -> (Vec<u8>, Symbol) {
        let mut data = Vec::new();
        data.extend_from_slice(&(x.len() as u16).to_be_bytes());
        data.extend_from_slice(&(y.len() as u16).to_be_bytes());
        for v in x.iter().chain(y).chain(z) {
            data.extend_from_slice(&v.to_be_bytes());
        }
        (data, Symbol::table(4, x.len(), y.len()))
    }

    #[test]
    fn test_max_per_plane() {
        let (data, sym) = image(&[1, 900, 3], &[7, 8], &[5, 6, 0xFFFE, 1, 2, 3]);
        assert_eq!(max_value(&data, &sym, Plane::X), 900);
        assert_eq!(max_value(&data, &sym, Plane::Y), 8);
        assert_eq!(max_value(&data, &sym, Plane::Z), 0xFFFE);
    }

    #[test]
    fn test_monotonic_step_band() {
        let (data, sym) = image(&[100, 150, 250, 1250], &[1], &[0; 4]);
        assert!(is_monotonic(&data, &sym, Plane::X, 50.0, 1000.0));
        assert!(!is_monotonic(&data, &sym, Plane::X, 60.0, 1000.0));
        assert!(!is_monotonic(&data, &sym, Plane::X, 50.0, 999.0));
    }

    #[test]
    fn test_monotonic_rejects_decrease() {
        let (data, sym) = image(&[100, 200, 150], &[1], &[0; 3]);
        assert!(!is_monotonic(&data, &sym, Plane::X, 0.0, 1000.0));
    }

    #[test]
    fn test_monotonic_equal_steps_need_zero_min() {
        let (data, sym) = image(&[5, 5, 5], &[1], &[0; 3]);
        assert!(is_monotonic(&data, &sym, Plane::X, 0.0, 10.0));
        assert!(!is_monotonic(&data, &sym, Plane::X, 0.5, 10.0));
    }

    #[test]
    fn test_flatness() {
        let (data, sym) = image(&[1, 2], &[1, 2], &[0, 0, 0, 0]);
        assert!(is_flat(&data, &sym));
        let (data, sym) = image(&[1, 2], &[1, 2], &[7, 7, 7, 7]);
        assert!(is_flat(&data, &sym));
        let (data, sym) = image(&[1, 2], &[1, 2], &[7, 7, 7, 8]);
        assert!(!is_flat(&data, &sym));
    }

    #[test]
    fn test_truncated_plane_is_clipped() {
        let (mut data, sym) = image(&[1, 2], &[1, 2], &[9, 9, 9, 10]);
        data.truncate(data.len() - 2);
        assert_eq!(samples(&data, &sym, Plane::Z).count(), 3);
        assert!(is_flat(&data, &sym));
    }
}
