//! Encoded polyline codec and line simplification.
//!
//! Implements the Google encoded polyline algorithm (signed deltas,
//! 5-bit chunks offset by 63, continuation bit 0x20, precision 1e5)
//! so that geometry from external routing providers can be consumed
//! directly, plus Ramer-Douglas-Peucker simplification.

use thiserror::Error;

use crate::geo::{distance_point_to_segment_m, Coordinate};

/// Fixed-point precision of the encoded format (5 decimal places).
const PRECISION: f64 = 1e5;

/// Offset added to every 5-bit chunk to land in printable ASCII.
const CHUNK_OFFSET: u8 = 63;

/// Set on every chunk except the last one of a value.
const CONTINUATION_BIT: u64 = 0x20;

const CHUNK_MASK: u64 = 0x1f;

/// Failure to decode an encoded polyline.
///
/// Distinct from a successfully decoded empty polyline: callers must
/// treat any of these as "no usable route data".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ended in the middle of a continuation run.
    #[error("polyline truncated: value starting at byte {offset} is unterminated")]
    Truncated { offset: usize },

    /// A byte outside the encoded alphabet (63..=126).
    #[error("invalid polyline byte 0x{byte:02x} at offset {offset}")]
    InvalidByte { offset: usize, byte: u8 },

    /// A latitude delta without its longitude pair.
    #[error("polyline truncated: latitude at byte {offset} has no longitude")]
    MissingLongitude { offset: usize },

    /// A value that does not fit in 64 bits, or a running sum that
    /// leaves the `i64` range.
    #[error("polyline value starting at byte {offset} overflows")]
    Overflow { offset: usize },
}

/// Decode an encoded polyline into coordinates.
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, DecodeError> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;
    let mut coordinates = Vec::new();

    while index < bytes.len() {
        let lat_offset = index;
        lat = lat
            .checked_add(read_value(bytes, &mut index)?)
            .ok_or(DecodeError::Overflow { offset: lat_offset })?;

        if index >= bytes.len() {
            return Err(DecodeError::MissingLongitude { offset: lat_offset });
        }
        let lon_offset = index;
        lon = lon
            .checked_add(read_value(bytes, &mut index)?)
            .ok_or(DecodeError::Overflow { offset: lon_offset })?;

        coordinates.push(Coordinate::new(
            lat as f64 / PRECISION,
            lon as f64 / PRECISION,
        ));
    }

    Ok(coordinates)
}

/// Encode coordinates as a polyline string.
///
/// The first point is encoded relative to (0, 0), every following
/// point relative to its predecessor after rounding to 1e-5 degrees.
pub fn encode(coordinates: &[Coordinate]) -> String {
    let mut out = String::with_capacity(coordinates.len() * 8);
    let mut prev_lat: i64 = 0;
    let mut prev_lon: i64 = 0;

    for c in coordinates {
        let lat = (c.latitude * PRECISION).round() as i64;
        let lon = (c.longitude * PRECISION).round() as i64;

        write_value(lat - prev_lat, &mut out);
        write_value(lon - prev_lon, &mut out);

        prev_lat = lat;
        prev_lon = lon;
    }

    out
}

/// Read one zig-zag encoded signed value starting at `*index`.
fn read_value(bytes: &[u8], index: &mut usize) -> Result<i64, DecodeError> {
    let start = *index;
    let mut result: u64 = 0;
    let mut shift = 0u32;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(DecodeError::Truncated { offset: start });
        };
        if !(CHUNK_OFFSET..=126).contains(&byte) {
            return Err(DecodeError::InvalidByte { offset: *index, byte });
        }
        let chunk = u64::from(byte - CHUNK_OFFSET);
        // Only four bits of the thirteenth chunk fit in 64.
        if shift > 60 || (shift == 60 && (chunk & CHUNK_MASK) > 0x0f) {
            return Err(DecodeError::Overflow { offset: start });
        }
        *index += 1;

        result |= (chunk & CHUNK_MASK) << shift;
        shift += 5;

        if chunk & CONTINUATION_BIT == 0 {
            break;
        }
    }

    let value = if result & 1 == 1 {
        !(result >> 1) as i64
    } else {
        (result >> 1) as i64
    };
    Ok(value)
}

fn write_value(value: i64, out: &mut String) {
    let mut v = ((value << 1) ^ (value >> 63)) as u64;

    while v >= CONTINUATION_BIT {
        out.push(char::from((((v & CHUNK_MASK) | CONTINUATION_BIT) as u8) + CHUNK_OFFSET));
        v >>= 5;
    }
    out.push(char::from(v as u8 + CHUNK_OFFSET));
}

/// Ramer-Douglas-Peucker line simplification.
///
/// `tolerance_m` controls simplification aggressiveness. Typical values:
/// - 10.0: light simplification, keeps most detail
/// - 50.0: moderate, good for maneuver waypoints
/// - 100.0: aggressive, only major direction changes
///
/// Both endpoints are always kept unchanged.
pub fn simplify(points: &[Coordinate], tolerance_m: f64) -> Vec<Coordinate> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = &points[0];
    let last = &points[points.len() - 1];

    // Find the point with maximum distance from the chord
    let mut max_dist = 0.0;
    let mut max_idx = 0;

    for (i, p) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let dist = distance_point_to_segment_m(p, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_idx = i;
        }
    }

    if max_dist > tolerance_m {
        let mut left = simplify(&points[..=max_idx], tolerance_m);
        let right = simplify(&points[max_idx..], tolerance_m);

        // Split point appears at the end of left and the start of right
        left.pop();
        left.extend(right);
        left
    } else {
        vec![*first, *last]
    }
}
