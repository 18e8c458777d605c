//! Encoded polyline codec.
//!
//! Implements the classic signed-delta polyline encoding: every coordinate is
//! scaled by 1e5, delta-encoded against the previous point, zig-zag encoded,
//! and written as little-endian 5-bit groups offset by 63, where `0x20` marks
//! a continuation.
//!
//! This is the only polyline implementation in the crate. Every route on both
//! roles is decoded through [`decode`].
//!
//! # Example
//!
//! ```
//! use ambulink::polyline;
//!
//! let points = polyline::decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
//! assert_eq!(points.len(), 3);
//! assert!((points[0].latitude - 38.5).abs() < 1e-9);
//! assert!(polyline::decode("").unwrap().is_empty());
//! ```

use thiserror::Error;

use crate::model::LatLng;

/// Fixed-point scale of the encoding.
const PRECISION: f64 = 1e5;

/// Offset added to every 5-bit group so the output stays printable.
const CHAR_OFFSET: u8 = 63;

/// Continuation flag inside a 5-bit group.
const CONTINUATION: u8 = 0x20;

/// Longest group sequence a 64-bit value can need.
const MAX_SHIFT: u32 = 60;

/// Errors raised while decoding a polyline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolylineError {
    /// A byte outside the `'?'..='~'` alphabet.
    #[error("Invalid polyline character {byte:#04x} at offset {offset}")]
    InvalidCharacter { byte: u8, offset: usize },

    /// The input ended in the middle of a value or a coordinate pair.
    #[error("Polyline truncated at offset {offset}")]
    Truncated { offset: usize },

    /// A value used more groups than fit in 64 bits, or a running
    /// coordinate left the `i64` range.
    #[error("Polyline value overflows at offset {offset}")]
    Overflow { offset: usize },
}

/// Decode an encoded polyline into its points.
///
/// An empty string decodes to an empty sequence.
pub fn decode(encoded: &str) -> Result<Vec<LatLng>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::with_capacity(bytes.len() / 4);
    let mut index = 0;
    let mut latitude: i64 = 0;
    let mut longitude: i64 = 0;

    while index < bytes.len() {
        latitude = accumulate(latitude, bytes, &mut index)?;
        longitude = accumulate(longitude, bytes, &mut index)?;
        points.push(LatLng::new(
            latitude as f64 / PRECISION,
            longitude as f64 / PRECISION,
        ));
    }

    Ok(points)
}

/// Encode points with the classic algorithm.
pub fn encode(points: &[LatLng]) -> String {
    let mut out = String::with_capacity(points.len() * 8);
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for point in points {
        let lat = scale(point.latitude);
        let lng = scale(point.longitude);
        push_value(&mut out, lat - prev_lat);
        push_value(&mut out, lng - prev_lng);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn scale(degrees: f64) -> i64 {
    (degrees * PRECISION).round() as i64
}

/// Add the next delta to a running coordinate.
fn accumulate(total: i64, bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let offset = *index;
    let delta = next_value(bytes, index)?;
    total
        .checked_add(delta)
        .ok_or(PolylineError::Overflow { offset })
}

/// Read one zig-zag encoded value starting at `index`.
fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let offset = *index;
        let byte = *bytes
            .get(offset)
            .ok_or(PolylineError::Truncated { offset })?;
        if !(CHAR_OFFSET..=b'~').contains(&byte) {
            return Err(PolylineError::InvalidCharacter { byte, offset });
        }
        if shift > MAX_SHIFT {
            return Err(PolylineError::Overflow { offset });
        }

        let group = byte - CHAR_OFFSET;
        result |= u64::from(group & 0x1f) << shift;
        shift += 5;
        *index += 1;

        if group < CONTINUATION {
            break;
        }
    }

    let value = (result >> 1) as i64;
    Ok(if result & 1 == 1 { !value } else { value })
}

fn push_value(out: &mut String, value: i64) {
    let mut v = (value << 1) as u64;
    if value < 0 {
        v = !v;
    }
    while v >= u64::from(CONTINUATION) {
        let group = (CONTINUATION as u64 | (v & 0x1f)) as u8;
        out.push(char::from(group + CHAR_OFFSET));
        v >>= 5;
    }
    out.push(char::from(v as u8 + CHAR_OFFSET));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn assert_close(actual: &LatLng, lat: f64, lng: f64) {
        assert!(
            (actual.latitude - lat).abs() < 1e-9 && (actual.longitude - lng).abs() < 1e-9,
            "expected ({lat}, {lng}), got {actual:?}"
        );
    }

    #[test]
    fn test_decode_reference_polyline() {
        let points = decode(REFERENCE).unwrap();
        assert_eq!(points.len(), 3);
        assert_close(&points[0], 38.5, -120.2);
        assert_close(&points[1], 40.7, -120.95);
        assert_close(&points[2], 43.252, -126.453);
    }

    #[test]
    fn test_encode_reference_points() {
        let points = [
            LatLng::new(38.5, -120.2),
            LatLng::new(40.7, -120.95),
            LatLng::new(43.252, -126.453),
        ];
        assert_eq!(encode(&points), REFERENCE);
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode(""), Ok(vec![]));
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn test_decode_origin() {
        let points = decode("??").unwrap();
        assert_eq!(points, vec![LatLng::new(0.0, 0.0)]);
    }

    #[test]
    fn test_decode_truncated_value() {
        assert_eq!(decode("_"), Err(PolylineError::Truncated { offset: 1 }));
    }

    #[test]
    fn test_decode_missing_longitude() {
        // A complete latitude with no longitude following it.
        assert_eq!(decode("_p~iF"), Err(PolylineError::Truncated { offset: 5 }));
    }

    #[test]
    fn test_decode_invalid_character() {
        assert_eq!(
            decode("_p~iF ps|U"),
            Err(PolylineError::InvalidCharacter {
                byte: b' ',
                offset: 5
            })
        );
    }

    #[test]
    fn test_decode_overflow() {
        let encoded = "~".repeat(20);
        assert!(matches!(
            decode(&encoded),
            Err(PolylineError::Overflow { .. })
        ));
    }

    #[test]
    fn test_decode_running_sum_overflow() {
        // Each value is valid on its own; the second latitude pushes the
        // running sum past the i64 range.
        let value = "~".repeat(12) + "^";
        let encoded = value.repeat(4);
        assert_eq!(
            decode(&encoded),
            Err(PolylineError::Overflow { offset: 2 * value.len() })
        );
    }

    proptest! {
        /// Property: decoding an encoded sequence reproduces it within the 1e-5 grid.
        #[test]
        fn prop_round_trip_within_precision(
            coords in proptest::collection::vec((-90.0f64..90.0f64, -180.0f64..180.0f64), 0..64)
        ) {
            let points: Vec<LatLng> = coords.iter().map(|&(lat, lng)| LatLng::new(lat, lng)).collect();
            let decoded = decode(&encode(&points)).unwrap();

            prop_assert_eq!(decoded.len(), points.len());
            for (original, round_tripped) in points.iter().zip(&decoded) {
                prop_assert!((original.latitude - round_tripped.latitude).abs() <= 1e-5);
                prop_assert!((original.longitude - round_tripped.longitude).abs() <= 1e-5);
            }
        }
    }
}
