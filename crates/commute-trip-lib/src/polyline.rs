//! Encoded Polyline Algorithm Format at 5 decimal digits
//!
//! Coordinates are floored to integers at 1e5 precision, delta-encoded against the
//! previous point, zig-zag folded and emitted as 5-bit chunks offset by 63. The decoder
//! is the exact inverse and is used to verify exported artifacts.

use crate::{Result, TripError};

/// Scale factor for 5 decimal digits
const PRECISION: f64 = 1e5;

/// Offset added to every emitted chunk to land in printable ASCII
const CHAR_OFFSET: u64 = 63;

/// Continuation bit of a 5-bit chunk
const CONTINUATION: u64 = 0x20;

/// Payload mask of a 5-bit chunk
const CHUNK_MASK: u64 = 0x1f;

/// Encode an ordered sequence of `(lat, lon)` pairs
///
/// An empty sequence encodes to the empty string.
pub fn encode<I>(points: I) -> String
where
    I: IntoIterator<Item = (f64, f64)>,
{
    #[cfg(feature = "profiling")]
    profiling::scope!("polyline::encode");

    let mut encoded = String::new();
    let mut last_lat: i64 = 0;
    let mut last_lon: i64 = 0;

    for (lat, lon) in points {
        let lat = scale(lat);
        let lon = scale(lon);
        encode_signed(lat.wrapping_sub(last_lat), &mut encoded);
        encode_signed(lon.wrapping_sub(last_lon), &mut encoded);
        last_lat = lat;
        last_lon = lon;
    }

    encoded
}

/// Decode a polyline back into `(lat, lon)` pairs
pub fn decode(encoded: &str) -> Result<Vec<(f64, f64)>> {
    let mut points = Vec::new();
    let mut bytes = encoded.bytes().enumerate().peekable();
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;

    while bytes.peek().is_some() {
        lat = accumulate(lat, decode_signed(&mut bytes)?)?;
        if bytes.peek().is_none() {
            return Err(TripError::InvalidPolyline(
                "latitude without matching longitude".to_string(),
            ));
        }
        lon = accumulate(lon, decode_signed(&mut bytes)?)?;
        points.push((lat as f64 / PRECISION, lon as f64 / PRECISION));
    }

    Ok(points)
}

fn accumulate(total: i64, delta: i64) -> Result<i64> {
    total
        .checked_add(delta)
        .ok_or_else(|| TripError::InvalidPolyline("coordinate out of range".to_string()))
}

/// Saturates on overflow; NaN becomes 0
#[inline]
fn scale(coordinate: f64) -> i64 {
    (coordinate * PRECISION).floor() as i64
}

fn encode_signed(delta: i64, out: &mut String) {
    let mut folded = delta << 1;
    if delta < 0 {
        folded = !folded;
    }
    encode_unsigned(folded as u64, out);
}

fn encode_unsigned(mut value: u64, out: &mut String) {
    while value >= CONTINUATION {
        out.push(char::from(((CONTINUATION | (value & CHUNK_MASK)) + CHAR_OFFSET) as u8));
        value >>= 5;
    }
    out.push(char::from((value + CHAR_OFFSET) as u8));
}

fn decode_signed<I>(bytes: &mut I) -> Result<i64>
where
    I: Iterator<Item = (usize, u8)>,
{
    let mut result: u64 = 0;
    let mut shift = 0u32;

    loop {
        let (position, byte) = bytes.next().ok_or_else(|| {
            TripError::InvalidPolyline("truncated value at end of input".to_string())
        })?;
        if !(b'?'..=b'~').contains(&byte) {
            return Err(TripError::InvalidPolyline(format!(
                "unexpected character {:?} at {}",
                byte as char, position
            )));
        }
        let chunk = u64::from(byte) - CHAR_OFFSET;
        // Only 4 payload bits fit at shift 60, and nothing may follow them
        if shift > 60 || (shift == 60 && chunk > 0xf) {
            return Err(TripError::InvalidPolyline(format!(
                "value too long at {}",
                position
            )));
        }

        result |= (chunk & CHUNK_MASK) << shift;
        shift += 5;

        if chunk < CONTINUATION {
            break;
        }
    }

    let magnitude = (result >> 1) as i64;
    Ok(if result & 1 == 1 { !magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[(f64, f64)], expected: &[(f64, f64)]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a.0 - e.0).abs() <= 1e-5, "lat {} vs {}", a.0, e.0);
            assert!((a.1 - e.1).abs() <= 1e-5, "lon {} vs {}", a.1, e.1);
        }
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode(Vec::new()), "");
    }

    #[test]
    fn test_encode_single_zero_point() {
        assert_eq!(encode([(0.0, 0.0)]), "??");
    }

    #[test]
    fn test_encode_reference_line() {
        // Reference line from the format documentation. Its coordinates are exact at 1e5
        // so flooring matches the usual rounding encoders.
        let points = [(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)];
        assert_eq!(encode(points), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }

    #[test]
    fn test_encode_floors_instead_of_rounding() {
        // 0.000019 * 1e5 = 1.9 floors to 1; -0.000011 * 1e5 = -1.1 floors to -2
        assert_eq!(encode([(0.000019, 0.0)]), encode([(0.00001, 0.0)]));
        assert_eq!(encode([(0.0, -0.000011)]), encode([(0.0, -0.00002)]));
    }

    #[test]
    fn test_encode_is_stateless_across_calls() {
        let points = [(29.7, -95.4), (29.71, -95.39)];
        assert_eq!(encode(points), encode(points));
    }

    #[test]
    fn test_decode_reference_line() {
        let decoded = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        assert_close(
            &decoded,
            &[(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)],
        );
    }

    #[test]
    fn test_roundtrip_commute() {
        let points: Vec<(f64, f64)> = (0..200)
            .map(|i| {
                let t = i as f64 / 200.0;
                (29.7604 + t * 0.05 + (t * 40.0).sin() * 0.001, -95.3698 - t * 0.08)
            })
            .collect();

        let decoded = decode(&encode(points.iter().copied())).unwrap();
        assert_close(&decoded, &points);
    }

    #[test]
    fn test_roundtrip_extremes() {
        let points = [(90.0, 180.0), (-90.0, -180.0), (0.0, 0.0), (-0.00001, 0.00001)];
        let decoded = decode(&encode(points)).unwrap();
        assert_close(&decoded, &points);
    }

    #[test]
    fn test_encode_extreme_coordinates() {
        let encoded = encode([(1e15, 0.0), (-1e15, 0.0), (f64::INFINITY, f64::NAN)]);
        assert!(!encoded.is_empty());
        assert!(encoded.bytes().all(|b| (b'?'..=b'~').contains(&b)));
    }

    #[test]
    fn test_decode_rejects_overlong_value() {
        // Thirteen full chunks: the last one at shift 60 carries a fifth payload bit
        let overlong = format!("{}~?", "~".repeat(12));
        assert!(matches!(
            decode(&overlong),
            Err(TripError::InvalidPolyline(_))
        ));
        // Fourteen chunks never fit
        let too_many = format!("{}??", "_".repeat(14));
        assert!(decode(&too_many).is_err());
    }

    #[test]
    fn test_decode_rejects_accumulated_overflow() {
        // Two latitude deltas of i64::MAX each, longitudes zero
        let mut max_delta = String::new();
        encode_signed(i64::MAX, &mut max_delta);
        let crafted = format!("{max_delta}?{max_delta}?");
        assert!(matches!(
            decode(&crafted),
            Err(TripError::InvalidPolyline(_))
        ));
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_bad_character() {
        assert!(matches!(
            decode("_p~iF ps|U"),
            Err(TripError::InvalidPolyline(_))
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        // Continuation chunk with nothing after it
        assert!(decode("_").is_err());
        // Latitude without longitude
        assert!(decode("?").is_err());
    }
}
