//! # Numeric Range Addressing
//!
//! Sub-range selection for array-valued data, as used by partial reads,
//! partial writes and overlap checks between concurrent accesses.
//!
//! ## Grammar
//! ```text
//! range  := side | side "," side        (array or matrix)
//! side   := index | index ":" index     (single value or inclusive range)
//! index  := [0-9]+
//! ```
//!
//! Anything else parses to [`NumericRange::Invalid`], keeping the original
//! text. A range side must satisfy `low < high`, so `"3:3"` is invalid even
//! though it names a single element.

use crate::services::status::StatusCode;
use crate::services::variant::{ArrayValue, Variant};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

const EMPTY_TEXT: &str = "NumericRange:<Empty>";
const INVALID_TEXT: &str = "NumericRange:<Invalid>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumericRange {
    /// No range: the whole value.
    Empty,
    SingleValue(u32),
    /// Inclusive `low..=high`, `low < high`.
    ArrayRange(u32, u32),
    /// Row and column ranges, each inclusive; a single index is stored as
    /// `(n, n)`.
    MatrixRange((u32, u32), (u32, u32)),
    /// Unparseable or out-of-order text, kept for diagnostics.
    Invalid(String),
}

/// Values selected by [`NumericRange::extract_values`].
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub values: ArrayValue,
    pub status: StatusCode,
}

impl Extracted {
    fn good(values: ArrayValue) -> Self {
        Self {
            values,
            status: StatusCode::GOOD,
        }
    }

    fn bad(source: &ArrayValue, status: StatusCode) -> Self {
        Self {
            values: source.empty_like(),
            status,
        }
    }
}

fn valid_range(low: u32, high: u32) -> bool {
    low < high
}

/// One side of a range, or `None` if it does not parse.
fn parse_side(text: &str) -> Option<(u32, u32)> {
    match text.split_once(':') {
        None => {
            let n = text.parse().ok()?;
            Some((n, n))
        }
        Some((low, high)) => {
            let low = low.parse().ok()?;
            let high = high.parse().ok()?;
            valid_range(low, high).then_some((low, high))
        }
    }
}

impl NumericRange {
    pub fn single(index: u32) -> Self {
        NumericRange::SingleValue(index)
    }

    /// Array range, or `Invalid` unless `low < high`.
    pub fn range(low: u32, high: u32) -> Self {
        if valid_range(low, high) {
            NumericRange::ArrayRange(low, high)
        } else {
            NumericRange::Invalid(format!("{low}:{high}"))
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, NumericRange::Invalid(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, NumericRange::Empty)
    }

    /// Neither empty nor invalid.
    pub fn is_defined(&self) -> bool {
        self.is_valid() && !self.is_empty()
    }

    /// Text to put on the wire: `None` for an empty range, the original
    /// text for an invalid one.
    pub fn to_encodeable_string(&self) -> Option<String> {
        match self {
            NumericRange::Empty => None,
            NumericRange::Invalid(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Inclusive bounds addressed by a one-dimensional range.
    fn bounds(&self) -> Option<(usize, usize)> {
        match *self {
            NumericRange::SingleValue(n) => Some((n as usize, n as usize)),
            NumericRange::ArrayRange(low, high) => Some((low as usize, high as usize)),
            _ => None,
        }
    }

    /// Select the addressed elements of `source`.
    ///
    /// The high end of an array range is clamped to the last element; a low
    /// end past the end yields `BadIndexRangeNoData`. A matrix range needs a
    /// list of arrays.
    pub fn extract_values(&self, source: &ArrayValue) -> Extracted {
        match self {
            NumericRange::Empty => Extracted::good(source.clone()),
            NumericRange::SingleValue(_) | NumericRange::ArrayRange(..) => {
                let Some((low, high)) = self.bounds() else {
                    return Extracted::bad(source, StatusCode::BAD_INDEX_RANGE_INVALID);
                };
                extract_array_range(source, low, high)
            }
            NumericRange::MatrixRange(rows, cols) => extract_matrix_range(source, *rows, *cols),
            NumericRange::Invalid(_) => Extracted::bad(source, StatusCode::BAD_INDEX_RANGE_INVALID),
        }
    }

    /// Overwrite the addressed elements of `target` with `new_values`.
    ///
    /// Bounds are checked first (`BadIndexRangeNoData`), then the number of
    /// values (`BadIndexRangeInvalid`), then the representation
    /// (`BadTypeMismatch`). An empty range replaces the whole target with
    /// any number of values. Matrix writes are not supported and report
    /// `BadIndexRangeNoData`. `target` is untouched unless the result is
    /// good.
    pub fn set_values(&self, target: &mut ArrayValue, new_values: &ArrayValue) -> StatusCode {
        let (low, high) = match self {
            NumericRange::Empty => {
                if target.is_empty() {
                    return StatusCode::BAD_INDEX_RANGE_NO_DATA;
                }
                (0, target.len() - 1)
            }
            NumericRange::SingleValue(_) | NumericRange::ArrayRange(..) => match self.bounds() {
                Some(b) => b,
                None => return StatusCode::BAD_INDEX_RANGE_INVALID,
            },
            NumericRange::MatrixRange(..) => return StatusCode::BAD_INDEX_RANGE_NO_DATA,
            NumericRange::Invalid(_) => return StatusCode::BAD_INDEX_RANGE_INVALID,
        };

        if high >= target.len() || low >= target.len() {
            return StatusCode::BAD_INDEX_RANGE_NO_DATA;
        }
        let whole = low == 0 && high == target.len() - 1;
        if !self.is_empty() && new_values.len() != high - low + 1 {
            return StatusCode::BAD_INDEX_RANGE_INVALID;
        }
        if !target.same_representation(new_values) {
            return StatusCode::BAD_TYPE_MISMATCH;
        }

        if whole {
            *target = new_values.clone();
            return StatusCode::GOOD;
        }
        write_in_place(target, low, high, new_values);
        StatusCode::GOOD
    }

    /// Whether two ranges may address a common element.
    ///
    /// An empty range means "everything" and overlaps anything. Invalid
    /// ranges overlap nothing.
    ///
    /// # Panics
    /// Panics if either side is a matrix range and neither is empty; matrix
    /// overlap is not implemented.
    pub fn overlaps(&self, other: &NumericRange) -> bool {
        use NumericRange::*;
        match (self, other) {
            (Empty, _) | (_, Empty) => true,
            (Invalid(_), _) | (_, Invalid(_)) => false,
            (MatrixRange(..), _) | (_, MatrixRange(..)) => {
                panic!("overlap of matrix ranges is not implemented: {self} / {other}")
            }
            (SingleValue(a), SingleValue(b)) => a == b,
            _ => match (self.bounds(), other.bounds()) {
                (Some((l1, h1)), Some((l2, h2))) => l1.max(l2) <= h1.min(h2),
                _ => false,
            },
        }
    }
}

fn extract_array_range(source: &ArrayValue, low: usize, high: usize) -> Extracted {
    if low >= source.len() {
        return Extracted::bad(source, StatusCode::BAD_INDEX_RANGE_NO_DATA);
    }
    let high = high.min(source.len() - 1);
    Extracted::good(source.slice(low, high + 1))
}

fn extract_matrix_range(source: &ArrayValue, rows: (u32, u32), cols: (u32, u32)) -> Extracted {
    let ArrayValue::List(outer) = source else {
        return Extracted::bad(source, StatusCode::BAD_INDEX_RANGE_NO_DATA);
    };
    if !matches!(outer.first(), Some(Variant::Array(_))) {
        return Extracted::bad(source, StatusCode::BAD_INDEX_RANGE_NO_DATA);
    }
    let selected = extract_array_range(source, rows.0 as usize, rows.1 as usize);
    if !selected.status.is_good() {
        return Extracted::bad(source, selected.status);
    }
    let ArrayValue::List(selected_rows) = selected.values else {
        return Extracted::bad(source, StatusCode::BAD_INDEX_RANGE_NO_DATA);
    };

    let mut out = Vec::with_capacity(selected_rows.len());
    for row in selected_rows {
        let Variant::Array(row) = row else {
            return Extracted::bad(source, StatusCode::BAD_INDEX_RANGE_NO_DATA);
        };
        // a short row contributes an empty array rather than failing the read
        let columns = extract_array_range(&row, cols.0 as usize, cols.1 as usize);
        out.push(Variant::Array(columns.values));
    }
    Extracted::good(ArrayValue::List(out))
}

/// Write `src` over `dst[low..=high]`. Representations and lengths are
/// already checked.
fn write_in_place(dst: &mut ArrayValue, low: usize, high: usize, src: &ArrayValue) {
    match (dst, src) {
        (ArrayValue::List(d), ArrayValue::List(s)) => {
            d.splice(low..=high, s.iter().cloned());
        }
        (ArrayValue::Int32(d), ArrayValue::Int32(s)) => d[low..=high].copy_from_slice(s),
        (ArrayValue::UInt32(d), ArrayValue::UInt32(s)) => d[low..=high].copy_from_slice(s),
        (ArrayValue::Float(d), ArrayValue::Float(s)) => d[low..=high].copy_from_slice(s),
        (ArrayValue::Double(d), ArrayValue::Double(s)) => d[low..=high].copy_from_slice(s),
        (ArrayValue::Bytes(d), ArrayValue::Bytes(s)) => {
            for (i, byte) in s.iter().enumerate() {
                d[low + i] = *byte;
            }
        }
        _ => {}
    }
}

impl FromStr for NumericRange {
    type Err = Infallible;

    /// Never fails: bad input becomes [`NumericRange::Invalid`].
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.is_empty() || text == EMPTY_TEXT {
            return Ok(NumericRange::Empty);
        }
        let invalid = || NumericRange::Invalid(text.to_string());
        if !text.bytes().all(|b| b.is_ascii_digit() || b == b':' || b == b',') {
            return Ok(invalid());
        }

        let parsed = match text.split(',').collect::<Vec<_>>().as_slice() {
            [side] => match parse_side(side) {
                Some((low, high)) if low == high && !side.contains(':') => {
                    NumericRange::SingleValue(low)
                }
                Some((low, high)) => NumericRange::ArrayRange(low, high),
                None => invalid(),
            },
            [rows, cols] => match (parse_side(rows), parse_side(cols)) {
                (Some(r), Some(c)) => NumericRange::MatrixRange(r, c),
                _ => invalid(),
            },
            _ => invalid(),
        };
        Ok(parsed)
    }
}

impl From<&str> for NumericRange {
    fn from(text: &str) -> Self {
        match text.parse() {
            Ok(range) => range,
            Err(never) => match never {},
        }
    }
}

fn fmt_side(f: &mut fmt::Formatter<'_>, (low, high): (u32, u32)) -> fmt::Result {
    if low == high {
        write!(f, "{low}")
    } else {
        write!(f, "{low}:{high}")
    }
}

impl fmt::Display for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericRange::Empty => f.write_str(EMPTY_TEXT),
            NumericRange::SingleValue(n) => write!(f, "{n}"),
            NumericRange::ArrayRange(low, high) => fmt_side(f, (*low, *high)),
            NumericRange::MatrixRange(rows, cols) => {
                fmt_side(f, *rows)?;
                f.write_str(",")?;
                fmt_side(f, *cols)
            }
            NumericRange::Invalid(_) => f.write_str(INVALID_TEXT),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ints(v: &[i32]) -> ArrayValue {
        ArrayValue::from(v.to_vec())
    }

    #[test]
    fn test_parse_shapes() {
        assert_eq!(NumericRange::from(""), NumericRange::Empty);
        assert_eq!(NumericRange::from(EMPTY_TEXT), NumericRange::Empty);
        assert_eq!(NumericRange::from("7"), NumericRange::SingleValue(7));
        assert_eq!(NumericRange::from("2:4"), NumericRange::ArrayRange(2, 4));
        assert_eq!(
            NumericRange::from("1:2,5"),
            NumericRange::MatrixRange((1, 2), (5, 5))
        );
    }

    #[test]
    fn test_parse_rejects() {
        for text in ["5:2", "3:3", "-1", "1:2:3", "1,2,3", "a", "1:", ":1", " 1", "1,2:2"] {
            assert_eq!(
                NumericRange::from(text),
                NumericRange::Invalid(text.to_string()),
                "{text}"
            );
        }
        assert!(!NumericRange::from("99999999999").is_valid());
    }

    #[test]
    fn test_display() {
        assert_eq!(NumericRange::from("2:4").to_string(), "2:4");
        assert_eq!(NumericRange::from("1:2,5").to_string(), "1:2,5");
        assert_eq!(NumericRange::Empty.to_string(), EMPTY_TEXT);
        assert_eq!(NumericRange::from("x").to_string(), INVALID_TEXT);
        assert_eq!(NumericRange::from("x").to_encodeable_string().as_deref(), Some("x"));
        assert_eq!(NumericRange::Empty.to_encodeable_string(), None);
    }

    #[test]
    fn test_extract_single_and_array() {
        let source = ints(&[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(
            NumericRange::from("2:3").extract_values(&source),
            Extracted::good(ints(&[3, 4]))
        );
        assert_eq!(
            NumericRange::from("6").extract_values(&source).values,
            ints(&[7])
        );
        // clamped at the high end
        assert_eq!(
            NumericRange::from("5:20").extract_values(&source).values,
            ints(&[6, 7])
        );
        assert_eq!(
            NumericRange::from("7").extract_values(&source).status,
            StatusCode::BAD_INDEX_RANGE_NO_DATA
        );
        assert_eq!(
            NumericRange::from("5:2").extract_values(&source).status,
            StatusCode::BAD_INDEX_RANGE_INVALID
        );
        assert_eq!(NumericRange::Empty.extract_values(&source).values, source);
    }

    #[test]
    fn test_extract_matrix() {
        let row = |v: &[i32]| Variant::Array(ints(v));
        let source = ArrayValue::List(vec![row(&[1, 2, 3]), row(&[4, 5, 6]), row(&[7, 8, 9])]);
        let out = NumericRange::from("1:2,0:1").extract_values(&source);
        assert_eq!(out.status, StatusCode::GOOD);
        assert_eq!(out.values, ArrayValue::List(vec![row(&[4, 5]), row(&[7, 8])]));

        let flat = ints(&[1, 2, 3]);
        assert_eq!(
            NumericRange::from("0:1,0:1").extract_values(&flat).status,
            StatusCode::BAD_INDEX_RANGE_NO_DATA
        );
    }

    #[test]
    fn test_set_values_representations() {
        let mut list = ArrayValue::List(vec![Variant::Int32(0); 4]);
        let status = NumericRange::from("1:2").set_values(
            &mut list,
            &ArrayValue::List(vec![Variant::Int32(8), Variant::Int32(9)]),
        );
        assert_eq!(status, StatusCode::GOOD);
        assert_eq!(
            list,
            ArrayValue::List(vec![
                Variant::Int32(0),
                Variant::Int32(8),
                Variant::Int32(9),
                Variant::Int32(0)
            ])
        );

        let mut doubles = ArrayValue::from(vec![0.0f64; 3]);
        let status = NumericRange::from("2").set_values(&mut doubles, &ArrayValue::from(vec![1.5f64]));
        assert_eq!(status, StatusCode::GOOD);
        assert_eq!(doubles, ArrayValue::from(vec![0.0, 0.0, 1.5f64]));

        let mut bytes = ArrayValue::from(&b"abcd"[..]);
        let status = NumericRange::from("0:1").set_values(&mut bytes, &ArrayValue::from(&b"XY"[..]));
        assert_eq!(status, StatusCode::GOOD);
        assert_eq!(bytes, ArrayValue::from(&b"XYcd"[..]));
    }

    #[test]
    fn test_set_values_errors() {
        let mut target = ints(&[1, 2, 3]);
        let original = target.clone();
        assert_eq!(
            NumericRange::from("1:5").set_values(&mut target, &ints(&[0; 5])),
            StatusCode::BAD_INDEX_RANGE_NO_DATA
        );
        assert_eq!(
            NumericRange::from("0:1").set_values(&mut target, &ints(&[0; 3])),
            StatusCode::BAD_INDEX_RANGE_INVALID
        );
        assert_eq!(
            NumericRange::from("0:1").set_values(&mut target, &ArrayValue::from(vec![0.0f64; 2])),
            StatusCode::BAD_TYPE_MISMATCH
        );
        assert_eq!(
            NumericRange::from("0:1,0:1").set_values(&mut target, &ints(&[0; 2])),
            StatusCode::BAD_INDEX_RANGE_NO_DATA
        );
        assert_eq!(target, original);

        let mut empty = ints(&[]);
        assert_eq!(
            NumericRange::Empty.set_values(&mut empty, &ints(&[1])),
            StatusCode::BAD_INDEX_RANGE_NO_DATA
        );
    }

    #[test]
    fn test_set_values_empty_range_replaces_whole() {
        let mut target = ints(&[1, 2, 3]);
        assert_eq!(
            NumericRange::Empty.set_values(&mut target, &ints(&[9, 9, 9, 9, 9])),
            StatusCode::GOOD
        );
        assert_eq!(target.len(), 5);
    }

    #[test]
    fn test_overlaps() {
        let r = NumericRange::from;
        assert!(!r("2:4").overlaps(&r("5:7")));
        assert!(r("2:5").overlaps(&r("5:7")));
        assert!(r("3").overlaps(&r("3")));
        assert!(!r("3").overlaps(&r("4")));
        assert!(r("3").overlaps(&r("1:4")));
        assert!(NumericRange::Empty.overlaps(&r("1,1")));
        assert!(!r("x").overlaps(&r("1:2")));
    }

    #[test]
    #[should_panic(expected = "not implemented")]
    fn test_matrix_overlap_panics() {
        NumericRange::from("0:1,0:1").overlaps(&NumericRange::from("1"));
    }
}
