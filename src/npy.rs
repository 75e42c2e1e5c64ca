//! NumPy `.npy` Encoding
//!
//! Serializes in-memory arrays into the `.npy` container the models accept
//! as input. Only format version 1.0 is written.
//!
//! ## Layout
//!
//! ```text
//! 0-5   magic "\x93NUMPY"
//! 6-7   version (1, 0)
//! 8-9   header length (u16 LE)
//! 10..  header dict, space padded, newline terminated
//! ..    element data, C order, little-endian
//! ```
//!
//! The preamble (magic through header) is padded to a multiple of 64 bytes.
//!
//! ## Example
//!
//! ```
//! use conductorquantum::npy::NpyArray;
//!
//! let array = NpyArray::from_shape_vec(vec![2, 3], vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0])?;
//! let bytes = array.to_bytes()?;
//! assert_eq!(&bytes[..6], b"\x93NUMPY");
//! assert_eq!(bytes.len() % 64, (6 * 8) % 64);
//! # Ok::<(), conductorquantum::Error>(())
//! ```

use crate::error::{Error, Result};
use ndarray::{ArrayBase, Data, Dimension};
use std::io::Write;

// ============================================================================
// NPY-001: Element Types
// ============================================================================

mod magic {
    /// "\x93NUMPY"
    pub(super) const NPY: [u8; 6] = [0x93, b'N', b'U', b'M', b'P', b'Y'];
    pub(super) const VERSION: [u8; 2] = [1, 0];
    /// Magic, version and header length field.
    pub(super) const PREFIX_LEN: usize = 10;
    pub(super) const ALIGN: usize = 64;
}

mod sealed {
    pub trait Sealed {}
}

/// Scalar types that can be stored in an `.npy` file.
pub trait NpyElement: Copy + sealed::Sealed {
    /// NumPy dtype descriptor, e.g. `<f8`.
    const DESCR: &'static str;

    /// Append the little-endian encoding of `self`.
    fn extend_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_npy_element {
    ($($ty:ty => $descr:literal),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl NpyElement for $ty {
                const DESCR: &'static str = $descr;

                fn extend_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_npy_element! {
    u8 => "|u1",
    i8 => "|i1",
    u16 => "<u2",
    i16 => "<i2",
    u32 => "<u4",
    i32 => "<i4",
    u64 => "<u8",
    i64 => "<i8",
    f32 => "<f4",
    f64 => "<f8",
}

impl sealed::Sealed for bool {}

impl NpyElement for bool {
    const DESCR: &'static str = "|b1";

    fn extend_le(self, out: &mut Vec<u8>) {
        out.push(u8::from(self));
    }
}

// ============================================================================
// NPY-002: Header
// ============================================================================

/// Decoded `.npy` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyHeader {
    /// dtype descriptor.
    pub descr: String,
    /// Whether data is stored in column-major order.
    pub fortran_order: bool,
    /// Array dimensions.
    pub shape: Vec<usize>,
}

impl NpyHeader {
    /// Encode magic, version, length field and padded header dict.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let dict = format!(
            "{{'descr': '{}', 'fortran_order': {}, 'shape': {}, }}",
            self.descr,
            if self.fortran_order { "True" } else { "False" },
            format_shape(&self.shape)
        );

        // dict + padding + '\n' must end on an ALIGN boundary.
        let unpadded = magic::PREFIX_LEN + dict.len() + 1;
        let padding = (magic::ALIGN - unpadded % magic::ALIGN) % magic::ALIGN;
        let header_len = dict.len() + padding + 1;
        let header_len_field = u16::try_from(header_len).map_err(|_| {
            Error::InvalidArray(format!(
                "header of {header_len} bytes does not fit a version 1.0 file"
            ))
        })?;

        let mut out = Vec::with_capacity(magic::PREFIX_LEN + header_len);
        out.extend_from_slice(&magic::NPY);
        out.extend_from_slice(&magic::VERSION);
        out.extend_from_slice(&header_len_field.to_le_bytes());
        out.extend_from_slice(dict.as_bytes());
        out.resize(out.len() + padding, b' ');
        out.push(b'\n');
        Ok(out)
    }

    /// Parse the header of a version 1.x file.
    ///
    /// Returns the header and the offset at which element data starts.
    pub fn parse(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < magic::PREFIX_LEN || data[..6] != magic::NPY {
            return Err(Error::InvalidArray("missing .npy magic".to_string()));
        }
        if data[6] != 1 {
            return Err(Error::InvalidArray(format!(
                "unsupported .npy version {}.{}",
                data[6], data[7]
            )));
        }

        let header_len = u16::from_le_bytes([data[8], data[9]]) as usize;
        let end = magic::PREFIX_LEN + header_len;
        let header = data
            .get(magic::PREFIX_LEN..end)
            .ok_or_else(|| Error::InvalidArray("truncated .npy header".to_string()))?;
        let header = std::str::from_utf8(header)
            .map_err(|_| Error::InvalidArray("header is not ASCII".to_string()))?;

        let descr = dict_value(header, "descr")?
            .trim_matches('\'')
            .to_string();
        let fortran_order = match dict_value(header, "fortran_order")? {
            "True" => true,
            "False" => false,
            other => {
                return Err(Error::InvalidArray(format!(
                    "invalid fortran_order {other}"
                )))
            }
        };
        let shape = parse_shape(dict_value(header, "shape")?)?;

        Ok((
            Self {
                descr,
                fortran_order,
                shape,
            },
            end,
        ))
    }
}

fn format_shape(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => {
            let parts: Vec<String> = dims.iter().map(ToString::to_string).collect();
            format!("({})", parts.join(", "))
        }
    }
}

/// Raw text of `key`'s value in a Python dict literal.
fn dict_value<'a>(header: &'a str, key: &str) -> Result<&'a str> {
    let needle = format!("'{key}':");
    let start = header
        .find(&needle)
        .map(|i| i + needle.len())
        .ok_or_else(|| Error::InvalidArray(format!("header has no '{key}'")))?;
    let rest = header[start..].trim_start();

    let end = if rest.starts_with('(') {
        rest.find(')').map(|i| i + 1)
    } else {
        rest.find(',')
    };
    end.map(|e| rest[..e].trim())
        .ok_or_else(|| Error::InvalidArray(format!("unterminated value for '{key}'")))
}

fn parse_shape(text: &str) -> Result<Vec<usize>> {
    let inner = text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| Error::InvalidArray(format!("invalid shape {text}")))?;
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| Error::InvalidArray(format!("invalid dimension {s}")))
        })
        .collect()
}

// ============================================================================
// NPY-003: Arrays
// ============================================================================

/// Array already converted to `.npy` element bytes.
///
/// The element type is erased after construction; only its descriptor is
/// kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyArray {
    descr: &'static str,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl NpyArray {
    /// Array of `shape` from row-major `values`.
    pub fn from_shape_vec<T: NpyElement>(shape: Vec<usize>, values: Vec<T>) -> Result<Self> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| Error::InvalidArray(format!("shape {shape:?} overflows")))?;
        if expected != values.len() {
            return Err(Error::InvalidArray(format!(
                "shape {shape:?} needs {expected} elements, got {}",
                values.len()
            )));
        }

        let mut data = Vec::with_capacity(values.len() * std::mem::size_of::<T>());
        for value in values {
            value.extend_le(&mut data);
        }
        Ok(Self {
            descr: T::DESCR,
            shape,
            data,
        })
    }

    /// One-dimensional array.
    #[must_use]
    pub fn from_vec<T: NpyElement>(values: Vec<T>) -> Self {
        let shape = vec![values.len()];
        let mut data = Vec::with_capacity(values.len() * std::mem::size_of::<T>());
        for value in values {
            value.extend_le(&mut data);
        }
        Self {
            descr: T::DESCR,
            shape,
            data,
        }
    }

    /// Copy an `ndarray` array, in logical row-major order whatever its
    /// memory layout.
    #[must_use]
    pub fn from_ndarray<A, S, D>(array: &ArrayBase<S, D>) -> Self
    where
        A: NpyElement,
        S: Data<Elem = A>,
        D: Dimension,
    {
        let mut data = Vec::with_capacity(array.len() * std::mem::size_of::<A>());
        for value in array.iter() {
            value.extend_le(&mut data);
        }
        Self {
            descr: A::DESCR,
            shape: array.shape().to_vec(),
            data,
        }
    }

    /// dtype descriptor.
    #[must_use]
    pub fn descr(&self) -> &'static str {
        self.descr
    }

    /// Array dimensions.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Header describing this array.
    #[must_use]
    pub fn header(&self) -> NpyHeader {
        NpyHeader {
            descr: self.descr.to_string(),
            fortran_order: false,
            shape: self.shape.clone(),
        }
    }

    /// Write the complete `.npy` file.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.header().encode()?)?;
        writer.write_all(&self.data)?;
        writer.flush()?;
        Ok(())
    }

    /// Complete `.npy` file in memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = self.header().encode()?;
        out.extend_from_slice(&self.data);
        Ok(out)
    }
}

impl<A, S, D> From<&ArrayBase<S, D>> for NpyArray
where
    A: NpyElement,
    S: Data<Elem = A>,
    D: Dimension,
{
    fn from(array: &ArrayBase<S, D>) -> Self {
        Self::from_ndarray(array)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};
    use proptest::prelude::*;

    #[test]
    fn test_header_matches_numpy() {
        let array = NpyArray::from_shape_vec(vec![2, 3], vec![1i64, 2, 3, 4, 5, 6]).unwrap();
        let bytes = array.to_bytes().unwrap();

        assert_eq!(&bytes[..8], b"\x93NUMPY\x01\x00");
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);

        let header = std::str::from_utf8(&bytes[10..10 + header_len]).unwrap();
        assert!(header.starts_with("{'descr': '<i8', 'fortran_order': False, 'shape': (2, 3), }"));
        assert!(header.ends_with('\n'));

        let data = &bytes[10 + header_len..];
        assert_eq!(data.len(), 6 * 8);
        assert_eq!(&data[..8], &1i64.to_le_bytes());
        assert_eq!(&data[40..], &6i64.to_le_bytes());
    }

    #[test]
    fn test_shape_formatting() {
        assert_eq!(format_shape(&[]), "()");
        assert_eq!(format_shape(&[5]), "(5,)");
        assert_eq!(format_shape(&[16, 16]), "(16, 16)");
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = NpyArray::from_shape_vec(vec![2, 2], vec![1.0f32; 3]).unwrap_err();
        assert!(matches!(err, Error::InvalidArray(_)));
        assert!(err.to_string().contains("needs 4 elements, got 3"));
    }

    #[test]
    fn test_from_vec_is_one_dimensional() {
        let array = NpyArray::from_vec(vec![0.5f32, 1.5, 2.5]);
        assert_eq!(array.shape(), &[3]);
        assert_eq!(array.descr(), "<f4");
    }

    #[test]
    fn test_bool_elements() {
        let array = NpyArray::from_vec(vec![true, false, true]);
        let bytes = array.to_bytes().unwrap();
        let (header, offset) = NpyHeader::parse(&bytes).unwrap();
        assert_eq!(header.descr, "|b1");
        assert_eq!(&bytes[offset..], &[1, 0, 1]);
    }

    #[test]
    fn test_ndarray_transposed_is_written_in_logical_order() {
        let a = array![[1u16, 2, 3], [4, 5, 6]];
        let transposed = a.t();
        let npy = NpyArray::from_ndarray(&transposed);

        assert_eq!(npy.shape(), &[3, 2]);
        let bytes = npy.to_bytes().unwrap();
        let (_, offset) = NpyHeader::parse(&bytes).unwrap();
        let values: Vec<u16> = bytes[offset..]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(values, vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_ndarray_3d_header() {
        let a = Array3::<f64>::zeros((2, 16, 16));
        let npy: NpyArray = (&a).into();
        let (header, _) = NpyHeader::parse(&npy.to_bytes().unwrap()).unwrap();
        assert_eq!(header.shape, vec![2, 16, 16]);
        assert_eq!(header.descr, "<f8");
        assert!(!header.fortran_order);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(NpyHeader::parse(b"PK\x03\x04 not numpy").is_err());
        assert!(NpyHeader::parse(b"\x93NUMPY\x01\x00\xff\x00{'descr'").is_err());
    }

    #[test]
    fn test_write_to_matches_to_bytes() {
        let array = NpyArray::from_vec(vec![7i32, 8, 9]);
        let mut written = Vec::new();
        array.write_to(&mut written).unwrap();
        assert_eq!(written, array.to_bytes().unwrap());
    }

    proptest! {
        #[test]
        fn prop_preamble_aligned(shape in prop::collection::vec(0usize..5000, 0..6)) {
            let header = NpyHeader {
                descr: "<f8".to_string(),
                fortran_order: false,
                shape: shape.clone(),
            };
            let preamble = header.encode().unwrap();
            prop_assert_eq!(preamble.len() % 64, 0);

            let (parsed, offset) = NpyHeader::parse(&preamble).unwrap();
            prop_assert_eq!(offset, preamble.len());
            prop_assert_eq!(parsed.shape, shape);
        }
    }
}
