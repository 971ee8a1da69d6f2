//! Typed readers for TIFF/EXIF field values.
//!
//! Each reader receives a [`TagField`] (the tag's declared type, element
//! count, byte-order marker and a stream positioned at its data) and checks
//! the declared type against the requested one before reading.
//!
//! Integer and rational elements are converted from the file's byte order to
//! host order. `FLOAT` and `DOUBLE` elements are read verbatim in host order;
//! files whose byte order differs from the host's yield swapped floats.

use std::io::Read;

use crate::error::FieldError;
use crate::types::{Rational, SRational};

/// Byte-order marker for little-endian data ("II", Intel)
pub const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Byte-order marker for big-endian data ("MM", Motorola)
pub const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// TIFF field types, numbered as in TIFF 6.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum TiffType {
    Byte = 1,
    Ascii = 2,
    Short = 3,
    Long = 4,
    Rational = 5,
    SByte = 6,
    Undefined = 7,
    SShort = 8,
    SLong = 9,
    SRational = 10,
    Float = 11,
    Double = 12,
}

impl TiffType {
    /// Map a TIFF type code to a type, if it is one of the twelve baseline types.
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            1 => TiffType::Byte,
            2 => TiffType::Ascii,
            3 => TiffType::Short,
            4 => TiffType::Long,
            5 => TiffType::Rational,
            6 => TiffType::SByte,
            7 => TiffType::Undefined,
            8 => TiffType::SShort,
            9 => TiffType::SLong,
            10 => TiffType::SRational,
            11 => TiffType::Float,
            12 => TiffType::Double,
            _ => return None,
        })
    }

    /// The numeric type code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            TiffType::Byte | TiffType::Ascii | TiffType::SByte | TiffType::Undefined => 1,
            TiffType::Short | TiffType::SShort => 2,
            TiffType::Long | TiffType::SLong | TiffType::Float => 4,
            TiffType::Rational | TiffType::SRational | TiffType::Double => 8,
        }
    }
}

/// One tag as seen by a tag callback.
pub struct TagField<'a> {
    /// Tag number
    pub tag: u32,
    /// Declared TIFF type code
    pub type_code: u16,
    /// Number of elements
    pub count: usize,
    /// Byte-order marker of the containing file
    pub byte_order: u16,
    /// Stream positioned at the first element
    pub data: &'a mut dyn Read,
}

/// How to turn raw element bytes into a value.
#[derive(Clone, Copy)]
enum ElementOrder {
    Native,
    Little,
    Big,
}

impl ElementOrder {
    fn resolve(byte_order: u16, swap: bool) -> Result<Self, FieldError> {
        if !swap {
            return Ok(ElementOrder::Native);
        }
        match byte_order {
            BYTE_ORDER_LITTLE_ENDIAN => Ok(ElementOrder::Little),
            BYTE_ORDER_BIG_ENDIAN => Ok(ElementOrder::Big),
            other => Err(FieldError::UnknownByteOrder(other)),
        }
    }
}

/// A fixed-width value that can be read from TIFF element bytes.
trait Element: Copy {
    const SIZE: usize;

    fn from_ne(bytes: &[u8]) -> Self;
    fn from_le(bytes: &[u8]) -> Self;
    fn from_be(bytes: &[u8]) -> Self;

    fn decode(bytes: &[u8], order: ElementOrder) -> Self {
        match order {
            ElementOrder::Native => Self::from_ne(bytes),
            ElementOrder::Little => Self::from_le(bytes),
            ElementOrder::Big => Self::from_be(bytes),
        }
    }
}

macro_rules! impl_element {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Element for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn from_ne(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_ne_bytes(buf)
                }

                fn from_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(buf)
                }

                fn from_be(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_be_bytes(buf)
                }
            }
        )*
    };
}

impl_element!(u8, i8, u16, i16, u32, i32, f32, f64);

fn check_type(field: &TagField<'_>, expected: TiffType) -> Result<(), FieldError> {
    if field.type_code != expected.code() {
        return Err(FieldError::TypeMismatch {
            expected: expected.code(),
            found: field.type_code,
        });
    }
    Ok(())
}

fn check_single(field: &TagField<'_>, expected: TiffType) -> Result<(), FieldError> {
    if field.count != 1 {
        return Err(FieldError::CountMismatch {
            expected: 1,
            found: field.count,
        });
    }
    check_type(field, expected)
}

/// Read exactly `len` bytes, growing the buffer only as data arrives.
fn read_bytes(field: &mut TagField<'_>, len: usize) -> Result<Vec<u8>, FieldError> {
    let mut raw = Vec::new();
    (&mut *field.data).take(len as u64).read_to_end(&mut raw)?;
    if raw.len() != len {
        return Err(FieldError::Io(std::io::ErrorKind::UnexpectedEof.into()));
    }
    Ok(raw)
}

fn copy_elements<T: Element>(
    field: &mut TagField<'_>,
    count: usize,
    swap: bool,
    dst: &mut Vec<T>,
) -> Result<(), FieldError> {
    let len = count
        .checked_mul(T::SIZE)
        .ok_or(FieldError::Oversized { count })?;
    let raw = read_bytes(field, len)?;
    let order = ElementOrder::resolve(field.byte_order, swap)?;
    dst.extend(raw.chunks_exact(T::SIZE).map(|chunk| T::decode(chunk, order)));
    Ok(())
}

fn copy_single<T: Element>(field: &mut TagField<'_>, swap: bool) -> Result<T, FieldError> {
    let mut buf = [0u8; 8];
    let raw = &mut buf[..T::SIZE];
    field.data.read_exact(raw)?;
    let order = ElementOrder::resolve(field.byte_order, swap)?;
    Ok(T::decode(raw, order))
}

fn read_single_value<T: Element>(
    field: &mut TagField<'_>,
    expected: TiffType,
    swap: bool,
) -> Result<T, FieldError> {
    check_single(field, expected)?;
    copy_single(field, swap)
}

fn read_single_pair<T: Element>(
    field: &mut TagField<'_>,
    expected: TiffType,
) -> Result<(T, T), FieldError> {
    check_single(field, expected)?;
    let numerator = copy_single(field, true)?;
    let denominator = copy_single(field, true)?;
    Ok((numerator, denominator))
}

fn read_multiple_values<T: Element>(
    field: &mut TagField<'_>,
    expected: TiffType,
    swap: bool,
    dst: &mut Vec<T>,
) -> Result<(), FieldError> {
    dst.clear();
    check_type(field, expected)?;
    let count = field.count;
    let result = copy_elements(field, count, swap, dst);
    if result.is_err() {
        dst.clear();
    }
    result
}

/// Read an `ASCII` field, cutting it at the first NUL.
///
/// The byte-order marker is ignored.
pub fn read_single_ascii(field: &mut TagField<'_>) -> Result<String, FieldError> {
    check_type(field, TiffType::Ascii)?;
    let len = field.count;
    let mut raw = read_bytes(field, len)?;
    if let Some(pos) = raw.iter().position(|&b| b == 0) {
        raw.truncate(pos);
    }
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

pub fn read_single_byte(field: &mut TagField<'_>) -> Result<u8, FieldError> {
    read_single_value(field, TiffType::Byte, false)
}

pub fn read_single_short(field: &mut TagField<'_>) -> Result<u16, FieldError> {
    read_single_value(field, TiffType::Short, true)
}

pub fn read_single_long(field: &mut TagField<'_>) -> Result<u32, FieldError> {
    read_single_value(field, TiffType::Long, true)
}

pub fn read_single_sbyte(field: &mut TagField<'_>) -> Result<i8, FieldError> {
    read_single_value(field, TiffType::SByte, false)
}

pub fn read_single_undefined(field: &mut TagField<'_>) -> Result<u8, FieldError> {
    read_single_value(field, TiffType::Undefined, false)
}

pub fn read_single_sshort(field: &mut TagField<'_>) -> Result<i16, FieldError> {
    read_single_value(field, TiffType::SShort, true)
}

pub fn read_single_slong(field: &mut TagField<'_>) -> Result<i32, FieldError> {
    read_single_value(field, TiffType::SLong, true)
}

pub fn read_single_float(field: &mut TagField<'_>) -> Result<f32, FieldError> {
    read_single_value(field, TiffType::Float, false)
}

pub fn read_single_double(field: &mut TagField<'_>) -> Result<f64, FieldError> {
    read_single_value(field, TiffType::Double, false)
}

pub fn read_single_rational(field: &mut TagField<'_>) -> Result<Rational, FieldError> {
    read_single_pair(field, TiffType::Rational)
}

pub fn read_single_srational(field: &mut TagField<'_>) -> Result<SRational, FieldError> {
    read_single_pair(field, TiffType::SRational)
}

// The multiple-value readers replace the contents of `dst` on success and
// leave it empty on any failure.

pub fn read_multiple_byte(field: &mut TagField<'_>, dst: &mut Vec<u8>) -> Result<(), FieldError> {
    read_multiple_values(field, TiffType::Byte, false, dst)
}

pub fn read_multiple_short(
    field: &mut TagField<'_>,
    dst: &mut Vec<u16>,
) -> Result<(), FieldError> {
    read_multiple_values(field, TiffType::Short, true, dst)
}

pub fn read_multiple_long(field: &mut TagField<'_>, dst: &mut Vec<u32>) -> Result<(), FieldError> {
    read_multiple_values(field, TiffType::Long, true, dst)
}

pub fn read_multiple_sbyte(field: &mut TagField<'_>, dst: &mut Vec<i8>) -> Result<(), FieldError> {
    read_multiple_values(field, TiffType::SByte, false, dst)
}

pub fn read_multiple_undefined(
    field: &mut TagField<'_>,
    dst: &mut Vec<u8>,
) -> Result<(), FieldError> {
    read_multiple_values(field, TiffType::Undefined, false, dst)
}

pub fn read_multiple_sshort(
    field: &mut TagField<'_>,
    dst: &mut Vec<i16>,
) -> Result<(), FieldError> {
    read_multiple_values(field, TiffType::SShort, true, dst)
}

pub fn read_multiple_slong(
    field: &mut TagField<'_>,
    dst: &mut Vec<i32>,
) -> Result<(), FieldError> {
    read_multiple_values(field, TiffType::SLong, true, dst)
}

pub fn read_multiple_float(
    field: &mut TagField<'_>,
    dst: &mut Vec<f32>,
) -> Result<(), FieldError> {
    read_multiple_values(field, TiffType::Float, false, dst)
}

pub fn read_multiple_double(
    field: &mut TagField<'_>,
    dst: &mut Vec<f64>,
) -> Result<(), FieldError> {
    read_multiple_values(field, TiffType::Double, false, dst)
}
