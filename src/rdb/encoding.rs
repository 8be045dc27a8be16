use bytes::Bytes;

use crate::rdb::RdbError;

#[derive(Debug, PartialEq)]
enum ValueEncoding {
    Length(usize),
    Int8,
    Int16,
    Int32,
    LzfCompressedString,
}

/// Returns `len` bytes starting at `cursor`.
pub fn get_buffer_slice(buffer: &[u8], cursor: usize, len: usize) -> Result<&[u8], RdbError> {
    buffer
        .get(cursor..cursor.saturating_add(len))
        .ok_or(RdbError::UnexpectedEof)
}

pub fn read_array<const N: usize>(buffer: &[u8], cursor: usize) -> Result<[u8; N], RdbError> {
    let slice = get_buffer_slice(buffer, cursor, N)?;
    slice.try_into().map_err(|_| RdbError::UnexpectedEof)
}

/// Decodes the length prefix at `cursor`.
///
/// The two most significant bits of the first byte select the format:
/// `00` a 6-bit length, `01` a 14-bit length spread over two bytes, `10` a
/// 32 or 64-bit big-endian length in the following bytes, `11` a special
/// encoding for integers and compressed strings.
fn parse_length_encoding(bytes: &[u8], cursor: usize) -> Result<(ValueEncoding, usize), RdbError> {
    let first = get_buffer_slice(bytes, cursor, 1)?[0];

    match first >> 6 {
        0b00 => Ok((ValueEncoding::Length((first & 0b0011_1111) as usize), 1)),
        0b01 => {
            let second = get_buffer_slice(bytes, cursor + 1, 1)?[0];
            let length = (((first & 0b0011_1111) as usize) << 8) | second as usize;

            Ok((ValueEncoding::Length(length), 2))
        }
        0b10 => match first {
            0x80 => {
                let length = u32::from_be_bytes(read_array(bytes, cursor + 1)?);
                Ok((ValueEncoding::Length(length as usize), 5))
            }
            0x81 => {
                let length = u64::from_be_bytes(read_array(bytes, cursor + 1)?);
                let length = usize::try_from(length).map_err(|_| RdbError::InvalidLengthEncoding(first))?;
                Ok((ValueEncoding::Length(length), 9))
            }
            _ => Err(RdbError::InvalidLengthEncoding(first)),
        },
        _ => match first & 0b0011_1111 {
            0 => Ok((ValueEncoding::Int8, 1)),
            1 => Ok((ValueEncoding::Int16, 1)),
            2 => Ok((ValueEncoding::Int32, 1)),
            3 => Ok((ValueEncoding::LzfCompressedString, 1)),
            _ => Err(RdbError::InvalidLengthEncoding(first)),
        },
    }
}

/// Reads a plain length, as used by `SELECTDB` and `RESIZEDB`.
pub fn parse_length(bytes: &[u8], cursor: usize) -> Result<(usize, usize), RdbError> {
    match parse_length_encoding(bytes, cursor)? {
        (ValueEncoding::Length(length), read) => Ok((length, read)),
        _ => Err(RdbError::InvalidLengthEncoding(bytes[cursor])),
    }
}

/// Reads a string, expanding integer encodings into their decimal form.
pub fn parse_string(bytes: &[u8], cursor: usize) -> Result<(Bytes, usize), RdbError> {
    let (encoding, header) = parse_length_encoding(bytes, cursor)?;
    let body = cursor + header;

    let (value, body_length) = match encoding {
        ValueEncoding::Length(length) => (
            Bytes::copy_from_slice(get_buffer_slice(bytes, body, length)?),
            length,
        ),
        ValueEncoding::Int8 => {
            let value = i8::from_le_bytes(read_array(bytes, body)?);
            (Bytes::from(value.to_string()), 1)
        }
        ValueEncoding::Int16 => {
            let value = i16::from_le_bytes(read_array(bytes, body)?);
            (Bytes::from(value.to_string()), 2)
        }
        ValueEncoding::Int32 => {
            let value = i32::from_le_bytes(read_array(bytes, body)?);
            (Bytes::from(value.to_string()), 4)
        }
        ValueEncoding::LzfCompressedString => return Err(RdbError::CompressedString),
    };

    Ok((value, header + body_length))
}
