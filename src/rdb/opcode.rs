use bytes::Bytes;

use crate::rdb::{
    encoding::{get_buffer_slice, parse_length, parse_string, read_array},
    RdbError,
};

const METADATA_OPCODE: u8 = 0xFA;
const RESIZE_DB_OPCODE: u8 = 0xFB;
const EXPIRATION_MILLISECONDS_OPCODE: u8 = 0xFC;
const EXPIRATION_SECONDS_OPCODE: u8 = 0xFD;
const DATABASE_OPCODE: u8 = 0xFE;
const END_OF_FILE_OPCODE: u8 = 0xFF;
const STRING_VALUE_TYPE: u8 = 0x00;

const MAGIC_STRING: &[u8] = b"REDIS";

#[derive(Debug, PartialEq)]
pub enum OpCode {
    Metadata {
        key: Bytes,
        value: Bytes,
    },
    ResizeDb {
        hash_table_size: usize,
        expiry_hash_table_size: usize,
    },
    Database {
        database_number: usize,
    },
    ExpirationSeconds(u32),
    ExpirationMilliseconds(u64),
    KeyValuePair {
        key: Bytes,
        value: Bytes,
    },
    EndOfFile,
}

/// Decodes the opcode at `cursor`, returning it with the number of bytes read.
pub fn parse_opcode(bytes: &[u8], cursor: usize) -> Result<(OpCode, usize), RdbError> {
    let opcode = get_buffer_slice(bytes, cursor, 1)?[0];
    let body = cursor + 1;

    let (opcode, body_length) = match opcode {
        METADATA_OPCODE => {
            let (key, key_length) = parse_string(bytes, body)?;
            let (value, value_length) = parse_string(bytes, body + key_length)?;

            (OpCode::Metadata { key, value }, key_length + value_length)
        }
        RESIZE_DB_OPCODE => {
            let (hash_table_size, first_length) = parse_length(bytes, body)?;
            let (expiry_hash_table_size, second_length) = parse_length(bytes, body + first_length)?;

            (
                OpCode::ResizeDb {
                    hash_table_size,
                    expiry_hash_table_size,
                },
                first_length + second_length,
            )
        }
        DATABASE_OPCODE => {
            let (database_number, length) = parse_length(bytes, body)?;
            (OpCode::Database { database_number }, length)
        }
        EXPIRATION_SECONDS_OPCODE => (
            OpCode::ExpirationSeconds(u32::from_le_bytes(read_array(bytes, body)?)),
            4,
        ),
        EXPIRATION_MILLISECONDS_OPCODE => (
            OpCode::ExpirationMilliseconds(u64::from_le_bytes(read_array(bytes, body)?)),
            8,
        ),
        STRING_VALUE_TYPE => {
            let (key, key_length) = parse_string(bytes, body)?;
            let (value, value_length) = parse_string(bytes, body + key_length)?;

            (OpCode::KeyValuePair { key, value }, key_length + value_length)
        }
        // The checksum that follows is not verified.
        END_OF_FILE_OPCODE => (OpCode::EndOfFile, 0),
        unknown => return Err(RdbError::UnknownOpCode(unknown)),
    };

    Ok((opcode, 1 + body_length))
}

/// Validates the `REDIS<version>` header and returns the version.
pub fn parse_header(bytes: &[u8]) -> Result<(u32, usize), RdbError> {
    if get_buffer_slice(bytes, 0, MAGIC_STRING.len())? != MAGIC_STRING {
        return Err(RdbError::InvalidMagicString);
    }

    let version = get_buffer_slice(bytes, MAGIC_STRING.len(), 4)?;
    let version = std::str::from_utf8(version)
        .ok()
        .and_then(|version| version.parse::<u32>().ok())
        .ok_or(RdbError::InvalidVersion)?;

    Ok((version, MAGIC_STRING.len() + 4))
}
