use std::str::FromStr;

use bytes::Bytes;

use crate::commands::CommandError;

/// Interprets a key argument. Keys are stored as strings; invalid UTF-8 is
/// replaced rather than rejected.
pub fn key_argument(argument: &Bytes) -> String {
    String::from_utf8_lossy(argument).into_owned()
}

pub fn string_argument(argument: &Bytes) -> Result<&str, CommandError> {
    std::str::from_utf8(argument).map_err(|_| CommandError::SyntaxError)
}

/// Parses a numeric argument, mapping any failure to `NotAnInteger`.
pub fn integer_argument<T: FromStr>(argument: &Bytes) -> Result<T, CommandError> {
    string_argument(argument)
        .ok()
        .and_then(|text| text.parse::<T>().ok())
        .ok_or(CommandError::NotAnInteger)
}

/// Returns an arity error unless `valid` holds for the argument count.
pub fn check_arity(
    name: &str,
    arguments: &[Bytes],
    valid: impl Fn(usize) -> bool,
) -> Result<(), CommandError> {
    if valid(arguments.len()) {
        Ok(())
    } else {
        Err(CommandError::WrongNumberOfArguments(name.to_lowercase()))
    }
}
