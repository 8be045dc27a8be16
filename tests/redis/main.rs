mod commands;
mod concurrent_blpop;
mod test_utils;
