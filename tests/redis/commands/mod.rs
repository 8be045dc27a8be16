mod lists;
mod streams;
mod strings;
