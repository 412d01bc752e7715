//! Input parsers for user-entered shorthand.

pub mod dose_string;
