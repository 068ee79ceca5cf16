//! Core types, errors, and parsing utilities shared by the flightdeck crates.

pub mod error;
pub mod parse;

pub use error::{Error, Result};
pub use parse::{Format, load_file, parse_as, parse_json, parse_toml, parse_yaml, read_to_string};
