//! Shared utilities.

pub mod code_generator;
pub mod snowflake;
pub mod url_validator;
