//! Row- and column-level cleaning stages.
//!
//! This module provides:
//! - [`DuplicateRemover`]: drops exact duplicate rows, keeping the first
//! - [`TextCleaner`]: strips punctuation and lower-cases text columns
//! - [`TypeConverter`]: timestamp, category and strict dtype conversion

mod converters;
mod duplicates;
mod text;

pub use converters::{TypeConverter, category_codes, to_epoch_seconds};
pub use duplicates::{DuplicateRemover, count_duplicate_rows, unique_rows};
pub use text::{TextCleaner, clean_text_value};
