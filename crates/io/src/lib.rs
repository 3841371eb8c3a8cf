//! `vinrecon-io`: turns raw feed bytes into row-sets and back.
//!
//! No network, no mapping. Callers hand in bytes and get a header row plus
//! ordered string rows.

pub mod csv;
pub mod rowset;

pub use crate::csv::{decode, encode, DecodeError, TextEncoding};
pub use rowset::RowSet;
