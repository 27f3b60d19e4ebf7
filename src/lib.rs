//! plc_log_codec: stable-index diff and semantic-tag codec for DID:PLC operation chains
//!
//! # Usage
//! See README.md for details and examples.

pub mod diff;
pub mod error;
pub mod indexer;
pub mod stream;
pub mod tags;
pub mod value;

pub use diff::{apply, EditScript};
pub use error::Error;
pub use stream::{decode, encode};
pub use value::Value;
