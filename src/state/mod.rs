//! Terraform state payload handling.
//!
//! The state document is an opaque blob; this module only decides how that
//! blob is laid out inside a secret store entry.

pub mod codec;

pub use codec::{DecodeError, DecodedState, StateCodec};
