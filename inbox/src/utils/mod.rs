mod helpers;
pub mod validation;

pub use helpers::{conversation_key, preview};
