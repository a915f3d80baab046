//! Cross-context request/response flows.

pub mod flows;
