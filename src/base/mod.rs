//! Base types and error handling.
//!
//! Provides foundational types in the spirit of Chromium's `net/base/`:
//! - [`NetError`](neterror::NetError): error taxonomy shared by every layer
//! - [`LoadState`](loadstate::LoadState): redirect job states

pub mod loadstate;
pub mod neterror;

#[cfg(test)]
mod tests;
