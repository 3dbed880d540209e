//! Model-facing boundary: the client capability and the role prompts.

mod client;
mod prompts;

pub use client::*;
pub use prompts::*;
