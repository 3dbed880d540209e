//! Boss/Intern - answer questions over a text context by iterative delegation.
//!
//! A capable "boss" model formulates focused sub-questions, a cheaper
//! "intern" model answers each one strictly from the context, and the boss
//! decides when the gathered evidence is enough to answer.

pub mod ai;
pub mod config;
pub mod delegation;
pub mod display;
pub mod suite;
pub mod transcript;
