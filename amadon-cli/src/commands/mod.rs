//! CLI command implementations.

pub mod catalog;
pub mod clean;
mod common;
pub mod config;
pub mod extract;
pub mod slots;
pub mod verify;
