//! Command implementations
//!
//! This module contains implementations for all CLI subcommands.

pub mod build;
pub mod doctor;
pub mod hooks;
pub mod instructions;
pub mod list;
pub mod logs;
pub mod reopen;
pub mod shared;
pub mod up;
