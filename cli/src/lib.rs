//! netsentinel command line front end; modules are exposed for unit tests.

pub mod commands;
pub mod error;
pub mod progress;
