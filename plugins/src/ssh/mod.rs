//! Device sessions over the system `ssh` client (optionally wrapped in `sshpass -e`).
//!
//! The transport spawns one `ssh -tt` child per device, waits for the CLI prompt, disables
//! paging with the configured setup commands and then runs one command at a time, answering
//! any pager prompt that still shows up. Output is decoded with the configured encoding.

mod output;
mod session;
mod transport;

pub use output::{classify_exit, clean_output};
pub use transport::{SshOptions, SshTransport};
