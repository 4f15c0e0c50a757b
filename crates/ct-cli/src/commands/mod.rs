//! CLI subcommand implementations.

pub mod ack;
pub mod export;
pub mod import;
pub mod sessions;
pub mod start;
pub mod status;
pub mod stop;
pub mod tags;
pub mod util;
pub mod watch;
