//! CLI command implementations.

mod config;
mod doctor;
mod fetch;
mod init;
mod serve;

pub use config::run_config;
pub use doctor::run_doctor;
pub use fetch::run_fetch;
pub use init::run_init;
pub use serve::run_serve;
