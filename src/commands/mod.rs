//! CLI command handlers.

mod config;
mod decrypt;
mod export;
mod run;
mod status;

pub use config::{run_config_set_command, run_config_show_command};
pub use decrypt::run_decrypt_command;
pub use export::run_export_command;
pub use run::{run_daemon_command, run_install_command};
pub use status::run_status_command;
