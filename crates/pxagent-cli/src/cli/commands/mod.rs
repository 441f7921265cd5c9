//! CLI command handlers, one file per command.

mod add;
mod get;
mod run;
mod status;
mod stop;

pub use add::run_add;
pub use get::run_get;
pub use run::run_agent;
pub use status::run_status;
pub use stop::run_stop;
