pub mod config;
pub mod logging;

// Agent plumbing
pub mod agent;
pub mod commands;
pub mod control;
pub mod report;

// Dataset processing
pub mod model;
pub mod processor;
pub mod record;
pub mod remote;
pub mod uri;

// Jobs
pub mod scheduler;
pub mod translator;
