//! Supervisor for fleets of self-hosted GitHub Actions runners living on a single host.
//!
//! Every directory holding a runner installation is driven by its own [supervisor::runner::RunnerLoop],
//! which executes the runner once, cleans its working state and starts it again until the
//! [supervisor::shutdown::ShutdownCoordinator] requests the whole fleet to stop.
pub mod cli;
pub mod command;
pub mod config;
pub mod defaults;
pub mod event;
pub mod github;
pub mod host;
pub mod locator;
pub mod logging;
pub mod provision;
pub mod service;
pub mod supervisor;
pub mod utils;
