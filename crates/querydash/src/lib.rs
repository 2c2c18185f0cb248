#![forbid(unsafe_code)]

pub mod bind;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod execute;
pub mod models;
pub mod report;
pub mod seed;
pub mod session;
pub mod source;

pub use cli::app::{Cli, Command};
