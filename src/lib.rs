#![forbid(unsafe_code)]

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod convert;
pub mod logging;
pub mod model;
pub mod paginator;
