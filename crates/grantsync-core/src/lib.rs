#![recursion_limit = "256"]

pub mod config;
pub mod logging;

pub mod client;
pub mod jobs;
pub mod normalize;
pub mod records;
pub mod remote;
pub mod report;
pub mod retry;
