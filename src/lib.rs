pub mod args;
pub mod buffer;
pub mod capture;
pub mod config;
pub mod correlate;
pub mod identity;
pub mod report;
pub mod service;
