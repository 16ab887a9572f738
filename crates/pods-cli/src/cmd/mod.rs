pub mod config;
pub mod init;
pub mod runtime;
pub mod service;
pub mod venv;
