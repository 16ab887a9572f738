pub mod compose;
pub mod config;
pub mod entrypoint;
pub mod error;
pub mod io;
pub mod lock;
pub mod paths;
pub mod platform;
pub mod ports;
pub mod registry;
pub mod runtime;
pub mod service;
pub mod skeleton;

pub use error::{PodError, Result};
