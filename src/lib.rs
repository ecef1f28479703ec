#![doc = include_str!("../README.md")]
#![warn(missing_docs, missing_debug_implementations)]
mod config;
mod dynamic;
mod error;
mod factory;
mod hooks;
mod registry;

pub use config::*;
pub use dynamic::*;
pub use error::*;
pub use factory::*;
pub use hooks::*;
pub use registry::*;
