pub mod compiler;
pub mod dispatcher;
pub mod error;
pub mod launcher;
pub mod resolver;
pub mod runner;
pub mod source;
pub mod workspace;

#[cfg(all(test, unix))]
mod test_support;

#[cfg(test)]
mod engine_tests;

pub use dispatcher::Engine;
pub use error::{EngineError, Result};
