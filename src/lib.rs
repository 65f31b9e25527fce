//! pilotfish: plays chess on a web board through an external UCI engine.
//!
//! The position tracker under [`chess`] is the single source of truth;
//! [`browser`] observes and drives the page, [`engine`] wraps the UCI
//! process, and [`orchestrator`] ties them together into the turn loop.

pub mod browser;
pub mod chess;
pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;

pub use error::{BotError, BotResult};
