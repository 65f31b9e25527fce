//! Command-line configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::engine::{EngineOptions, SearchLimits};

/// Which side to play, or detect it from the rendered board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    White,
    Black,
    Auto,
}

/// Plays chess on a web board through an external UCI engine.
#[derive(Debug, Parser)]
#[command(name = "pilotfish", version, about)]
pub struct Cli {
    /// Path to the UCI engine binary
    pub engine: PathBuf,

    /// URL of the game page
    #[arg(long, default_value = "https://lichess.org")]
    pub url: String,

    /// WebDriver server to attach to (chromedriver, geckodriver, ...)
    #[arg(long, default_value = "http://localhost:9515")]
    pub webdriver_url: String,

    /// Side to play; auto reads the board orientation
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Fixed search depth
    #[arg(long)]
    pub depth: Option<u32>,

    /// Think time per move in milliseconds
    #[arg(long)]
    pub movetime_ms: Option<u64>,

    /// Interval between board polls in milliseconds
    #[arg(long, default_value_t = 250)]
    pub poll_interval_ms: u64,

    /// Consecutive ambiguous board reads tolerated before giving up
    #[arg(long, default_value_t = 6)]
    pub max_ambiguous_retries: u32,

    /// How long to wait for the page to acknowledge a move, milliseconds
    #[arg(long, default_value_t = 4000)]
    pub ack_timeout_ms: u64,

    /// Engine Threads option
    #[arg(long)]
    pub threads: Option<u32>,

    /// Engine Hash option in MB
    #[arg(long)]
    pub hash_mb: Option<u32>,

    /// Engine Skill Level option
    #[arg(long)]
    pub skill_level: Option<u32>,
}

impl Cli {
    pub fn search_limits(&self) -> SearchLimits {
        SearchLimits {
            depth: self.depth,
            movetime: self.movetime_ms.map(Duration::from_millis),
            ..SearchLimits::default()
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            threads: self.threads,
            hash_mb: self.hash_mb,
            skill_level: self.skill_level,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}
