use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pilotfish::browser::{BoardReader, GamePage, MovePlayer, WebDriver};
use pilotfish::chess::Color;
use pilotfish::config::{Cli, ColorChoice};
use pilotfish::engine::UciEngine;
use pilotfish::orchestrator::{Orchestrator, OrchestratorConfig, StdinPrompt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let engine =
        UciEngine::spawn(&cli.engine, &cli.engine_options()).context("starting the engine")?;

    let driver = WebDriver::connect(&cli.webdriver_url)
        .context("connecting to the WebDriver server")?;
    let page = Rc::new(GamePage::open(driver, &cli.url).context("opening the game page")?);

    let my_color = match cli.color {
        ColorChoice::White => Color::White,
        ColorChoice::Black => Color::Black,
        ColorChoice::Auto => page
            .orientation()
            .context("reading board orientation")?
            .color(),
    };
    info!("[BOT] Playing as {my_color}");

    let reader = BoardReader::new(Rc::clone(&page));
    let player = MovePlayer::new(Rc::clone(&page), cli.ack_timeout());

    let config = OrchestratorConfig {
        my_color,
        limits: cli.search_limits(),
        poll_interval: cli.poll_interval(),
        max_ambiguous_retries: cli.max_ambiguous_retries,
    };

    let mut bot = Orchestrator::new(reader, engine, player, config);
    bot.run(&mut StdinPrompt)?;
    Ok(())
}
