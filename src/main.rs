// src/main.rs
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::error;

use stimpanel::config::PanelConfig;
use stimpanel::engine::PanelEngine;
use stimpanel::types::{PanelAction, PanelMessage, HELP};

// Usage: stimpanel [config.json]
fn main() -> Result<()> {
    env_logger::init();
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = PanelConfig::load_or_default(config_path.as_deref())?;
    let mut engine = PanelEngine::connect(&config).context("stimulator startup failed")?;

    println!("{HELP}");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        let action = match line.parse::<PanelAction>() {
            Ok(action) => action,
            Err(e) => {
                error!("{e}");
                println!("{e}");
                continue;
            }
        };
        let mut quit = false;
        for message in engine.handle(action) {
            quit |= matches!(message, PanelMessage::Quit);
            println!("{message}");
        }
        if quit {
            break;
        }
    }
    Ok(())
}
