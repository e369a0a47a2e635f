mod calc;
mod charts;
mod config;
mod console;
mod entry;
mod menu;
mod report;
mod store;

use anyhow::Context;
use std::io;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never mix with the menu on stdout.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    let cfg = config::AppConfig::load_or_default(&cwd);
    log::debug!("configuration: {:?}", cfg);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let console = console::Console::new(stdin.lock(), stdout.lock());

    menu::App::new(cfg, console).run()
}
