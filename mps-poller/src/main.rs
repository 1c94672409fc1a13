use std::{io, process::ExitCode};
use anyhow::Context;
use mps_poller::{Catalog, Poller, Settings};
use mps_socketcan::SocketCan;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    let catalog = Catalog::builtin()?;
    log::info!("MPS - polling {} request(s) on {} every frame", catalog.len(), settings.channel());

    let device = SocketCan::open(settings.channel(), &settings.filters())
        .with_context(|| format!("opening {}", settings.channel()))?;
    let mut poller = Poller::new(device, settings.channel().clone(), &settings, catalog);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let ret = match settings.cycles() {
        Some(limit) => poller.run_cycles(&mut out, Some(limit)),
        None => poller.run_forever(&mut out),
    };
    ret.context("cycle error")?;

    Ok(())
}
