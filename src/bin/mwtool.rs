//! mwtool – middleware diagnostic CLI.
//
//  $ mwtool tool sub fleet.events
//  Waiting for messages from topic fleet.events on 127.0.0.1:4222
//  ---- 10:00:00
//  hello
//
//  $ mwtool tool sub 'fleet.>' --raw
//  $ mwtool buildinfo
use anyhow::Context;
use mwtool::cli::{config_path, default_registry, AppContext, Dispatcher};
use mwtool::logging::init_logging;
use mwtool::shutdown::cancel_on_signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().context("failed to install the log subscriber")?;

    let dispatcher = Dispatcher::new(default_registry());
    let matches = dispatcher.command().get_matches();

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let ctx = AppContext::new(config_path(&matches), cancel);
    dispatcher.dispatch(&matches, &ctx).await
}
