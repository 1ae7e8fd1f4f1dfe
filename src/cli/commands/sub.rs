use async_trait::async_trait;
use clap::builder::NonEmptyStringValueParser;
use clap::{ArgMatches, Args, FromArgMatches};

use crate::broker::{StaticDiscovery, TcpConnector};
use crate::cli::{AppContext, Command};
use crate::core::subscription::Subscription;

#[derive(Debug, Args)]
pub struct SubArgs {
    /// The topic to subscribe to
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    pub topic: String,

    /// Display raw messages one per line without timestamps
    #[arg(long)]
    pub raw: bool,
}

/// `tool sub`: stream messages published on a topic until interrupted.
pub struct SubCommand;

#[async_trait]
impl Command for SubCommand {
    fn group(&self) -> Option<&'static str> {
        Some("tool")
    }

    fn name(&self) -> &'static str {
        "sub"
    }

    fn setup(&self) -> clap::Command {
        SubArgs::augment_args(clap::Command::new("sub").about("Subscribe to middleware topics"))
    }

    async fn run(&self, matches: &ArgMatches, ctx: &AppContext) -> anyhow::Result<()> {
        let args = SubArgs::from_arg_matches(matches)?;
        let config = ctx.load_config()?;

        let subscription = Subscription::configure(args.topic, args.raw)?
            .with_delivery_capacity(config.delivery_capacity);
        let discovery = StaticDiscovery::from_config(&config.middleware);
        let connector = TcpConnector::from_config(&config.middleware);

        let mut out = std::io::stdout();
        subscription
            .run(
                &discovery,
                &connector,
                &config.identity,
                &mut out,
                ctx.cancel_token(),
            )
            .await?;

        Ok(())
    }
}
