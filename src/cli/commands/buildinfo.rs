use async_trait::async_trait;
use clap::ArgMatches;

use crate::buildinfo::BuildInfo;
use crate::cli::{AppContext, Command};

/// `buildinfo`: print the build settings of this binary.
pub struct BuildInfoCommand;

#[async_trait]
impl Command for BuildInfoCommand {
    fn name(&self) -> &'static str {
        "buildinfo"
    }

    fn setup(&self) -> clap::Command {
        clap::Command::new("buildinfo").about("View build settings")
    }

    async fn run(&self, _matches: &ArgMatches, _ctx: &AppContext) -> anyhow::Result<()> {
        BuildInfo::current().render(&mut std::io::stdout())?;
        Ok(())
    }
}
