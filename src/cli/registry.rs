//! Explicit command registry and the dispatcher that runs it.
//!
//! Commands are registered once at start-up into a [`Registry`] that is then
//! handed to a [`Dispatcher`]. Nothing registers itself into shared state.

use async_trait::async_trait;
use clap::{Arg, ArgMatches};
use tracing::debug;

use crate::cli::AppContext;

/// One leaf command of the CLI.
#[async_trait]
pub trait Command: Send + Sync {
    /// Parent group, e.g. `tool` for `tool sub`.
    fn group(&self) -> Option<&'static str> {
        None
    }

    fn name(&self) -> &'static str;

    /// Argument definition for this command.
    fn setup(&self) -> clap::Command;

    async fn run(&self, matches: &ArgMatches, ctx: &AppContext) -> anyhow::Result<()>;

    /// Space separated path as typed on the command line.
    fn path(&self) -> String {
        match self.group() {
            Some(group) => format!("{group} {}", self.name()),
            None => self.name().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Group {
    name: &'static str,
    about: &'static str,
}

#[derive(Default)]
pub struct Registry {
    groups: Vec<Group>,
    commands: Vec<Box<dyn Command>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_group(&mut self, name: &'static str, about: &'static str) -> &mut Self {
        match self.groups.iter_mut().find(|g| g.name == name) {
            Some(group) => group.about = about,
            None => self.groups.push(Group { name, about }),
        }
        self
    }

    pub fn register(&mut self, command: Box<dyn Command>) -> &mut Self {
        if let Some(group) = command.group() {
            if !self.groups.iter().any(|g| g.name == group) {
                self.groups.push(Group {
                    name: group,
                    about: "",
                });
            }
        }
        self.commands.push(command);
        self
    }

    pub fn find(&self, group: Option<&str>, name: &str) -> Option<&dyn Command> {
        self.commands
            .iter()
            .find(|c| c.group() == group && c.name() == name)
            .map(|c| &**c)
    }

    /// Paths of all registered commands, in registration order.
    pub fn paths(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.path()).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

pub struct Dispatcher {
    registry: Registry,
}

impl Dispatcher {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Build the clap command tree from the registry.
    pub fn command(&self) -> clap::Command {
        let mut root = clap::Command::new("mwtool")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Middleware diagnostic tools")
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(
                Arg::new("config")
                    .long("config")
                    .short('c')
                    .global(true)
                    .value_name("PATH")
                    .help("Path to configuration file (env MWTOOL_CONFIG is used when unset)"),
            );

        for group in &self.registry.groups {
            let mut group_cmd = clap::Command::new(group.name)
                .about(group.about)
                .subcommand_required(true)
                .arg_required_else_help(true);

            for command in self
                .registry
                .commands
                .iter()
                .filter(|c| c.group() == Some(group.name))
            {
                group_cmd = group_cmd.subcommand(command.setup());
            }

            root = root.subcommand(group_cmd);
        }

        for command in self.registry.commands.iter().filter(|c| c.group().is_none()) {
            root = root.subcommand(command.setup());
        }

        root
    }

    /// Parse arguments without exiting the process on error.
    pub fn try_parse_from<I, T>(&self, args: I) -> Result<ArgMatches, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        self.command().try_get_matches_from(args)
    }

    /// Locate the leaf command selected in `matches` and its own matches.
    pub fn resolve<'a>(
        &'a self,
        matches: &'a ArgMatches,
    ) -> Option<(&'a dyn Command, &'a ArgMatches)> {
        let (name, sub) = matches.subcommand()?;

        if let Some(command) = self.registry.find(None, name) {
            return Some((command, sub));
        }

        let (leaf, leaf_matches) = sub.subcommand()?;
        self.registry
            .find(Some(name), leaf)
            .map(|command| (command, leaf_matches))
    }

    pub async fn dispatch(&self, matches: &ArgMatches, ctx: &AppContext) -> anyhow::Result<()> {
        let (command, sub_matches) = self
            .resolve(matches)
            .ok_or_else(|| anyhow::anyhow!("no command selected"))?;

        debug!(command = %command.path(), "dispatching");
        command.run(sub_matches, ctx).await
    }
}
