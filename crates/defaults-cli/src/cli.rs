use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::keys::KeyName;

#[derive(Parser)]
#[command(
    name = "tdefaults",
    about = "Typed defaults: read and write example settings",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON document holding the settings
    #[arg(long, global = true, default_value = "defaults.json")]
    pub file: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show one setting
    Get(GetArgs),
    /// Write one setting through its policy
    Set(SetArgs),
    /// Delete one setting, restoring its default
    Unset(UnsetArgs),
    /// Show every setting
    List,
    /// Delete every stored entry
    Reset,
    /// Run a scripted sequence of writes and print the notifications
    WatchDemo,
}

#[derive(Args)]
pub struct GetArgs {
    pub key: KeyName,
}

#[derive(Args)]
pub struct SetArgs {
    pub key: KeyName,
    /// JSON value, or a bare string
    pub value: String,
}

#[derive(Args)]
pub struct UnsetArgs {
    pub key: KeyName,
}
