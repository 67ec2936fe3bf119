use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "rulekeeper")]
#[command(about = "Inspect and manage stored automation rules", long_about = None)]
pub struct Cli {
    /// Configuration file (falls back to CONFIG_PATH, then config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List registered applications
    Applications,

    /// List registered events
    Events,

    /// List the actions an application offers
    Actions { application_id: i64 },

    /// List the attributes an event carries
    Attributes { event_id: i64 },

    /// List the filters applicable to an attribute
    Filters { attribute_id: i64 },

    /// List stored rules
    #[command(alias = "ls")]
    Rules,

    /// Print one rule with its filter tree and actions
    Show { rule_id: i64 },

    /// Delete a rule and everything attached to it
    #[command(alias = "rm")]
    Delete { rule_id: i64 },
}
