use std::{env, path::PathBuf};

use clap::Parser;
use rulekeeper_core::{Config, Database, Session, SessionError, init_logging, migrations};
use serde_json::{Value, json};
use tracing::info;

mod args;
use args::{Cli, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(|| {
        env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"))
    });
    let config = Config::load(&config_path)?;
    init_logging(&config.app)?;

    let db = Database::open(&config.paths.database).await?;
    db.health_check().await?;
    migrations::run_migrations(&db).await?;
    info!(database = %config.paths.database.display(), "rule store ready");

    let mut session = Session::open(db).await?;
    let output = run(&session, &cli.command).await;
    session.close()?;

    println!("{}", serde_json::to_string_pretty(&output?)?);
    Ok(())
}

async fn run(session: &Session, command: &Command) -> Result<Value, SessionError> {
    let output = match command {
        Command::Applications => json!(session.all_applications()?),
        Command::Events => json!(session.all_events()?),
        Command::Actions { application_id } => {
            let application = session.application(*application_id)?;
            json!(session.actions_for_application(&application)?)
        }
        Command::Attributes { event_id } => {
            let event = session.event(*event_id)?;
            json!(session.attributes_for_event(&event)?)
        }
        Command::Filters { attribute_id } => {
            let attribute = session.attribute(*attribute_id)?;
            json!(session.filters_for_attribute(&attribute).await?)
        }
        Command::Rules => json!(session.list_rules().await?),
        Command::Show { rule_id } => json!(session.load_rule(*rule_id).await?),
        Command::Delete { rule_id } => {
            session.delete_rule(*rule_id).await?;
            json!({ "deleted": rule_id })
        }
    };
    Ok(output)
}
