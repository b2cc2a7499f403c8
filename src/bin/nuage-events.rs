//! XREST API push center CLI binary.
//!
//! Authenticates with the credentials found in the environment and prints
//! the root resource or the event feed.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use nuagerest::cli::{Cli, Command};
use nuagerest::{
    Event, Exposable, ExposedObject, Identity, NuageError, PushCenter, Rootable, Session,
    SessionConfig,
};
use serde::{Deserialize, Serialize};
use tabled::{Table, Tabled};
use tracing_subscriber::EnvFilter;

const ME: Identity = Identity::new("me", "me");

/// The API root: the authenticated user.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Me {
    #[serde(flatten)]
    base: ExposedObject,
    #[serde(rename = "APIKey", default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    enterprise_name: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

impl Exposable for Me {
    fn exposed(&self) -> &ExposedObject {
        &self.base
    }

    fn exposed_mut(&mut self) -> &mut ExposedObject {
        &mut self.base
    }

    fn is_root(&self) -> bool {
        true
    }
}

impl Rootable for Me {
    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    fn set_api_key(&mut self, key: Option<String>) {
        self.api_key = key;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match SessionConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Hint: Set NUAGE_USERNAME, NUAGE_PASSWORD and NUAGE_ORGANIZATION");
            return ExitCode::FAILURE;
        }
    };

    match run(config, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: SessionConfig, cli: Cli) -> nuagerest::Result<()> {
    let root = Me {
        base: ExposedObject::with_identity(ME),
        ..Default::default()
    };
    let session = Arc::new(Session::new(config, root)?);
    session.start().await?;

    match cli.command {
        Command::Whoami => handle_whoami(&session, cli.json).await,
        Command::Events {
            entity,
            retry_delay,
        } => handle_events(session, entity, Duration::from_secs(retry_delay), cli.json).await,
    }
}

async fn handle_whoami(session: &Session<Me>, json: bool) -> nuagerest::Result<()> {
    let me = session.root().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&*me)?);
    } else {
        let row = MeRow {
            id: me.identifier().unwrap_or_default().to_string(),
            user: me.user_name.clone().unwrap_or_default(),
            enterprise: me.enterprise_name.clone().unwrap_or_default(),
            role: me.role.clone().unwrap_or_default(),
        };
        println!("{}", Table::new([row]));
    }
    Ok(())
}

async fn handle_events(
    session: Arc<Session<Me>>,
    entity: Option<String>,
    retry_delay: Duration,
    json: bool,
) -> nuagerest::Result<()> {
    let push_center = PushCenter::new(session).with_retry_delay(retry_delay);

    push_center.register_handler(Identity::ALL, move |event| {
        if entity.as_deref().is_some_and(|e| e != event.entity_type) {
            return;
        }
        if let Err(e) = print_event(event, json) {
            eprintln!("Error: {e}");
        }
    });
    push_center.start()?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Unable to listen for Ctrl-C: {}", e);
    }
    push_center.shutdown().await;
    Ok(())
}

fn print_event(event: &Event, json: bool) -> nuagerest::Result<()> {
    if json {
        println!("{}", serde_json::to_string(event).map_err(NuageError::Json)?);
    } else {
        println!("{}", Table::new([EventRow::from(event)]));
    }
    Ok(())
}

// Table row types for non-JSON output

#[derive(Tabled)]
struct MeRow {
    id: String,
    user: String,
    enterprise: String,
    role: String,
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "type")]
    event_type: String,
    entity: String,
    id: String,
    mechanism: String,
}

impl From<&Event> for EventRow {
    fn from(e: &Event) -> Self {
        Self {
            event_type: e.event_type.clone(),
            entity: e.entity_type.clone(),
            id: e
                .entities
                .first()
                .and_then(|entity| entity.get("ID"))
                .and_then(|id| id.as_str())
                .unwrap_or_default()
                .to_string(),
            mechanism: e.update_mechanism.clone(),
        }
    }
}
