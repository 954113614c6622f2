// src/commands/mod.rs

//! Command implementations behind the CLI

use crate::config::{AgentConfig, MasterConfig};
use crate::error::{Error, Result};
use crate::server::{self, AgentState};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Default port the agent serves on, used for the registration default url
const DEFAULT_PORT: u16 = 10072;

/// Run the agent server until stopped
pub fn serve(config: &AgentConfig) -> Result<()> {
    let state = Arc::new(AgentState::from_config(config));

    if !state.master.has_master() {
        info!("Node is not registered with a master yet; requests will be rejected");
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::serve(&config.server.bind, state))
}

/// Credentials issued by the master on registration
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    id: String,
    secret: String,
    master_secret: String,
}

/// Register this node with a master server and persist the credentials
pub fn register(
    config: &AgentConfig,
    master_url: &str,
    token: &str,
    node_url: Option<String>,
    name: Option<String>,
) -> Result<()> {
    let hostname = nix::unistd::gethostname()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string());

    let name = name.unwrap_or_else(|| hostname.clone());
    let node_url = node_url.unwrap_or_else(|| format!("https://{hostname}:{DEFAULT_PORT}/"));

    let body = serde_json::json!({
        "name": name,
        "url": node_url,
    });

    let client = reqwest::blocking::Client::new();
    let response = client
        .post(format!(
            "{}/node/register",
            master_url.trim_end_matches('/')
        ))
        .header(AUTHORIZATION, token)
        .json(&body)
        .send()?;

    if !response.status().is_success() {
        return Err(Error::Registration(format!(
            "Master responded with {}",
            response.status()
        )));
    }

    let data: RegisterResponse = response.json()?;

    let master = MasterConfig::load(&config.paths.master_config);
    master.create(data.id, data.secret, master_url.to_string(), data.master_secret)?;

    println!("Node registered successfully");
    Ok(())
}

/// Forget the stored master registration
pub fn unregister(config: &AgentConfig) -> Result<()> {
    let master = MasterConfig::load(&config.paths.master_config);
    master.clear();
    println!("Master registration cleared");
    Ok(())
}

/// Print the node's identity and aggregated state as JSON
pub fn info(config: &AgentConfig) -> Result<()> {
    let state = AgentState::from_config(config);
    let status = state.info.status();
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
