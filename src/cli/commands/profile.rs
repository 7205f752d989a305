//! Profile CLI commands.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::sqlite::{PoolConfig, SqliteDocumentStore};
use crate::cli::output::{list_table, output, render_list, CommandOutput};
use crate::domain::models::{Config, Profile};
use crate::repository::{LoadState, ProfileRepository};

#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Show a stored profile
    Show {
        /// Player UUID
        uuid: Uuid,
    },
    /// Create a profile, or show it if it already exists
    Create {
        /// Player UUID; random when omitted
        uuid: Option<Uuid>,
    },
    /// Flip a player's PvP flag
    TogglePvp {
        /// Player UUID
        uuid: Uuid,
    },
    /// List every stored profile
    List,
}

#[derive(Debug, Serialize)]
pub struct ProfileOutput {
    pub uuid: String,
    pub pvp_enabled: bool,
    pub first_seen: String,
    pub play_time_ms: i64,
    pub last_opponent: Option<String>,
}

impl From<&Profile> for ProfileOutput {
    fn from(profile: &Profile) -> Self {
        Self {
            uuid: profile.uuid.to_string(),
            pvp_enabled: profile.pvp_enabled,
            first_seen: profile.first_seen.to_rfc3339(),
            play_time_ms: profile.play_time_ms,
            last_opponent: profile.last_opponent.map(|u| u.to_string()),
        }
    }
}

impl CommandOutput for ProfileOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Profile: {}", self.uuid),
            format!("PvP: {}", if self.pvp_enabled { "enabled" } else { "disabled" }),
            format!("First seen: {}", self.first_seen),
            format!("Play time: {}s", self.play_time_ms / 1000),
        ];
        if let Some(opponent) = &self.last_opponent {
            lines.push(format!("Last opponent: {opponent}"));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileListOutput {
    pub profiles: Vec<ProfileOutput>,
    pub total: usize,
    /// Set when the initial scan did not finish cleanly
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl CommandOutput for ProfileListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["uuid", "pvp", "first seen", "play time"]);
        for profile in &self.profiles {
            table.add_row(vec![
                profile.uuid.clone(),
                if profile.pvp_enabled { "on" } else { "off" }.to_string(),
                profile.first_seen.clone(),
                format!("{}s", profile.play_time_ms / 1000),
            ]);
        }
        let rendered = render_list("profile", &table, self.total);
        match &self.warning {
            Some(warning) => format!("{rendered}\n\nWarning: {warning}"),
            None => rendered,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileActionOutput {
    pub success: bool,
    pub message: String,
    pub profile: ProfileOutput,
}

impl CommandOutput for ProfileActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }
}

pub async fn execute(args: ProfileArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store =
        SqliteDocumentStore::connect(&config.database.url, Some(PoolConfig::from(&config.database)))
            .await
            .context("Failed to open document store")?;
    let profiles = ProfileRepository::open(&store);

    match args.command {
        ProfileCommands::Show { uuid } => {
            let Some(profile) = profiles
                .find(&uuid)
                .await
                .context("Failed to read profile")?
            else {
                bail!("Profile not found: {uuid}");
            };
            output(&ProfileOutput::from(&profile), json_mode);
        }
        ProfileCommands::Create { uuid } => {
            let uuid = uuid.unwrap_or_else(Uuid::new_v4);
            let profile = profiles
                .get_or_create(uuid)
                .await
                .context("Failed to create profile")?;
            let out = ProfileActionOutput {
                success: true,
                message: format!("Profile ready: {uuid}"),
                profile: ProfileOutput::from(&profile),
            };
            output(&out, json_mode);
        }
        ProfileCommands::TogglePvp { uuid } => {
            let enabled = profiles
                .toggle_pvp(uuid)
                .await
                .context("Failed to toggle PvP")?;
            let profile = profiles
                .cached(&uuid)
                .context("Profile missing from cache after save")?;
            let out = ProfileActionOutput {
                success: true,
                message: format!(
                    "PvP {} for {uuid}",
                    if enabled { "enabled" } else { "disabled" }
                ),
                profile: ProfileOutput::from(&profile),
            };
            output(&out, json_mode);
        }
        ProfileCommands::List => {
            let warning = match profiles.wait_until_loaded().await {
                state @ LoadState::Complete { .. } if state.skipped() == 0 => None,
                LoadState::Complete {
                    skipped_keys,
                    skipped_records,
                    ..
                } => Some(format!(
                    "{skipped_records} stored profile(s) could not be read, {skipped_keys} had an invalid UUID"
                )),
                LoadState::Failed(reason) => Some(format!("initial load failed: {reason}")),
                state => Some(format!("initial load did not finish: {state:?}")),
            };
            let list: Vec<ProfileOutput> =
                profiles.all_cached().iter().map(ProfileOutput::from).collect();
            let out = ProfileListOutput {
                total: list.len(),
                profiles: list,
                warning,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
