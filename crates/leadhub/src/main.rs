// SPDX-FileCopyrightText: 2026 Leadhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Leadhub - lead identity resolution and cross-channel message routing.
//!
//! Binary entry point: webhook/relay server plus operational batch commands.

mod serve;
mod shutdown;

use clap::{Parser, Subcommand};
use leadhub_binding::BindingValidator;
use leadhub_config::model::LeadhubConfig;
use leadhub_core::LeadhubError;
use leadhub_reconcile::Reconciler;
use leadhub_storage::Database;
use leadhub_sync::MemberSyncOrchestrator;
use tracing::error;

/// Leadhub - lead identity resolution and cross-channel message routing.
#[derive(Parser, Debug)]
#[command(name = "leadhub", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook ingress and realtime relay server.
    Serve,
    /// Run the invariant repair passes over one tenant.
    Reconcile {
        /// Tenant to reconcile.
        #[arg(long)]
        tenant: String,
    },
    /// Import a tenant's commerce memberships as won leads.
    SyncMembers {
        /// Tenant whose memberships to import.
        #[arg(long)]
        tenant: String,
    },
    /// Import the bound guild's members as leads for one app user.
    SyncGuild {
        /// App user whose chat binding to sync.
        #[arg(long)]
        user: String,
    },
    /// Validate every active chat binding and deactivate stale ones.
    CheckBindings,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match leadhub_config::load_and_validate() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("leadhub: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.engine.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Reconcile { tenant }) => run_reconcile(&config, &tenant).await,
        Some(Commands::SyncMembers { tenant }) => run_sync_members(&config, &tenant).await,
        Some(Commands::SyncGuild { user }) => run_sync_guild(&config, &user).await,
        Some(Commands::CheckBindings) => run_check_bindings(&config).await,
        None => {
            println!("leadhub: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        error!(error = %e, "command failed");
        eprintln!("leadhub: {e}");
        std::process::exit(1);
    }
}

async fn run_reconcile(config: &LeadhubConfig, tenant: &str) -> Result<(), LeadhubError> {
    let db = Database::open(&config.storage.database_path).await?;
    let cancel = shutdown::install_signal_handler();

    let report = Reconciler::new(db.clone()).reconcile_tenant(tenant, &cancel).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report)
            .map_err(|e| LeadhubError::Internal(format!("report serialization: {e}")))?
    );

    db.close().await?;
    Ok(())
}

async fn run_sync_members(config: &LeadhubConfig, tenant: &str) -> Result<(), LeadhubError> {
    let db = Database::open(&config.storage.database_path).await?;
    let chat = leadhub_platforms::chat_capability(&config.chat)?;
    let commerce = leadhub_platforms::commerce_capability(&config.commerce)?;

    let result = MemberSyncOrchestrator::new(db.clone(), chat, commerce)
        .sync_members(tenant)
        .await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&result)
            .map_err(|e| LeadhubError::Internal(format!("result serialization: {e}")))?
    );

    db.close().await?;
    Ok(())
}

async fn run_sync_guild(config: &LeadhubConfig, user: &str) -> Result<(), LeadhubError> {
    let db = Database::open(&config.storage.database_path).await?;
    let chat = leadhub_platforms::chat_capability(&config.chat)?;
    let commerce = leadhub_platforms::commerce_capability(&config.commerce)?;

    let result = MemberSyncOrchestrator::new(db.clone(), chat, commerce)
        .with_binding_validation(config.sync.validate_binding)
        .sync_guild_members(user)
        .await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&result)
            .map_err(|e| LeadhubError::Internal(format!("result serialization: {e}")))?
    );

    db.close().await?;
    Ok(())
}

async fn run_check_bindings(config: &LeadhubConfig) -> Result<(), LeadhubError> {
    let db = Database::open(&config.storage.database_path).await?;
    let chat = leadhub_platforms::chat_capability(&config.chat)?;

    let stale = BindingValidator::new(db.clone(), chat).sweep().await?;
    if stale.is_empty() {
        println!("all active bindings are valid");
    } else {
        for (binding_id, reason) in stale {
            println!("deactivated binding {binding_id}: {reason}");
        }
    }

    db.close().await?;
    Ok(())
}

/// Initialize the tracing subscriber from config, honoring `RUST_LOG`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("leadhub={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = leadhub_config::load_and_validate()
            .expect("default config should be valid");
        assert_eq!(config.gateway.port, 8090);
    }
}
