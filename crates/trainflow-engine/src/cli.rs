//! Command-line interface over the engine
//!
//! Every subcommand maps onto one feature handler and prints its response as
//! JSON. With the in-memory store nothing outlives the process, so the flow
//! and assignment subcommands are only useful against PostgreSQL.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::config::{Config, StoreBackend};
use crate::db;
use crate::features::{assignments, flow_versions, ranks};
use crate::models::{AssignmentStatus, FlowFields, FlowPriority};
use crate::services::Engine;

/// Trainflow - versioned training flows
#[derive(Parser, Debug)]
#[command(name = "trainflow")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply database migrations
    Migrate,

    /// Load and validate configuration, then print it
    CheckConfig,

    /// Rank key utilities
    Rank {
        #[command(subcommand)]
        command: RankCommand,
    },

    /// Manage flow versions
    Flow {
        #[command(subcommand)]
        command: FlowCommand,
    },

    /// Manage assignments
    Assignment {
        #[command(subcommand)]
        command: AssignmentCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum RankCommand {
    /// Key strictly between two neighbours
    Between {
        #[arg(long)]
        lower: Option<String>,
        #[arg(long)]
        upper: Option<String>,
    },

    /// Evenly spaced keys for a new list
    Spaced { count: usize },
}

#[derive(Subcommand, Debug)]
pub enum FlowCommand {
    /// Create a flow, or the next version of an existing one
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Existing flow to version
        #[arg(long)]
        flow: Option<Uuid>,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long, default_value = "medium")]
        priority: FlowPriority,
        #[arg(long)]
        required: bool,
        #[arg(long)]
        author: Uuid,
        /// Activate the new version right away
        #[arg(long)]
        activate: bool,
    },

    /// Make a version the active one
    Activate {
        version_id: Uuid,
        #[arg(long)]
        by: Uuid,
        /// Activate even if open assignments remain on the current version
        #[arg(short, long)]
        force: bool,
    },

    /// Show the active version with its content
    Active { flow: Uuid },

    /// List every version of a flow
    Versions { flow: Uuid },
}

#[derive(Subcommand, Debug)]
pub enum AssignmentCommand {
    /// Assign the active version of a flow to a user
    Create {
        #[arg(long)]
        flow: Uuid,
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        by: Uuid,
    },

    /// Change an assignment's status
    Status {
        assignment_id: Uuid,
        status: AssignmentStatus,
        #[arg(long)]
        by: Uuid,
    },

    /// Print the content an assignment is bound to
    Content { assignment_id: Uuid },
}

/// Run one parsed command against the configured store.
pub async fn execute(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Migrate => {
            let pool = db::create_pool(&config.database).await?;
            db::run_migrations(&pool).await?;
            println!("Migrations applied");
        },
        Commands::CheckConfig => {
            config.validate()?;
            print_json(&config)?;
        },
        Commands::Rank { command } => run_rank(command).await?,
        Commands::Flow { command } => run_flow(command, engine(&config).await?).await?,
        Commands::Assignment { command } => {
            run_assignment(command, engine(&config).await?).await?
        },
    }
    Ok(())
}

async fn engine(config: &Config) -> Result<Engine> {
    match config.store {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; nothing is kept after this command");
            Ok(Engine::in_memory(&config.versioning))
        },
        StoreBackend::Postgres => {
            let pool = db::create_pool(&config.database)
                .await
                .context("Failed to connect to PostgreSQL")?;
            Ok(Engine::postgres(pool, &config.versioning))
        },
    }
}

async fn run_rank(command: RankCommand) -> Result<()> {
    match command {
        RankCommand::Between { lower, upper } => {
            let response =
                ranks::queries::resolve_between::handle(ranks::ResolveRankQuery { lower, upper })
                    .await?;
            println!("{}", response.rank);
        },
        RankCommand::Spaced { count } => {
            let response =
                ranks::queries::spaced::handle(ranks::GenerateSpacedRanksQuery { count }).await?;
            for rank in response.ranks {
                println!("{rank}");
            }
        },
    }
    Ok(())
}

async fn run_flow(command: FlowCommand, engine: Engine) -> Result<()> {
    match command {
        FlowCommand::Create {
            title,
            description,
            flow,
            tags,
            priority,
            required,
            author,
            activate,
        } => {
            let response = flow_versions::commands::create::handle(
                engine,
                flow_versions::CreateFlowVersionCommand {
                    original_flow_id: flow,
                    author_id: author,
                    fields: FlowFields {
                        title,
                        description,
                        tags,
                        priority,
                        is_required: required,
                    },
                    activate_immediately: activate,
                },
            )
            .await?;
            print_json(&response)
        },
        FlowCommand::Activate {
            version_id,
            by,
            force,
        } => {
            let response = flow_versions::commands::activate::handle(
                engine,
                flow_versions::ActivateFlowVersionCommand {
                    flow_version_id: version_id,
                    activated_by_id: by,
                    force_activation: force,
                },
            )
            .await?;
            print_json(&response)
        },
        FlowCommand::Active { flow } => {
            let response = flow_versions::queries::get_active::handle(
                engine,
                flow_versions::GetActiveFlowVersionQuery {
                    original_flow_id: flow,
                },
            )
            .await?;
            print_json(&response)
        },
        FlowCommand::Versions { flow } => {
            let response = flow_versions::queries::list_versions::handle(
                engine,
                flow_versions::ListFlowVersionsQuery {
                    original_flow_id: flow,
                },
            )
            .await?;
            print_json(&response)
        },
    }
}

async fn run_assignment(command: AssignmentCommand, engine: Engine) -> Result<()> {
    match command {
        AssignmentCommand::Create { flow, user, by } => {
            let response = assignments::commands::assign::handle(
                engine,
                assignments::AssignFlowCommand {
                    user_id: user,
                    original_flow_id: flow,
                    assigned_by_id: by,
                },
            )
            .await?;
            print_json(&response)
        },
        AssignmentCommand::Status {
            assignment_id,
            status,
            by,
        } => {
            let response = assignments::commands::update_status::handle(
                engine,
                assignments::UpdateAssignmentStatusCommand {
                    assignment_id,
                    status,
                    updated_by_id: by,
                },
            )
            .await?;
            print_json(&response)
        },
        AssignmentCommand::Content { assignment_id } => {
            let response = assignments::queries::resolve_content::handle(
                engine,
                assignments::ResolveAssignmentContentQuery { assignment_id },
            )
            .await?;
            print_json(&response)
        },
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flow_create() {
        let author = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "trainflow",
            "flow",
            "create",
            "--title",
            "Safety",
            "--tags",
            "a,b",
            "--priority",
            "high",
            "--author",
            &author.to_string(),
            "--activate",
        ])
        .unwrap();
        match cli.command {
            Commands::Flow {
                command:
                    FlowCommand::Create {
                        tags,
                        priority,
                        activate,
                        ..
                    },
            } => {
                assert_eq!(tags, ["a", "b"]);
                assert_eq!(priority, FlowPriority::High);
                assert!(activate);
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_assignment_status() {
        let id = Uuid::new_v4();
        let by = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "trainflow",
            "assignment",
            "status",
            &id.to_string(),
            "in_progress",
            "--by",
            &by.to_string(),
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Assignment {
                command: AssignmentCommand::Status {
                    status: AssignmentStatus::InProgress,
                    ..
                }
            }
        ));
    }
}
