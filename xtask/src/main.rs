//! Build automation tasks for Trainflow
//!
//! - Generating CLI documentation from the clap definitions

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for Trainflow", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<trainflow_engine::cli::Cli>();

    let content = format!(
        r#"# Trainflow CLI Reference

Generated from the CLI source code on {}.

## Quick Start

```bash
export TRAINFLOW_STORE=postgres
export DATABASE_URL=postgresql://localhost/trainflow
trainflow migrate

trainflow flow create --title "Forklift safety" --author <uuid> --activate
trainflow assignment create --flow <flow-id> --user <uuid> --by <uuid>
trainflow assignment content <assignment-id>
```

## Commands

{}

## Environment Variables

- `TRAINFLOW_STORE` - `memory` (default) or `postgres`
- `DATABASE_URL` - PostgreSQL connection string
- `TRAINFLOW_SNAPSHOT_STRATEGY` - `reference` (default) or `materialized`
- `TRAINFLOW_CREATE_RETRIES` - attempts for writes that lose a race (default: 3)
- `TRAINFLOW_DAYS_PER_STEP`, `TRAINFLOW_MIN_COMPLETION_DAYS` - due date estimate
- `LOG_LEVEL`, `LOG_FORMAT`, `LOG_OUTPUT`, `LOG_FILTER` - logging

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
