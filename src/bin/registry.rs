//! Schema Registry CLI
//!
//! Register, evolve, read and delete schemas in a file-backed registry.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use schema_lifecycle::{
    Compatibility, FileStorage, QualifiedName, RegisterSchemaRequest, SchemaConfig, SchemaService,
    SchemaType, UpdateSchemaRequest,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-registry")]
#[command(about = "Register and evolve versioned schemas")]
struct Cli {
    /// Config file layered over the default locations
    #[arg(short, long)]
    config: Option<String>,

    /// Storage directory (overrides storage.path)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Actor checked against access control
    #[arg(long, default_value = "cli")]
    actor: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct NameArgs {
    tenant: String,
    subject: String,
    name: String,
}

impl NameArgs {
    fn qualified(&self) -> QualifiedName {
        QualifiedName::new(&self.tenant, &self.subject, &self.name)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new schema (version 1)
    Register {
        #[command(flatten)]
        name: NameArgs,
        /// File holding the IDL
        #[arg(long)]
        idl: PathBuf,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "avro")]
        schema_type: SchemaType,
        #[arg(long, default_value = "backward")]
        compatibility: Compatibility,
    },

    /// Append a new version to an existing schema
    Update {
        #[command(flatten)]
        name: NameArgs,
        #[arg(long)]
        idl: PathBuf,
        #[arg(long)]
        owner: String,
    },

    /// Delete a schema and its history
    Delete {
        #[command(flatten)]
        name: NameArgs,
    },

    /// Show a schema with all versions
    Get {
        #[command(flatten)]
        name: NameArgs,
    },

    /// Show records bound to a subject
    Subject {
        tenant: String,
        subject: String,
        /// Specific version (defaults to latest)
        #[arg(short, long)]
        version: Option<u64>,
        /// List every version
        #[arg(long, conflicts_with = "version")]
        all: bool,
    },

    /// Write the effective configuration to a file
    InitConfig {
        #[arg(default_value = "schema-registry.toml")]
        path: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match SchemaConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    if let Err(e) = run(cli, config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn open_service(root: Option<PathBuf>, mut config: SchemaConfig) -> anyhow::Result<SchemaService> {
    let root = root.unwrap_or(config.storage.path);
    let storage = FileStorage::open(&root)
        .with_context(|| format!("opening storage at {}", root.display()))?;

    if config.registry.upload_enabled {
        warn!("no dependency compiler is available from the CLI, disabling upload");
        config.registry.upload_enabled = false;
    }

    Ok(SchemaService::builder(Arc::new(storage))
        .config(config.registry)
        .build()?)
}

fn read_idl(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading IDL from {}", path.display()))
}

fn run(cli: Cli, config: SchemaConfig) -> anyhow::Result<()> {
    let actor = cli.actor.as_str();

    match cli.command {
        Commands::InitConfig { path } => {
            config.save(&path)?;
            println!("✅ Wrote configuration to {}", path);
            Ok(())
        }

        Commands::Register {
            name,
            idl,
            owner,
            description,
            schema_type,
            compatibility,
        } => {
            let service = open_service(cli.root, config)?;
            let mut request = RegisterSchemaRequest::new(owner, schema_type, read_idl(&idl)?)
                .with_compatibility(compatibility);
            request.description = description;

            let response = service.register(actor, &name.qualified(), request)?;
            println!(
                "✅ Registered {} (id {}, version {})",
                name.qualified(),
                response.schema_id,
                response.version
            );
            Ok(())
        }

        Commands::Update { name, idl, owner } => {
            let service = open_service(cli.root, config)?;
            let request = UpdateSchemaRequest::new(owner, read_idl(&idl)?);

            let response = service.update(actor, &name.qualified(), request)?;
            println!(
                "✅ Updated {} to version {}",
                name.qualified(),
                response.version
            );
            Ok(())
        }

        Commands::Delete { name } => {
            let service = open_service(cli.root, config)?;
            let deleted = service.delete(actor, &name.qualified())?;
            println!(
                "🗑  Deleted {} ({} versions)",
                deleted.qualified_name, deleted.last_version
            );
            Ok(())
        }

        Commands::Get { name } => {
            let service = open_service(cli.root, config)?;
            let schema = service.get(actor, &name.qualified())?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }

        Commands::Subject {
            tenant,
            subject,
            version,
            all,
        } => {
            let service = open_service(cli.root, config)?;
            let mut name = QualifiedName::new(tenant, subject, "");

            if all {
                let records = service.list_by_subject(actor, &name)?;
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                if let Some(version) = version {
                    name = name.with_version(version);
                }
                let record = service.get_by_subject(actor, &name)?;
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            Ok(())
        }
    }
}
