//! Command-line interface for the semantic marshaller.

mod request;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use marshaller_codecs::CodecRegistry;
use marshaller_concepts::{
    fixtures, ConceptRepository, HttpRegistryClient, InMemoryRegistry, RegistryClient,
};
use marshaller_core::MarshallerConfig;
use marshaller_mapping::{CastRegistry, Marshaller};
use serde::Serialize;
use tracing::info;

use request::{
    ConfigurablesRequest, MarshalRequest, MarshalV2Request, PathOptionsRequest, UnmarshalRequest,
    UnmarshalV2Request,
};

/// Semantic marshaller - map characteristic values to device messages and back.
#[derive(Parser, Debug)]
#[command(name = "marshaller")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Configuration file (defaults to ./marshaller.toml when present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Load concepts from a registry dump instead of the remote registry.
    #[arg(long, global = true, conflicts_with = "example_registry")]
    registry_file: Option<PathBuf>,

    /// Use the built-in example registry.
    #[arg(long, global = true)]
    example_registry: bool,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands. Each reads one JSON request file.
#[derive(Subcommand, Debug)]
enum Command {
    /// Marshal a value into every matching service input.
    Marshal { request: PathBuf },
    /// Unmarshal the best matching service output.
    Unmarshal { request: PathBuf },
    /// Marshal values addressed by path or function.
    MarshalV2 { request: PathBuf },
    /// Unmarshal the value at one output path.
    UnmarshalV2 { request: PathBuf },
    /// List concepts every given service accepts as extra input.
    Configurables { request: PathBuf },
    /// List candidate paths for a function per device type.
    PathOptions { request: PathBuf },
    /// Load the concept repository and print its size.
    Concepts,
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "marshaller={0},marshaller_mapping={0},marshaller_concepts={0},warn",
            default_level
        ))
    });

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

fn registry_client(args: &Args, config: &MarshallerConfig) -> Result<Arc<dyn RegistryClient>> {
    if args.example_registry {
        return Ok(Arc::new(fixtures::registry()));
    }
    if let Some(path) = &args.registry_file {
        return Ok(Arc::new(InMemoryRegistry::from_json_file(path)?));
    }
    Ok(Arc::new(HttpRegistryClient::new(&config.registry)?))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = MarshallerConfig::load(args.config.as_deref())?;

    init_logging(args.verbose, config.log_json);

    let client = registry_client(&args, &config)?;
    let repository = Arc::new(ConceptRepository::connect(client.as_ref()).await?);
    let stats = repository.stats();
    info!(
        category = "startup",
        concepts = stats.concepts,
        characteristics = stats.characteristics,
        functions = stats.functions,
        aspects = stats.aspects,
        "Concept repository loaded"
    );

    let marshaller = Marshaller::new(
        repository,
        Arc::new(CastRegistry::builtin()?),
        Arc::new(CodecRegistry::with_defaults()),
    )
    .with_missing_path(config.unmarshal.missing_path);

    match &args.command {
        Command::Marshal { request } => marshal(&marshaller, request),
        Command::Unmarshal { request } => unmarshal(&marshaller, request),
        Command::MarshalV2 { request } => marshal_v2(&marshaller, request),
        Command::UnmarshalV2 { request } => unmarshal_v2(&marshaller, request),
        Command::Configurables { request } => configurables(&marshaller, request),
        Command::PathOptions { request } => {
            path_options(&marshaller, client.as_ref(), request).await
        }
        Command::Concepts => {
            println!(
                "{} concepts, {} characteristics, {} functions, {} aspect nodes",
                stats.concepts, stats.characteristics, stats.functions, stats.aspects
            );
            Ok(())
        }
    }
}

fn marshal(marshaller: &Marshaller, path: &Path) -> Result<()> {
    let r: MarshalRequest = request::read(path)?;
    let wire = marshaller.marshal_inputs(
        &r.protocol,
        &r.service,
        &r.value,
        &r.characteristic_id,
        &r.path_allow_list,
        &r.configurables,
    )?;
    print_json(&wire)
}

fn unmarshal(marshaller: &Marshaller, path: &Path) -> Result<()> {
    let r: UnmarshalRequest = request::read(path)?;
    let value = marshaller.unmarshal_outputs(
        &r.protocol,
        &r.service,
        &r.message,
        &r.characteristic_id,
        &r.path_allow_list,
        &r.hints,
    )?;
    print_json(&value)
}

fn marshal_v2(marshaller: &Marshaller, path: &Path) -> Result<()> {
    let r: MarshalV2Request = request::read(path)?;
    print_json(&marshaller.marshal_v2(&r.protocol, &r.service, &r.inputs)?)
}

fn unmarshal_v2(marshaller: &Marshaller, path: &Path) -> Result<()> {
    let r: UnmarshalV2Request = request::read(path)?;
    let value = marshaller.unmarshal_v2(
        &r.protocol,
        &r.service,
        r.characteristic_id.as_deref(),
        &r.path,
        &r.message,
    )?;
    print_json(&value)
}

fn configurables(marshaller: &Marshaller, path: &Path) -> Result<()> {
    let r: ConfigurablesRequest = request::read(path)?;
    print_json(&marshaller.find_configurables(&r.characteristic_id, &r.services)?)
}

async fn path_options(
    marshaller: &Marshaller,
    client: &dyn RegistryClient,
    path: &Path,
) -> Result<()> {
    let r: PathOptionsRequest = request::read(path)?;
    let options = marshaller
        .get_path_options(
            client,
            &r.device_type_ids,
            &r.function_id,
            r.aspect_id.as_deref(),
            &r.characteristic_filter,
            r.with_envelope,
        )
        .await?;
    print_json(&options)
}
