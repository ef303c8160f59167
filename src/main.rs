use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tokio_stream::StreamExt;
use tonic::transport::Channel;
use tracing_subscriber::EnvFilter;

use pipeliner::config::ServerConfig;
use pipeliner::grpc::adapter::ProtoAdapter;
use pipeliner::grpc::runtime_service::RuntimeServiceImpl;
use pipeliner::grpc::GrpcServer;
use pipeliner::progress::LogProgressObserver;
use pipeliner::proto;
use pipeliner::proto::runtime_service_client::RuntimeServiceClient;
use pipeliner::shutdown::shutdown_token;
use pipeliner::store::{LocalJobService, MemoryProjectRepository, MemoryPublisher};
use pipeliner::units::default_registry;

#[derive(Parser)]
#[command(name = "pipeliner")]
#[command(version)]
#[command(about = "Control plane for data-pipeline orchestration")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the control-plane server
    Server {
        /// Port to listen on for gRPC
        #[arg(long, default_value = "9100")]
        port: u16,
    },

    /// Print the server's version
    Version {
        #[command(flatten)]
        client: ClientArgs,
    },

    /// Project management commands
    Project {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Job management commands
    Job {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: JobCommands,
    },
}

#[derive(Parser)]
struct ClientArgs {
    /// Server address
    #[arg(long, short = 'a', default_value = "http://127.0.0.1:9100")]
    addr: String,
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Register (or update) a project
    Register {
        name: String,

        /// Project config entries, format KEY=VALUE
        #[arg(long = "config", value_name = "KEY=VALUE")]
        config: Vec<String>,
    },
}

#[derive(Subcommand)]
enum JobCommands {
    /// Deploy job specifications from a JSON file, streaming one
    /// acknowledgment per job
    Deploy {
        /// Project the jobs belong to
        #[arg(long)]
        project: String,

        /// JSON file holding an array of job definitions
        file: PathBuf,
    },
    /// Fetch one committed job specification
    Get {
        #[arg(long)]
        project: String,

        name: String,
    },
}

// =============================================================================
// Job definition file format
// =============================================================================

#[derive(Deserialize)]
struct NameValue {
    name: String,
    value: String,
}

#[derive(Deserialize)]
struct WindowEntry {
    #[serde(default)]
    size_secs: i64,
    #[serde(default)]
    offset_secs: i64,
    #[serde(default)]
    truncate_to: String,
}

#[derive(Deserialize)]
struct TaskEntry {
    name: String,
    #[serde(default)]
    config: Vec<NameValue>,
    #[serde(default)]
    priority: i32,
    window: Option<WindowEntry>,
}

#[derive(Deserialize)]
struct DependencyEntry {
    job: String,
    #[serde(default)]
    project: String,
}

#[derive(Deserialize)]
struct HookEntry {
    name: String,
    #[serde(default)]
    config: Vec<NameValue>,
}

#[derive(Deserialize)]
struct JobDefinition {
    name: String,
    owner: String,
    #[serde(default)]
    version: i32,
    #[serde(default)]
    description: String,
    #[serde(default)]
    labels: Vec<NameValue>,
    #[serde(default)]
    catch_up: bool,
    #[serde(default)]
    depends_on_past: bool,
    start_date: String,
    interval: String,
    task: TaskEntry,
    #[serde(default)]
    assets: Vec<NameValue>,
    #[serde(default)]
    dependencies: Vec<DependencyEntry>,
    #[serde(default)]
    hooks: Vec<HookEntry>,
}

fn name_values_to_config(entries: Vec<NameValue>) -> Vec<proto::ConfigEntry> {
    entries
        .into_iter()
        .map(|e| proto::ConfigEntry {
            name: e.name,
            value: e.value,
        })
        .collect()
}

fn job_definition_to_proto(def: JobDefinition) -> proto::JobSpecification {
    proto::JobSpecification {
        name: def.name,
        owner: def.owner,
        version: def.version,
        description: def.description,
        labels: def
            .labels
            .into_iter()
            .map(|l| proto::LabelEntry {
                name: l.name,
                value: l.value,
            })
            .collect(),
        catch_up: def.catch_up,
        depends_on_past: def.depends_on_past,
        start_date: def.start_date,
        interval: def.interval,
        task_name: def.task.name,
        config: name_values_to_config(def.task.config),
        priority: def.task.priority,
        window: def.task.window.map(|w| proto::TaskWindow {
            size_secs: w.size_secs,
            offset_secs: w.offset_secs,
            truncate_to: w.truncate_to,
        }),
        assets: def
            .assets
            .into_iter()
            .map(|a| proto::AssetEntry {
                name: a.name,
                value: a.value,
            })
            .collect(),
        dependencies: def
            .dependencies
            .into_iter()
            .map(|d| proto::JobDependency {
                job_name: d.job,
                project_name: d.project,
            })
            .collect(),
        hooks: def
            .hooks
            .into_iter()
            .map(|h| proto::JobHook {
                name: h.name,
                config: name_values_to_config(h.config),
            })
            .collect(),
    }
}

// =============================================================================
// Server
// =============================================================================

async fn run_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let listen_addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
    let config = ServerConfig::new(listen_addr);

    let registry = Arc::new(default_registry());
    let adapter = ProtoAdapter::new(registry);
    let project_repo = Arc::new(MemoryProjectRepository::new());
    let publisher = Arc::new(MemoryPublisher::new());
    let job_service = Arc::new(LocalJobService::new(publisher));

    let service = RuntimeServiceImpl::new(
        config.clone(),
        project_repo,
        job_service,
        adapter,
        Arc::new(LogProgressObserver),
    );

    let shutdown = shutdown_token();

    tracing::info!(version = %config.version, "starting pipeliner control plane");
    GrpcServer::new(listen_addr, service).run(shutdown).await?;

    Ok(())
}

// =============================================================================
// Client command handlers
// =============================================================================

async fn connect(addr: &str) -> Result<RuntimeServiceClient<Channel>, Box<dyn std::error::Error>> {
    let channel = Channel::from_shared(addr.to_string())?.connect().await?;
    Ok(RuntimeServiceClient::new(channel))
}

async fn handle_version(
    client: &mut RuntimeServiceClient<Channel>,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = client
        .version(proto::VersionRequest {
            client: env!("CARGO_PKG_VERSION").to_string(),
        })
        .await?
        .into_inner();

    println!("Server: {}", response.server);
    println!("Client: {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}

async fn handle_project_register(
    client: &mut RuntimeServiceClient<Channel>,
    name: String,
    config: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut entries = std::collections::HashMap::new();
    for item in config {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| format!("invalid config entry {:?}, expected KEY=VALUE", item))?;
        entries.insert(key.to_string(), value.to_string());
    }

    let response = client
        .register_project(proto::RegisterProjectRequest {
            project: Some(proto::ProjectSpecification {
                name,
                config: entries,
            }),
        })
        .await?
        .into_inner();

    println!("{}", response.message);
    Ok(())
}

async fn handle_job_deploy(
    client: &mut RuntimeServiceClient<Channel>,
    project: String,
    file: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let contents = tokio::fs::read_to_string(&file).await?;
    let definitions: Vec<JobDefinition> = serde_json::from_str(&contents)?;
    let jobs: Vec<proto::JobSpecification> = definitions
        .into_iter()
        .map(job_definition_to_proto)
        .collect();

    println!("Deploying {} job(s) to project {}...", jobs.len(), project);

    let mut stream = client
        .deploy_specification(proto::DeploySpecificationRequest {
            project_name: project,
            jobs,
        })
        .await?
        .into_inner();

    let mut failed = 0usize;
    while let Some(ack) = stream.next().await {
        let ack = ack?;
        if ack.success {
            println!("  [+] {}", ack.job_name);
        } else {
            failed += 1;
            println!("  [-] {}: {}", ack.job_name, ack.message);
        }
    }

    if failed > 0 {
        eprintln!("{} job(s) failed to upload", failed);
        std::process::exit(1);
    }
    println!("Deploy complete.");
    Ok(())
}

async fn handle_job_get(
    client: &mut RuntimeServiceClient<Channel>,
    project: String,
    name: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = client
        .get_job(proto::GetJobRequest {
            project_name: project,
            job_name: name,
        })
        .await?
        .into_inner();

    if let Some(project) = response.project {
        println!("Project: {}", project.name);
    }
    if let Some(job) = response.job {
        println!("Job:      {}", job.name);
        println!("Owner:    {}", job.owner);
        println!("Version:  {}", job.version);
        println!("Task:     {}", job.task_name);
        println!("Interval: {}", job.interval);
        println!("Start:    {}", job.start_date);
        if !job.dependencies.is_empty() {
            println!("Dependencies:");
            for dep in job.dependencies {
                if dep.project_name.is_empty() {
                    println!("  {}", dep.job_name);
                } else {
                    println!("  {}/{}", dep.project_name, dep.job_name);
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// Main entry point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Server { port } => {
            run_server(port).await?;
        }
        Commands::Version { client } => {
            let mut grpc_client = connect(&client.addr).await?;
            handle_version(&mut grpc_client).await?;
        }
        Commands::Project { client, command } => {
            let mut grpc_client = connect(&client.addr).await?;
            match command {
                ProjectCommands::Register { name, config } => {
                    handle_project_register(&mut grpc_client, name, config).await?;
                }
            }
        }
        Commands::Job { client, command } => {
            let mut grpc_client = connect(&client.addr).await?;
            match command {
                JobCommands::Deploy { project, file } => {
                    handle_job_deploy(&mut grpc_client, project, file).await?;
                }
                JobCommands::Get { project, name } => {
                    handle_job_get(&mut grpc_client, project, name).await?;
                }
            }
        }
    }

    Ok(())
}
