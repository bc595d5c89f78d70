use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod cli;
mod config;

use cli::Cli;
use cli::commands::{Commands, ProjectCommands};
use config::{Config, SandboxKind};
use vibe::credits::{CreditLedger, DEFAULT_KEY, UsageLedger};
use vibe::domain::{JobRecord, JobStatus, Message, MessageRole, MessageType};
use vibe::llm::{AnthropicClient, LlmClient};
use vibe::messages::MessageService;
use vibe::queue::{JobQueue, Worker};
use vibe::runner::CodeAgentFunction;
use vibe::steps::StepLedger;
use vibe::sandbox::{LocalSandboxProvider, RemoteSandboxConfig, RemoteSandboxProvider, SandboxProvider};
use vibe::storage::{JsonlStorage, MessageStore, ProjectStore};
use vibe::tree::{convert_files_to_tree_items, render_tree};

fn setup_logging(level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vibe")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("vibe.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG wins over the configured level
    let env = env_logger::Env::default().default_filter_or(level.unwrap_or("info"));
    env_logger::Builder::from_env(env)
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Shared handles opened from the configuration
struct App {
    config: Config,
    storage: Arc<JsonlStorage>,
    queue: Arc<JobQueue>,
    credits: Arc<UsageLedger>,
}

impl App {
    fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(
            JsonlStorage::new(&config.storage.dir)
                .context(format!("Failed to open storage at {}", config.storage.dir.display()))?,
        );
        let queue = Arc::new(JobQueue::new(storage.clone()));
        let credits = Arc::new(UsageLedger::new(storage.clone(), config.credit()));
        Ok(Self {
            config,
            storage,
            queue,
            credits,
        })
    }

    fn messages(&self) -> MessageService {
        MessageService::new(self.storage.clone(), self.queue.clone(), self.credits.clone(), DEFAULT_KEY)
    }

    fn sandbox_provider(&self) -> Result<Arc<dyn SandboxProvider>> {
        let sandbox = &self.config.sandbox;
        let command_timeout = Duration::from_millis(self.config.agent.command_timeout_ms);
        match sandbox.provider {
            SandboxKind::Local => {
                let mut provider = LocalSandboxProvider::new(&sandbox.base_dir, command_timeout);
                if let Some(templates) = &sandbox.templates_dir {
                    provider = provider.with_templates_dir(templates);
                }
                Ok(Arc::new(provider))
            }
            SandboxKind::Remote => {
                let api_key = std::env::var(&sandbox.api_key_env)
                    .context(format!("Sandbox API key not set: {}", sandbox.api_key_env))?;
                let provider = RemoteSandboxProvider::new(RemoteSandboxConfig {
                    api_url: sandbox.api_url.clone(),
                    api_key,
                    domain: sandbox.domain.clone(),
                    request_timeout: Duration::from_millis(sandbox.request_timeout_ms),
                    command_timeout,
                })?;
                Ok(Arc::new(provider))
            }
        }
    }

    fn worker(&self) -> Result<Worker> {
        let llm: Arc<dyn LlmClient> =
            Arc::new(AnthropicClient::new(self.config.anthropic()).context("Failed to create LLM client")?);
        let function = CodeAgentFunction::new(
            self.storage.clone(),
            llm,
            self.sandbox_provider()?,
            self.config.code_agent(),
        );
        Ok(Worker::new(self.queue.clone(), self.config.worker()).register(Arc::new(function)))
    }
}

fn print_message(message: &Message) {
    let who = match (message.role, message.message_type) {
        (MessageRole::User, _) => "you".cyan().bold(),
        (MessageRole::Assistant, MessageType::Result) => "vibe".green().bold(),
        (MessageRole::Assistant, MessageType::Error) => "vibe".red().bold(),
    };
    let when = message.created_at.format("%Y-%m-%d %H:%M");
    println!("{} {} {}", when.to_string().dimmed(), who, message.content);

    if let Some(fragment) = &message.fragment {
        println!(
            "    {} {} ({} file(s))",
            fragment.title.bold(),
            fragment.sandbox_url.underline(),
            fragment.files.len()
        );
    }
}

async fn run_application(cli: &Cli, app: &App) -> Result<()> {
    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Project { command } => handle_project_command(command, app),
        Commands::Send {
            project_id,
            prompt,
            detach,
        } => handle_send_command(project_id, prompt, *detach, app).await,
        Commands::Messages { project_id } => handle_messages_command(project_id, app),
        Commands::Files { project_id, content } => handle_files_command(project_id, *content, app),
        Commands::Worker => handle_worker_command(app).await,
        Commands::Jobs { job_id } => handle_jobs_command(job_id.as_deref(), app),
        Commands::Credits => handle_credits_command(app),
    }
}

fn handle_project_command(command: &ProjectCommands, app: &App) -> Result<()> {
    let projects = ProjectStore::new(app.storage.as_ref());
    match command {
        ProjectCommands::New { name } => {
            let name = name.clone().unwrap_or_else(vibe::id::generate_project_name);
            let project = projects.create(&name)?;
            println!("{} {} ({})", "Created:".green(), project.name.bold(), project.id);
        }
        ProjectCommands::List => {
            let all = projects.list()?;
            if all.is_empty() {
                println!("{}", "No projects yet. Create one with `vibe project new`.".yellow());
            }
            for project in all {
                println!(
                    "{}  {}  {}",
                    project.id,
                    project.name.bold(),
                    project.updated_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
                );
            }
        }
    }
    Ok(())
}

async fn handle_send_command(project_id: &str, prompt: &str, detach: bool, app: &App) -> Result<()> {
    info!("Sending request to project {}", project_id);
    // build the worker first so a missing API key fails before a credit is spent
    let worker = if detach { None } else { Some(app.worker()?) };

    let message = app.messages().create(project_id, prompt)?;
    print_message(&message);

    let Some(worker) = worker else {
        println!("{}", "Queued. Run `vibe worker` to process it.".cyan());
        return Ok(());
    };

    println!("{}", "Working...".cyan());
    let stats = worker.drain().await.context("Worker failed")?;
    if stats.failed > 0 {
        println!("{} {} job(s) failed, see the log for details", "Warning:".red(), stats.failed);
    }

    let reply = app
        .messages()
        .get_many(project_id)?
        .into_iter()
        .rev()
        .find(|m| m.role == MessageRole::Assistant && m.created_at >= message.created_at);
    match reply {
        Some(reply) => print_message(&reply),
        None => println!("{}", "No reply yet.".yellow()),
    }
    Ok(())
}

fn handle_messages_command(project_id: &str, app: &App) -> Result<()> {
    let messages = app.messages().get_many(project_id)?;
    if messages.is_empty() {
        println!("{}", "No messages.".yellow());
    }
    for message in &messages {
        print_message(message);
    }
    Ok(())
}

fn handle_files_command(project_id: &str, content: bool, app: &App) -> Result<()> {
    let Some(message) = MessageStore::new(app.storage.as_ref()).latest_fragment_message(project_id)? else {
        println!("{}", "No fragments yet.".yellow());
        return Ok(());
    };
    let Some(fragment) = message.fragment else {
        return Ok(());
    };

    println!("{} {}", fragment.title.bold(), fragment.sandbox_url.underline());
    print!("{}", render_tree(&convert_files_to_tree_items(&fragment.files)));

    if content {
        for (path, body) in &fragment.files {
            println!("\n{}\n{}", format!("== {} ==", path).cyan(), body);
        }
    }
    Ok(())
}

async fn handle_worker_command(app: &App) -> Result<()> {
    let worker = app.worker()?;
    println!("{}", "Worker running, Ctrl-C to stop".cyan());

    let stats = worker
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await?;

    println!(
        "{} {} completed, {} retried, {} failed",
        "Stopped:".green(),
        stats.completed,
        stats.retried,
        stats.failed
    );
    Ok(())
}

fn job_status(job: &JobRecord) -> ColoredString {
    match job.status {
        JobStatus::Pending => "pending".yellow(),
        JobStatus::Running => "running".cyan(),
        JobStatus::Completed => "completed".green(),
        JobStatus::Failed => "failed".red(),
    }
}

fn handle_jobs_command(job_id: Option<&str>, app: &App) -> Result<()> {
    let Some(job_id) = job_id else {
        let jobs = app.queue.list()?;
        for job in &jobs {
            println!("{}  {}  {}  attempt {}", job.id, job.name, job_status(job), job.attempts);
        }
        if !app.queue.has_unfinished()? {
            println!("{}", "Queue idle.".dimmed());
        }
        return Ok(());
    };

    let job = app.queue.get(job_id)?;
    println!("{}  {}  {}  attempt {}", job.id, job.name, job_status(&job), job.attempts);
    if let Some(error) = &job.last_error {
        println!("  {} {}", "last error:".red(), error);
    }
    for step in StepLedger::new(app.storage.clone()).steps_for_job(&job.id)? {
        println!("  {} {}", "✓".green(), step.step_id);
    }
    Ok(())
}

fn handle_credits_command(app: &App) -> Result<()> {
    let status = app.credits.status(DEFAULT_KEY)?;
    println!("{} {}", "Remaining credits:".green(), status.remaining_points);
    if status.ms_before_next > 0 {
        let hours = status.ms_before_next / 3_600_000;
        println!("  resets in {}d {}h", hours / 24, hours % 24);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;
    info!("Starting with config from: {:?}", cli.config);

    let app = App::open(config)?;
    run_application(&cli, &app).await.context("Application failed")?;

    Ok(())
}
