//! # TaskDesk CLI
//!
//! ```bash
//! taskdesk login --email demo@taskmanager.com
//! taskdesk add "Review pull request" --priority alta --due 2025-03-01
//! taskdesk list --pending
//! taskdesk toggle <id>
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use taskdesk_client::api::ApiClient;
use taskdesk_client::cache::TaskCache;
use taskdesk_client::config::ClientConfig;
use taskdesk_client::error::ClientError;
use taskdesk_client::form::{EditForm, TaskForm};
use taskdesk_client::storage::LocalStorage;
use taskdesk_client::view::{self, Filter};

#[derive(Debug, Parser)]
#[command(name = "taskdesk", version, about = "Manage TaskDesk tasks from the terminal")]
struct Cli {
    /// Log requests and fallbacks to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and store the session token
    Login {
        #[arg(long)]
        email: String,

        /// Read from stdin when omitted
        #[arg(long, env = "TASKDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List tasks
    List {
        #[arg(long, conflicts_with = "completed")]
        pending: bool,

        #[arg(long)]
        completed: bool,
    },
    /// Show one task
    Show { id: String },
    /// Create a task
    Add {
        title: String,

        #[command(flatten)]
        fields: TaskFields,
    },
    /// Change a task
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        fields: TaskFields,

        /// Remove the due date
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
    },
    /// Flip a task between pending and completed
    Toggle { id: String },
    /// Delete a task
    Rm { id: String },
    /// Check that the backend is reachable
    Health,
}

#[derive(Debug, Args)]
struct TaskFields {
    #[arg(long)]
    description: Option<String>,

    /// low, medium, high, urgent (or baja, media, alta, urgente)
    #[arg(long)]
    priority: Option<String>,

    /// YYYY-MM-DD, YYYY-MM-DDTHH:MM or RFC 3339
    #[arg(long)]
    due: Option<String>,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "taskdesk_client=debug" } else { "taskdesk_client=warn" };

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

async fn run(command: Command, config: &ClientConfig) -> anyhow::Result<String> {
    let client = ApiClient::new(config, LocalStorage::open(&config.storage_path))?;

    match command {
        Command::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            let user = client.login(email.trim(), &password).await?;
            Ok(view::render_login_success(&user))
        }
        Command::Logout => {
            client.logout().await?;
            Ok("Signed out\n".to_string())
        }
        Command::Whoami => {
            let profile = client.verify().await?;
            Ok(view::render_profile(&profile))
        }
        Command::Health => {
            let health = client.health().await.ok();
            Ok(view::render_health(&config.api_url, health.as_ref()))
        }
        command => {
            if client.current_user().await.is_none() {
                return Err(ClientError::SessionExpired.into());
            }
            run_task_command(command, TaskCache::new(client)).await
        }
    }
}

async fn run_task_command(command: Command, cache: TaskCache<ApiClient>) -> anyhow::Result<String> {
    let output = match command {
        Command::List { pending, completed } => {
            let filter = match (pending, completed) {
                (true, _) => Filter::Pending,
                (_, true) => Filter::Completed,
                _ => Filter::All,
            };
            view::render_task_list(&cache.tasks().await?, filter)
        }
        Command::Show { id } => {
            let tasks = cache.tasks().await?;
            let task = tasks
                .iter()
                .find(|t| t.id == id)
                .ok_or_else(|| anyhow::anyhow!("Task not found"))?;
            view::render_task_card(task)
        }
        Command::Add { title, fields } => {
            let task = TaskForm {
                title,
                description: fields.description,
                priority: fields.priority,
                due_date: fields.due,
            }
            .submit()?;
            view::render_task_card(&cache.create(task).await?)
        }
        Command::Edit {
            id,
            title,
            fields,
            clear_due,
        } => {
            let changes = EditForm {
                title,
                description: fields.description,
                priority: fields.priority,
                due_date: fields.due,
                clear_due_date: clear_due,
            }
            .submit()?;
            view::render_task_card(&cache.update(&id, changes).await?)
        }
        Command::Toggle { id } => view::render_task_card(&cache.toggle(&id).await?),
        Command::Rm { id } => {
            cache.delete(&id).await?;
            "Task deleted successfully\n".to_string()
        }
        Command::Login { .. } | Command::Logout | Command::Whoami | Command::Health => {
            anyhow::bail!("not a task command")
        }
    };

    Ok(output)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &config).await {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => match e.downcast_ref::<ClientError>() {
            Some(ClientError::SessionExpired) => {
                eprint!("{}", view::render_login_prompt());
                ExitCode::from(2)
            }
            _ => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}
