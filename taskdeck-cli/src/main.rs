use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use taskdeck_cli::views::ListView;
use taskdeck_cli::{App, AppError, AppOptions, View};
use taskdeck_client::HttpTaskGateway;
use taskdeck_core::config::{load_config_file, resolve_from_env, ClientConfig, LogLevel};
use taskdeck_core::confirm::DELETE_DIALOG_MESSAGE;
use taskdeck_core::{
    FormField, MemoryTaskGateway, ParamsUpdate, Route, SortBy, SortDirection, StatusFilter,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "taskdeck",
    version = "0.1.0",
    about = "Taskdeck \u{2014} terminal client for the task management REST API"
)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,
    /// Base URL of the REST API, e.g. http://localhost:8080/api
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Log filter when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive shell (default)
    Shell,
    /// Print one page of the task list
    List(ListArgs),
    /// Print a single task
    Show { id: i64 },
    /// Create a task
    Create(FieldArgs),
    /// Change fields of a task
    Edit {
        id: i64,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Flip a task between pending and completed
    Toggle { id: i64 },
    /// Delete a task after confirmation
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Run the in-memory REST stub
    Stub {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

#[derive(Args)]
struct ListArgs {
    /// all, pending or completed
    #[arg(long)]
    status: Option<StatusFilter>,
    /// Earliest due date, YYYY-MM-DDTHH:MM
    #[arg(long)]
    from: Option<String>,
    /// Latest due date, YYYY-MM-DDTHH:MM
    #[arg(long)]
    to: Option<String>,
    /// title, dueDate or createdAt
    #[arg(long)]
    sort: Option<SortBy>,
    /// asc or desc
    #[arg(long)]
    dir: Option<SortDirection>,
    /// Page number, starting at 1
    #[arg(long)]
    page: Option<u32>,
    /// Tasks per page
    #[arg(long)]
    size: Option<u32>,
}

impl ListArgs {
    fn updates(&self) -> Vec<ParamsUpdate> {
        let mut updates = Vec::new();
        if let Some(status) = self.status {
            updates.push(ParamsUpdate::Status(status));
        }
        if self.from.is_some() {
            updates.push(ParamsUpdate::DueDateFrom(self.from.clone()));
        }
        if self.to.is_some() {
            updates.push(ParamsUpdate::DueDateTo(self.to.clone()));
        }
        if let Some(sort) = self.sort {
            updates.push(ParamsUpdate::SortBy(sort));
        }
        if let Some(dir) = self.dir {
            updates.push(ParamsUpdate::SortDirection(dir));
        }
        // Page last: filter changes reset it.
        if let Some(page) = self.page {
            updates.push(ParamsUpdate::Page(page.saturating_sub(1)));
        }
        updates
    }
}

#[derive(Args)]
struct FieldArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// YYYY-MM-DDTHH:MM
    #[arg(long)]
    due: Option<String>,
    #[arg(long)]
    assignee: Option<String>,
}

impl FieldArgs {
    fn values(&self) -> Vec<(FormField, String)> {
        [
            (FormField::Title, &self.title),
            (FormField::Description, &self.description),
            (FormField::DueDate, &self.due),
            (FormField::AssignedTo, &self.assignee),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.clone().map(|v| (field, v)))
        .collect()
    }
}

fn init_tracing(flag: Option<&str>, config: Option<LogLevel>) {
    let fallback = flag
        .or(config.as_ref().map(LogLevel::as_str))
        .unwrap_or("warn");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Connection and paging settings shared by every client command.
struct ClientSettings {
    api_url: String,
    options: AppOptions,
    timeout: std::time::Duration,
}

impl ClientSettings {
    /// Flag > environment > config file > default.
    fn resolve(api_url_flag: Option<String>, file_config: ClientConfig) -> Self {
        let resolved = resolve_from_env(file_config);
        Self {
            api_url: api_url_flag.unwrap_or(resolved.api_url),
            options: AppOptions {
                page_size: resolved.page_size,
                cache: resolved.cache,
            },
            timeout: resolved.timeout,
        }
    }

    fn build_app(&self, page_size: Option<u32>) -> Result<App, AppError> {
        tracing::debug!(api_url = %self.api_url, "connecting");
        let gateway = HttpTaskGateway::new(&self.api_url, self.timeout)?;
        let mut options = self.options;
        if let Some(size) = page_size.filter(|n| *n > 0) {
            options.page_size = size;
        }
        Ok(App::new(Arc::new(gateway), options))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 1. Load config file and start logging
    let file_config = load_config_file(cli.config.as_deref()).map_err(AppError::from)?;
    init_tracing(cli.log_level.as_deref(), file_config.log_level);

    // 2. Resolve connection settings
    let settings = ClientSettings::resolve(cli.api_url, file_config);

    // 3. Run the command
    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            let mut app = settings.build_app(None)?;
            app.start().await;
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            taskdeck_cli::shell::run(&mut app, stdin.lock(), &mut stdout).await?;
        }
        Commands::List(args) => {
            let mut app = settings.build_app(args.size)?;
            app.preset(args.updates());
            app.start().await;
            print_and_check(&app)?;
        }
        Commands::Show { id } => {
            let mut app = settings.build_app(None)?;
            app.navigate(Route::TaskDetail(id)).await?;
            print_and_check(&app)?;
        }
        Commands::Create(fields) => {
            let mut app = settings.build_app(None)?;
            app.navigate(Route::TaskCreate).await?;
            submit_form(&mut app, fields.values()).await?;
        }
        Commands::Edit { id, fields } => {
            let mut app = settings.build_app(None)?;
            app.navigate(Route::TaskEdit(id)).await?;
            check_loaded(&app)?;
            submit_form(&mut app, fields.values()).await?;
        }
        Commands::Toggle { id } => {
            let mut app = settings.build_app(None)?;
            app.navigate(Route::TaskDetail(id)).await?;
            check_loaded(&app)?;
            app.toggle(Some(id)).await?;
            print!("{}", app.render());
        }
        Commands::Delete { id, yes } => {
            let mut app = settings.build_app(None)?;
            app.navigate(Route::TaskDetail(id)).await?;
            print_and_check(&app)?;
            app.request_delete(Some(id))?;
            if yes || confirm_on_stdin()? {
                app.confirm_delete().await?;
                println!("Deleted task {id}.");
            } else {
                app.cancel_delete()?;
                println!("Cancelled.");
            }
        }
        Commands::Stub { port } => run_stub(port).await?,
    }

    Ok(())
}

/// A page that failed to load becomes the exit status.
fn check_loaded(app: &App) -> Result<(), AppError> {
    match app.view() {
        View::NotFound => Err(AppError::Unavailable("task not found")),
        View::Failed(err) => Err(AppError::Api(err.clone())),
        View::List(ListView {
            outcome: Err(err), ..
        }) => Err(AppError::Api(err.clone())),
        _ => Ok(()),
    }
}

fn print_and_check(app: &App) -> Result<(), AppError> {
    check_loaded(app)?;
    print!("{}", app.render());
    Ok(())
}

async fn submit_form(app: &mut App, values: Vec<(FormField, String)>) -> Result<(), AppError> {
    for (field, value) in values {
        app.set_field(field, value)?;
    }
    if let Err(err) = app.submit().await {
        eprint!("{}", app.render());
        return Err(err);
    }
    print!("{}", app.render());
    Ok(())
}

fn confirm_on_stdin() -> io::Result<bool> {
    print!("{DELETE_DIALOG_MESSAGE} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

async fn run_stub(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = Arc::new(MemoryTaskGateway::new());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!(port, "starting stub");
    println!("[taskdeck] Stub API listening on http://localhost:{port}/api");
    taskdeck_stub::serve(listener, gateway).await?;
    Ok(())
}
