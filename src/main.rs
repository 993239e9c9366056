mod api;
mod cli;
mod config;
mod error;
mod filter;
mod forms;
mod models;
mod render;
mod session;
mod transcript;
mod upload;
mod views;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "campus", about = "Campus Connect client: feed, events, and admin tools")]
pub struct Args {
    #[arg(long, env = "CAMPUS_API_URL", help = "API base URL (overrides config)")]
    pub api_url: Option<String>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Session file (default: ~/.campus/session.json)")]
    pub session_file: Option<PathBuf>,

    #[arg(long, help = "Activity log directory (default: ~/.campus/logs)")]
    pub logs_dir: Option<PathBuf>,

    #[arg(long, help = "Skip confirmation prompts")]
    pub yes: bool,

    #[arg(long, help = "Verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Debug output (print HTTP details and settings)")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a student account and log in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "CAMPUS_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        department: String,
        #[arg(long)]
        year: String,
        /// Repeatable or comma-separated
        #[arg(long = "interest", value_delimiter = ',')]
        interests: Vec<String>,
    },
    /// Log in as a student, or as an admin with --admin
    Login {
        email: String,
        #[arg(long, env = "CAMPUS_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        admin: bool,
    },
    /// Create an admin account and log in
    AdminRegister {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "CAMPUS_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "")]
        department: String,
        #[arg(long, default_value = "")]
        designation: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in profile and activity
    Whoami,
    /// List the feed
    Posts {
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(long, default_value = "all")]
        tag: String,
        #[arg(long, default_value = "all")]
        department: String,
        /// Re-fetch even if the feed is already loaded
        #[arg(long)]
        refresh: bool,
    },
    /// Show the tags and departments available for filtering
    Facets,
    /// Create a post
    Post {
        content: String,
        /// Comma-separated
        #[arg(long, default_value = "")]
        tags: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Like or unlike a post
    Like { post_id: String },
    /// Show a post's comments
    Comments { post_id: String },
    /// Comment on a post
    Comment { post_id: String, text: String },
    /// List campus events
    Events {
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(long, default_value = "all")]
        department: String,
        #[arg(long)]
        refresh: bool,
    },
    /// Create an event (admin)
    Event {
        #[arg(long)]
        title: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "")]
        department: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Toggle your RSVP for an event
    Rsvp { event_id: String },
    /// Admin dashboard
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommand {
    /// Platform totals
    Stats,
    /// List registered students
    Users,
    /// Remove a student account
    DeleteUser { user_id: String },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load()?
    };

    if let Some(url) = &args.api_url {
        cfg.api.base_url = url.clone();
    }
    if let Some(path) = &args.session_file {
        cfg.storage.session_file = Some(path.clone());
    }
    if let Some(dir) = &args.logs_dir {
        cfg.storage.logs_dir = Some(dir.clone());
    }

    if let Err(errors) = cfg.validate() {
        for e in &errors {
            eprintln!("Config error: {}", e);
        }
        return Err(anyhow::anyhow!(
            "Invalid configuration ({} errors)",
            errors.len()
        ));
    }

    let store = session::SessionStore::new(cfg.session_file());
    let stored = store.load();

    if args.debug {
        eprintln!("[DEBUG] Session file: {}", store.path().display());
        eprintln!(
            "[DEBUG] Session: {}",
            stored
                .as_ref()
                .map(|s| format!("{} ({})", s.profile.name(), s.role()))
                .unwrap_or_else(|| "<none>".to_string())
        );
        eprintln!(
            "[DEBUG] Image host key: {}",
            if cfg.images.resolve_api_key().is_some() {
                "<set>"
            } else {
                "<none>"
            }
        );
    }

    let run_id = uuid::Uuid::new_v4().to_string();
    let transcript = transcript::Transcript::open(&cfg.logs_dir(), &run_id)?;

    let client = api::Client::new(
        &cfg.api.base_url,
        cfg.api.timeout_secs.map(Duration::from_secs),
    )
    .with_credential(stored.as_ref().map(cli::credential_for))
    .with_debug(args.debug);
    if args.debug {
        eprintln!("[DEBUG] API: {}", client.base_url());
        eprintln!("[DEBUG] Activity log: {}", transcript.path.display());
    }

    let host = upload::ImgBbHost::new(&cfg.images.upload_url, cfg.images.resolve_api_key());

    let command = args.command.clone();
    let ctx = cli::Context {
        args,
        config: cfg,
        store,
        run_id,
        client: RefCell::new(client),
        host,
        transcript: RefCell::new(transcript),
        session: RefCell::new(stored),
        feed: RefCell::new(views::FeedView::default()),
        events: RefCell::new(views::EventsView::default()),
        admin: RefCell::new(views::AdminView::default()),
    };

    if let Some(command) = &command {
        cli::run_once(&ctx, command)
    } else {
        cli::run_repl(ctx)
    }
}
