//! Command-line front end for Context Creator.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use context_creator::app::events::UserEvent;
use context_creator::app::helpers::lock_state;
use context_creator::app::state::AppState;
use context_creator::app::view_model::{format_file_size, generate_ui_state, TreeNodeView};
use context_creator::app::{commands, tasks};
use context_creator::config;
use context_creator::core::{ExportFormat, FilterCriteria, MatchType};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing_subscriber::EnvFilter;

/// Export format
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Plain,
    Markdown,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Plain => ExportFormat::Plain,
            FormatArg::Markdown => ExportFormat::Markdown,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "context-creator")]
#[command(about = "Select, filter and export project files as context for a language model")]
#[command(version)]
struct Cli {
    /// Settings file to use instead of the platform default
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the folder tree with selection and filter marks
    Tree {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Expand every folder instead of only the root and matches
        #[arg(short, long)]
        all: bool,
    },
    /// Export the selected files as one context document
    Export {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Output file (default: context.<ext> in the last export directory)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Output format (default: derived from the output extension)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
    /// Estimate the token count of the selected files
    Estimate {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Save the selection as a .ctx configuration
    Save {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Configuration file to write
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
        /// Configuration name
        #[arg(long)]
        name: Option<String>,
        /// Configuration description
        #[arg(long)]
        description: Option<String>,
    },
    /// List recently used folders and configurations
    Recent,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Folder to open; every file in it starts out selected
    #[arg(required_unless_present = "config", conflicts_with = "config")]
    root: Option<PathBuf>,

    /// Open the root folder and selection stored in a .ctx file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Filter expression; the selection becomes exactly the matching files
    #[arg(short = 'e', long = "filter", value_name = "EXPR")]
    expression: Option<String>,

    /// Match file and folder names instead of file contents
    #[arg(long)]
    by_name: bool,

    /// Treat the expression as a regular expression
    #[arg(long)]
    regex: bool,

    /// Match case-sensitively
    #[arg(short = 's', long)]
    case_sensitive: bool,

    /// Require the whole name or content to match
    #[arg(long)]
    exact: bool,

    /// Keep the files that do NOT match
    #[arg(long)]
    exclude: bool,

    /// Only test files in selected folders (useful with --config)
    #[arg(long)]
    selected_only: bool,
}

impl FilterArgs {
    fn criteria(&self) -> Option<FilterCriteria> {
        let expression = self.expression.clone()?;
        let mut criteria = if self.by_name {
            FilterCriteria::file_name(expression)
        } else {
            FilterCriteria::content(expression)
        };
        criteria.is_regex = self.regex;
        criteria.is_case_sensitive = self.case_sensitive;
        criteria.exact_match = self.exact;
        if self.exclude {
            criteria = criteria.exclude();
        }
        criteria.apply_to_selected_folders_only = self.selected_only;
        Some(criteria)
    }
}

/// The application session driven through the same command layer a GUI would use.
struct Session {
    state: Arc<Mutex<AppState>>,
    proxy: UnboundedSender<UserEvent>,
    events: UnboundedReceiver<UserEvent>,
}

impl Session {
    fn new(settings: Option<PathBuf>) -> Result<Self> {
        let app_config = config::settings::load_config(settings.as_deref())?;
        let (proxy, events) = unbounded_channel();
        Ok(Self {
            state: Arc::new(Mutex::new(AppState::with_config(app_config, settings))),
            proxy,
            events,
        })
    }

    /// Drains pending events, failing on the first error reported by the app layer.
    fn take_events(&mut self) -> Result<Vec<UserEvent>> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let UserEvent::ShowError(message) = event {
                bail!(message);
            }
            events.push(event);
        }
        Ok(events)
    }

    async fn open(&mut self, source: &SourceArgs, filter: &FilterArgs) -> Result<()> {
        match (&source.config, &source.root) {
            (Some(ctx), _) => {
                commands::load_configuration(ctx.clone(), self.proxy.clone(), self.state.clone());
                self.take_events()?;
            }
            (None, Some(root)) => {
                commands::open_folder(root.clone(), self.proxy.clone(), self.state.clone());
                self.take_events()?;
                commands::select_all(self.proxy.clone(), self.state.clone());
            }
            (None, None) => bail!("Either a folder or --config is required"),
        }

        if let Some(criteria) = filter.criteria() {
            if let Some(handle) =
                tasks::start_filter(criteria, self.proxy.clone(), self.state.clone())
            {
                handle.await.context("Filter task failed")?;
            }
            commands::select_matches(self.proxy.clone(), self.state.clone());
        }
        self.take_events()?;
        Ok(())
    }
}

fn print_tree(node: &TreeNodeView, depth: usize) {
    let mark = match node.selection_state {
        "selected" => "[x]",
        "partial" => "[~]",
        _ => "[ ]",
    };
    let suffix = match node.match_type {
        MatchType::Direct => " *",
        MatchType::Ancestor => " +",
        MatchType::None => "",
    };
    let slash = if node.is_directory { "/" } else { "" };
    let size = if node.is_directory {
        String::new()
    } else {
        format!(" ({})", format_file_size(node.size))
    };
    println!("{}{} {}{}{}{}", "  ".repeat(depth), mark, node.name, slash, size, suffix);
    for child in &node.children {
        print_tree(child, depth + 1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut session = Session::new(cli.settings.clone())?;

    match cli.command {
        Command::Tree {
            source,
            filter,
            all,
        } => {
            session.open(&source, &filter).await?;
            if all {
                commands::expand_all(session.proxy.clone(), session.state.clone());
                session.take_events()?;
            }
            let ui = generate_ui_state(&lock_state(&session.state));
            if let Some(tree) = &ui.tree {
                print_tree(tree, 0);
            }
            if let Some(summary) = ui.filter_summary {
                println!(
                    "\n{} files and {} folders match; {} folders contain matches",
                    summary.direct_files, summary.direct_folders, summary.ancestor_folders
                );
            }
        }
        Command::Export {
            source,
            filter,
            output,
            format,
        } => {
            session.open(&source, &filter).await?;
            let output =
                output.unwrap_or_else(|| lock_state(&session.state).config.default_export_path());
            let format = format.map(ExportFormat::from);
            let Some(handle) = tasks::start_export(
                output,
                format,
                session.proxy.clone(),
                session.state.clone(),
            ) else {
                session.take_events()?;
                bail!("No files selected for export");
            };
            handle.await.context("Export task failed")?;
            for event in session.take_events()? {
                if let UserEvent::ExportFinished { path, result } = event {
                    let report = result.map_err(anyhow::Error::msg)?;
                    println!(
                        "Exported {} files to {} ({} skipped, {})",
                        report.files_written,
                        path.display(),
                        report.files_skipped,
                        format_file_size(report.bytes)
                    );
                }
            }
        }
        Command::Estimate { source, filter } => {
            session.open(&source, &filter).await?;
            match tasks::start_token_estimate(session.proxy.clone(), session.state.clone()) {
                Some(handle) => handle.await.context("Estimate task failed")?,
                None => println!("No files selected"),
            }
            for event in session.take_events()? {
                if let UserEvent::TokenEstimate {
                    tokens,
                    files,
                    bytes,
                } = event
                {
                    println!(
                        "~{} tokens in {} files ({})",
                        tokens,
                        files,
                        format_file_size(bytes)
                    );
                }
            }
        }
        Command::Save {
            source,
            filter,
            output,
            name,
            description,
        } => {
            session.open(&source, &filter).await?;
            let (current_name, current_description) = {
                let s = lock_state(&session.state);
                (
                    s.current_configuration.name.clone(),
                    s.current_configuration.description.clone(),
                )
            };
            commands::set_configuration_details(
                name.unwrap_or(current_name),
                description.unwrap_or(current_description),
                session.proxy.clone(),
                session.state.clone(),
            );
            commands::save_configuration(output, session.proxy.clone(), session.state.clone());
            for event in session.take_events()? {
                if let UserEvent::ConfigurationSaved(path) = event {
                    println!("Saved configuration to {}", path.display());
                }
            }
        }
        Command::Recent => {
            let s = lock_state(&session.state);
            println!("Recent folders:");
            for folder in &s.config.recent_folders {
                println!("  {}", folder.display());
            }
            println!("Recent configurations:");
            for configuration in &s.config.recent_configurations {
                println!("  {}", configuration.display());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli).await
}
