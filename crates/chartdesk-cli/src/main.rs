use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chartdesk_core::{
    ChartFormat, ChartService, ChatReply, ColorScheme, Config, ConversationTurn, JsonFileStore,
    RuleBasedInterpreter, TurnMetadata, TurnRole,
};
use clap::{Parser, Subcommand};
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type Service = ChartService<RuleBasedInterpreter, JsonFileStore>;

#[derive(Parser)]
#[command(name = "chartdesk")]
#[command(about = "Turn chat messages and spreadsheets into bar and line charts")]
struct Cli {
    /// Conversation to continue
    #[arg(short, long, global = true, env = "CHARTDESK_SESSION", default_value = "default")]
    session: String,

    /// Read settings from this file instead of the user config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask for a chart; starts an interactive prompt when no message is given
    Chat {
        message: Vec<String>,
    },
    /// Chart a .csv, .tsv or .txt spreadsheet
    Upload {
        file: PathBuf,
    },
    /// Print the file path of a rendered chart (svg or png)
    Chart {
        chart_id: String,
        #[arg(short, long, default_value = "svg")]
        format: String,
    },
    /// Show or set the session's color scheme (fd or bnr)
    Style {
        scheme: Option<String>,
    },
    /// Show the session's conversation
    History,
    /// Forget the session's conversation but keep its style
    Clear,
    /// Remove the session entirely
    DeleteSession,
    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    }
    .with_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(cli, config).await
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let command = match cli.command {
        Commands::Config { save } => {
            if save {
                save_config(&config, cli.config.as_deref())?;
            }
            return show_config(&config, cli.config.as_deref());
        }
        other => other,
    };

    config.ensure_dirs()?;
    let store = JsonFileStore::open(config.session_file())
        .with_context(|| format!("Failed to open session file {:?}", config.session_file()))?;
    let service = ChartService::rules_only(store, &config);
    let session = cli.session.as_str();

    match command {
        Commands::Chat { message } if message.is_empty() => chat_interactive(&service, session).await?,
        Commands::Chat { message } => {
            let reply = service.chat(session, &message.join(" ")).await?;
            print_reply(&reply);
        }
        Commands::Upload { file } => upload_file(&service, session, &file).await?,
        Commands::Chart { chart_id, format } => {
            let format = ChartFormat::parse(&format)?;
            let path = service.chart_path(&chart_id, format.extension())?;
            println!("{} {}", path.display(), format.content_type().dimmed());
        }
        Commands::Style { scheme: None } => {
            let scheme = service.style(session).await?;
            println!("{} {}", scheme.as_str().bold(), scheme.display_name().dimmed());
        }
        Commands::Style { scheme: Some(name) } => {
            let scheme = ColorScheme::from_str(&name).ok_or_else(|| {
                anyhow!("Unknown color scheme '{}' (expected {})", name, scheme_names())
            })?;
            service.set_style(session, scheme).await?;
            println!("{} {}", "✓ Style set to".green(), scheme.display_name());
        }
        Commands::History => show_history(&service, session).await?,
        Commands::Clear => {
            service.clear_history(session).await?;
            println!("{}", "✓ Chat history cleared".green());
        }
        Commands::DeleteSession => {
            if service.delete_session(session).await? {
                println!("{} {}", "✓ Deleted session".green(), session);
            } else {
                println!("{} {}", "No such session:".yellow(), session);
            }
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

async fn chat_interactive(service: &Service, session: &str) -> Result<()> {
    println!("{}", "📊 chartdesk".bold().blue());
    println!(
        "{}",
        "Describe a chart, e.g. \"Sales: Q1=100, Q2=150, Q3=120\". Empty line or 'exit' to quit.".dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".bold().cyan());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() || line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        match service.chat(session, line).await {
            Ok(reply) => print_reply(&reply),
            Err(e) => println!("{} {}", "Error:".red(), e),
        }
    }

    Ok(())
}

async fn upload_file(service: &Service, session: &str, file: &Path) -> Result<()> {
    let filename = file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("Invalid file name: {:?}", file))?;
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {:?}", file))?;

    let reply = service.upload(session, filename, &bytes).await?;
    print_reply(&reply);
    Ok(())
}

fn print_reply(reply: &ChatReply) {
    if reply.has_chart() {
        println!("{}", reply.response.green());
    } else {
        println!("{}", reply.response.yellow());
    }
    if let Some(chart_id) = &reply.chart_id {
        println!("  {} {}", "id:".dimmed(), chart_id);
    }
    if let Some(path) = &reply.chart_path {
        println!("  {} {}", "file:".dimmed(), path.display());
    }
    if let Some(scheme) = reply.color_scheme {
        println!("  {} {}", "style:".dimmed(), scheme.display_name());
    }
}

async fn show_history(service: &Service, session: &str) -> Result<()> {
    let history = service.history(session).await?;
    if history.is_empty() {
        println!("{}", "No messages yet".dimmed());
        return Ok(());
    }

    for turn in &history {
        println!("{}", format_turn(turn));
    }
    Ok(())
}

fn format_turn(turn: &ConversationTurn) -> String {
    let time = turn.timestamp.format("%Y-%m-%d %H:%M");
    let role = match turn.role {
        TurnRole::User => "you".bold().cyan(),
        TurnRole::Assistant => "chartdesk".bold().green(),
        TurnRole::System => "system".bold().dimmed(),
    };
    let mut line = format!("{} {} {}", time.to_string().dimmed(), role, turn.content);
    match &turn.metadata {
        Some(TurnMetadata::Chart(chart)) => {
            line.push_str(&format!(
                " {}",
                format!("[{} chart {}, {} points]", chart.chart_type.as_str(), chart.chart_id, chart.x_labels.len())
                    .dimmed()
            ));
        }
        Some(TurnMetadata::FileUpload { file_size, .. }) => {
            line.push_str(&format!(" {}", format!("[{} bytes]", file_size).dimmed()));
        }
        None => {}
    }
    line
}

fn scheme_names() -> String {
    ColorScheme::all()
        .iter()
        .map(|scheme| scheme.as_str())
        .collect::<Vec<_>>()
        .join(" or ")
}

fn save_config(config: &Config, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => config.save_to(path)?,
        None => config.save()?,
    }
    println!("{}", "✓ Configuration saved".green());
    Ok(())
}

fn show_config(config: &Config, path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::get_config_path()?,
    };
    println!("{} {}", "Config file:".bold(), path.display());
    println!("{} {}", "Data dir:".bold(), config.data_dir().display());
    println!("{} {}", "Charts dir:".bold(), config.charts_dir().display());
    println!("{} {}", "Session file:".bold(), config.session_file().display());
    println!("{} {}", "Max points:".bold(), config.max_points);
    println!("{} {}", "History window:".bold(), config.history_window);
    println!("{} {}", "Keep latest only:".bold(), config.keep_latest_only);
    println!("{} {}", "Default style:".bold(), config.default_style.as_str());
    println!("{} {}", "Log level:".bold(), config.log_level);
    Ok(())
}
