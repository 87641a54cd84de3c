use std::io::{self, BufRead, IsTerminal};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use handle_avail::bot::Bot;
use handle_avail::check::Checker;
use handle_avail::config::Config;
use handle_avail::platform;
use handle_avail::render;
use handle_avail::report::{self, UsernameReport};

#[derive(Parser)]
#[command(
    name = "handle-avail",
    version,
    about = "Check whether a username is available across social-media platforms",
    after_help = "Availability is inferred from HTTP status codes. Rate limiting, \
                  CAPTCHAs, and redesigned pages can make a taken name look \
                  available or the other way round."
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    #[command(flatten)]
    settings: Settings,

    /// Log lookups and cache activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct Settings {
    /// Seconds a successful lookup stays cached
    #[arg(long, env = "HANDLE_AVAIL_CACHE_TTL", default_value_t = 3600, global = true)]
    cache_ttl: u64,

    /// Per-request timeout in seconds
    #[arg(long, env = "HANDLE_AVAIL_TIMEOUT", default_value_t = 15, global = true)]
    timeout: u64,

    /// Maximum lookups in flight
    #[arg(long, env = "HANDLE_AVAIL_CONCURRENCY", default_value_t = 20, global = true)]
    concurrency: usize,
}

impl Settings {
    fn into_config(self) -> Config {
        Config {
            cache_ttl: Duration::from_secs(self.cache_ttl),
            request_timeout: Duration::from_secs(self.timeout),
            max_concurrent: self.concurrency,
            ..Config::default()
        }
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Check usernames on every platform (also reads from stdin)
    Check {
        /// Usernames to check
        usernames: Vec<String>,

        /// Suppress output, exit code only
        #[arg(short, long)]
        quiet: bool,

        /// Only print available results
        #[arg(short, long)]
        available_only: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print profile links for a name on every platform
    Search {
        /// Name to search for
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// List supported platforms
    Platforms {
        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Answer chat commands (!check, !search, !stats, !help) read from stdin
    Chat {
        /// User id the commands are attributed to
        #[arg(long, default_value = "local")]
        user: String,
    },
}

fn main() -> ExitCode {
    reset_sigpipe();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.settings.into_config();
    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        return ExitCode::from(2);
    }

    match cli.command {
        Cmd::Check {
            usernames,
            quiet,
            available_only,
            json,
        } => run_check(&config, usernames, quiet, available_only, json),
        Cmd::Search { name } => {
            println!("{}", render::search_results(&name.join(" ")));
            ExitCode::SUCCESS
        }
        Cmd::Platforms { json } => run_platforms(json),
        Cmd::Chat { user } => run_chat(&config, &user),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "handle_avail=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

// Exit quietly when piped into `head` instead of panicking on EPIPE.
#[cfg(unix)]
fn reset_sigpipe() {
    // SAFETY: restoring the default disposition of SIGPIPE before any
    // threads are spawned.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

#[cfg(not(unix))]
fn reset_sigpipe() {}

fn read_stdin_lines(into: &mut Vec<String>) -> io::Result<()> {
    if io::stdin().is_terminal() {
        return Ok(());
    }
    for line in io::stdin().lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            into.push(trimmed.to_string());
        }
    }
    Ok(())
}

fn run_check(
    config: &Config,
    mut usernames: Vec<String>,
    quiet: bool,
    available_only: bool,
    json: bool,
) -> ExitCode {
    if let Err(e) = read_stdin_lines(&mut usernames) {
        eprintln!("error: reading stdin: {e}");
        return ExitCode::from(2);
    }

    if usernames.is_empty() {
        eprintln!("error: no usernames provided");
        eprintln!("usage: handle-avail check [OPTIONS] [USERNAMES...]");
        return ExitCode::from(2);
    }

    // Deduplicate while preserving order
    let mut seen = std::collections::HashSet::new();
    usernames.retain(|n| seen.insert(n.clone()));

    let checker = Checker::from_config(config);
    let mut status = report::EXIT_ALL_AVAILABLE;
    let mut entries = Vec::new();

    for username in &usernames {
        for invalid in platform::invalid_platforms(username) {
            tracing::info!(username = %username, platform = invalid.id, "username format rejected");
        }
        let results = checker.check_all(username);
        status = status.max(report::exit_status(&results));
        if quiet {
            continue;
        }
        let shown = UsernameReport::new(username, &results, available_only);
        if json {
            match serde_json::to_value(&shown) {
                Ok(value) => entries.push(value),
                Err(e) => {
                    eprintln!("error: encoding JSON: {e}");
                    return ExitCode::from(2);
                }
            }
        } else {
            for line in shown.lines() {
                println!("{line}");
            }
        }
    }

    if json && !quiet {
        match serde_json::to_string_pretty(&entries) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("error: encoding JSON: {e}");
                return ExitCode::from(2);
            }
        }
    }

    ExitCode::from(status)
}

fn run_platforms(json: bool) -> ExitCode {
    if json {
        match serde_json::to_string_pretty(platform::all()) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("error: encoding JSON: {e}");
                return ExitCode::from(2);
            }
        }
    } else {
        for p in platform::all() {
            println!("{}\t{}\t{}", p.id, p.profile_url_template, p.pattern);
        }
    }
    ExitCode::SUCCESS
}

fn run_chat(config: &Config, user: &str) -> ExitCode {
    let bot = Bot::new(Checker::from_config(config));
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("error: reading stdin: {e}");
                return ExitCode::from(2);
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let messages = match bot.handle_line(user, &line) {
            Ok(messages) => messages,
            Err(e) => vec![render::error(&e)],
        };
        for message in messages {
            println!("{message}\n");
        }
    }
    ExitCode::SUCCESS
}
