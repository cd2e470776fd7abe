//! Intervals - a terminal timer that runs timer sets back to back
//!
//! A timer set is an ordered list of countdowns, e.g.:
//! - 25 minutes of focus
//! - 5 minutes of break
//! - repeated as many times as the set lists them

use anyhow::{Context, Result};
use chrono::Local;
use clap::{CommandFactory, Parser};

use intervals::cli::{
    run_program, Cli, Commands, CopyArgs, Display, HistoryArgs, QuickArgs, RemindArgs, RunArgs,
    RunOptions, SettingsAction, SoundArgs,
};
use intervals::config::{load_timer_sets, pick_timer_set, save_timer_sets, DataDir};
use intervals::engine::driver::EngineCommand;
use intervals::notification::{cancel_set_reminders, schedule_set_reminders, DesktopNotifier};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    let Some(command) = cli.command else {
        // No command provided, show help
        Cli::command().print_help()?;
        return Ok(());
    };

    if let Commands::Completions { shell } = command {
        generate_completions(shell);
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    tracing::debug!("Data directory: {}", data_dir.root().display());

    match command {
        Commands::Run(args) => run_set(&data_dir, args).await,
        Commands::Quick(args) => run_quick(&data_dir, args).await,
        Commands::History(args) => match &args.forget {
            Some(set_id) => forget_set(&data_dir, set_id),
            None => show_history(&data_dir, &args),
        },
        Commands::Copy(args) => copy_set(&args),
        Commands::Settings { action } => settings(&data_dir, action),
        Commands::Remind(args) => remind(args).await,
        Commands::Completions { .. } => Ok(()),
    }
}

fn run_options(sound: SoundArgs) -> RunOptions {
    RunOptions {
        no_sound: sound.no_sound,
        sounds_dir: sound.sounds_dir,
    }
}

async fn run_set(data_dir: &DataDir, args: RunArgs) -> Result<()> {
    let sets = load_timer_sets(&args.file)?;
    let set = pick_timer_set(sets, args.set.as_deref())?;
    Display::show_timer_set(&set);

    run_program(
        data_dir,
        EngineCommand::SelectSet(Some(set)),
        &run_options(args.sound),
    )
    .await?;
    Ok(())
}

async fn run_quick(data_dir: &DataDir, args: QuickArgs) -> Result<()> {
    run_program(
        data_dir,
        EngineCommand::SelectQuick {
            duration_sec: args.duration,
            sound: Some(args.end_sound),
        },
        &run_options(args.sound),
    )
    .await?;
    Ok(())
}

fn show_history(data_dir: &DataDir, args: &HistoryArgs) -> Result<()> {
    let history = data_dir.load_history()?;
    let mut entries = match &args.set {
        Some(set_id) => history.entries_for_set(set_id),
        None => history.entries(),
    };
    if let Some(limit) = args.limit {
        entries.truncate(limit);
    }

    if args.json {
        let json = serde_json::to_string_pretty(&entries).context("履歴の変換に失敗しました")?;
        println!("{}", json);
    } else {
        Display::show_history(&entries);
    }
    Ok(())
}

fn forget_set(data_dir: &DataDir, set_id: &str) -> Result<()> {
    let history = data_dir.load_history()?;
    let removed = history.remove_by_set(set_id);
    if removed > 0 {
        data_dir.save_history(&history)?;
    }
    Display::show_forgotten(set_id, removed);
    Ok(())
}

fn copy_set(args: &CopyArgs) -> Result<()> {
    let mut sets = load_timer_sets(&args.file)?;
    let source = pick_timer_set(sets.clone(), args.set.as_deref())?;
    let copy = source.duplicate();
    let name = copy.name.clone();
    sets.push(copy);
    save_timer_sets(&args.file, &sets)?;
    Display::show_copied(&name);
    Ok(())
}

fn settings(data_dir: &DataDir, action: SettingsAction) -> Result<()> {
    let mut settings = data_dir.load_settings()?;
    match action {
        SettingsAction::Show => {}
        SettingsAction::Set {
            volume,
            notifications,
        } => {
            if let Some(volume) = volume {
                settings = settings.with_volume(volume);
            }
            if let Some(enabled) = notifications {
                settings = settings.with_notifications(enabled);
            }
            data_dir.save_settings(&settings)?;
            Display::show_settings_saved();
        }
    }
    Display::show_settings(&settings);
    Ok(())
}

async fn remind(args: RemindArgs) -> Result<()> {
    let mut sets = load_timer_sets(&args.file)?;
    let notifier = DesktopNotifier::new(true);
    let now = Local::now().naive_local();

    let mut armed = 0;
    for set in &mut sets {
        let count = schedule_set_reminders(&notifier, set, now);
        Display::show_reminders(&set.name, count);
        armed += count;
    }
    if armed == 0 {
        return Ok(());
    }

    println!("通知を待機しています (Ctrl-Cで終了)");
    tokio::signal::ctrl_c()
        .await
        .context("終了シグナルを待機できませんでした")?;
    for set in &mut sets {
        cancel_set_reminders(&notifier, set);
    }
    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
