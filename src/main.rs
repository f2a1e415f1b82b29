use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use targetdeck::cli::{Cli, Commands, Display, OutputFormat, TargetAction};
use targetdeck::config::{DeckConfig, ProjectPaths};
use targetdeck::error::{DeckError, Result};
use targetdeck::officer::{CycleReport, TargetingOfficer};
use targetdeck::target::Target;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            Display::new().print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("targetdeck=debug")
    } else {
        EnvFilter::new("targetdeck=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let display = Display::new();
    let paths = ProjectPaths::new(std::env::current_dir()?);

    match cli.command {
        Commands::Init => cmd_init(&display, &paths).await,
        Commands::Target { action } => {
            ensure_initialized(&paths)?;
            let officer = officer(&paths).await?;
            match action {
                TargetAction::Add {
                    name,
                    category,
                    priority,
                } => cmd_target_add(&display, &officer, &name, category.into(), priority).await,
                TargetAction::List => cmd_target_list(&display, &officer, cli.output).await,
                TargetAction::Show { target_id } => {
                    cmd_target_show(&display, &officer, &target_id, cli.output).await
                }
                TargetAction::Close { target_id } => {
                    cmd_target_close(&display, &officer, &target_id).await
                }
            }
        }
        Commands::Sweep => {
            ensure_initialized(&paths)?;
            let officer = officer(&paths).await?;
            let report = officer.run_cycle().await?;
            match cli.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => display.print_report(&report),
            }
            Ok(())
        }
        Commands::Status { package_id } => {
            ensure_initialized(&paths)?;
            let officer = officer(&paths).await?;
            cmd_status(&display, &officer, package_id, cli.output).await
        }
        Commands::History { package_id } => {
            ensure_initialized(&paths)?;
            let officer = officer(&paths).await?;
            let package = officer.packages().load(&package_id).await?;
            match cli.output {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&package.state_history)?)
                }
                OutputFormat::Text => display.print_history(&package),
            }
            Ok(())
        }
        Commands::Report => {
            ensure_initialized(&paths)?;
            match CycleReport::load_latest(&paths.reports_dir).await? {
                None => {
                    display.print_error("no cycle reports yet; run 'targetdeck sweep'");
                    Ok(())
                }
                Some(report) => {
                    match cli.output {
                        OutputFormat::Json => {
                            println!("{}", serde_json::to_string_pretty(&report)?)
                        }
                        OutputFormat::Text => display.print_report(&report),
                    }
                    Ok(())
                }
            }
        }
        Commands::Fail { package_id, reason } => {
            ensure_initialized(&paths)?;
            let officer = officer(&paths).await?;
            let package = officer.inject_failure(&package_id, &reason).await?;
            display.print_ok(&format!("{} marked failed: {}", package.id, reason));
            Ok(())
        }
    }
}

async fn officer(paths: &ProjectPaths) -> Result<TargetingOfficer> {
    let config = DeckConfig::load(&paths.deck_dir).await?;
    let officer = TargetingOfficer::new(config, paths);
    officer.init().await?;
    Ok(officer)
}

fn ensure_initialized(paths: &ProjectPaths) -> Result<()> {
    if !paths.is_initialized() {
        return Err(DeckError::NotInitialized);
    }
    Ok(())
}

async fn cmd_init(display: &Display, paths: &ProjectPaths) -> Result<()> {
    paths.create_all().await?;
    DeckConfig::default().save(&paths.deck_dir).await?;
    display.print_ok(&format!("initialized deck at {}", paths.deck_dir.display()));
    Ok(())
}

async fn cmd_target_add(
    display: &Display,
    officer: &TargetingOfficer,
    name: &str,
    category: targetdeck::target::TargetCategory,
    priority: u8,
) -> Result<()> {
    let id = officer.targets().next_id().await?;
    let target = Target::new(&id, name, category).with_priority(priority);
    officer.targets().create(&target).await?;
    display.print_ok(&format!("added {} ({})", target.id, target.name));
    Ok(())
}

async fn cmd_target_list(
    display: &Display,
    officer: &TargetingOfficer,
    output: OutputFormat,
) -> Result<()> {
    let targets = officer.targets().list().await?;
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&targets)?),
        OutputFormat::Text => {
            display.print_header("Targets");
            for target in &targets {
                display.print_target_summary(target);
            }
        }
    }
    Ok(())
}

async fn cmd_target_show(
    display: &Display,
    officer: &TargetingOfficer,
    target_id: &str,
    output: OutputFormat,
) -> Result<()> {
    let target = officer.targets().load(target_id).await?;
    let packages = officer.packages().list_for_target(target_id).await?;
    match output {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "target": target,
                    "packages": packages,
                }))?
            );
        }
        OutputFormat::Text => {
            display.print_target_summary(&target);
            for package in &packages {
                display.print_package_summary(package);
            }
        }
    }
    Ok(())
}

async fn cmd_target_close(
    display: &Display,
    officer: &TargetingOfficer,
    target_id: &str,
) -> Result<()> {
    let mut target = officer.targets().load(target_id).await?;
    target.status = targetdeck::target::TargetStatus::Closed;
    target.updated_at = chrono::Utc::now();
    officer.targets().save(&target).await?;
    display.print_ok(&format!("closed {}", target.id));
    Ok(())
}

async fn cmd_status(
    display: &Display,
    officer: &TargetingOfficer,
    package_id: Option<String>,
    output: OutputFormat,
) -> Result<()> {
    match package_id {
        Some(id) => {
            let package = officer.packages().load(&id).await?;
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&package)?),
                OutputFormat::Text => display.print_package_detail(&package),
            }
        }
        None => {
            let packages = officer.packages().list().await?;
            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&packages)?),
                OutputFormat::Text => {
                    display.print_header("Packages");
                    for package in &packages {
                        display.print_package_summary(package);
                    }
                }
            }
        }
    }
    Ok(())
}
