use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fern::colors::{Color, ColoredLevelConfig};
use log::{error, info, warn, LevelFilter};

mod aggregate;
mod client_command;
mod config;
mod console;
mod datetime;
mod details_command;
mod hours_command;
mod invoice;
mod invoice_command;
mod invoice_number;
mod invoices_command;
mod ledger;
mod period;
mod state;
mod store;
mod task_source;
mod time_entry;
mod warning;

use client_command::ClientCommand;
use config::Config;
use console::{ConsoleMarkdownList, ConsolePresenter};
use details_command::DetailsCommand;
use hours_command::{HoursArgs, HoursCommand};
use invoice_command::{InvoiceArgs, InvoiceCommand};
use invoice_number::SystemRandom;
use invoices_command::InvoicesCommand;
use ledger::{Finalize, InvoiceSession};
use store::{FileStore, ThrottledStore};
use task_source::{JsonExportSource, TaskSource};
use warning::Warning;

/// 記録した作業時間からクライアントへの請求書と作業時間レポートを作るCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- --tasks export.json hours --report
/// $ cargo run -- client add --name Acme --rate 80
/// $ cargo run -- --tasks export.json invoice --client 1709632800000 --period last-month --finalize
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(
        long = "state",
        env = "SP_INVOICE_STATE",
        global = true,
        help = "Path of the saved state file"
    )]
    state: Option<PathBuf>,

    #[clap(
        long = "tasks",
        env = "SP_INVOICE_TASKS",
        global = true,
        help = "Path of the task tracker JSON export"
    )]
    tasks: Option<PathBuf>,

    #[clap(short = 'v', long = "verbose", global = true, help = "Show debug logs")]
    verbose: bool,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Show hours worked per project
    Hours(HoursArgs),
    /// Generate an invoice for a client
    Invoice(InvoiceArgs),
    /// Manage clients and project assignments
    #[clap(subcommand)]
    Client(ClientCommand),
    /// Manage your own details printed on invoices
    #[clap(subcommand)]
    Details(DetailsCommand),
    /// Manage generated invoices
    #[clap(subcommand)]
    Invoices(InvoicesCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logger(args.verbose)?;

    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => match e.downcast_ref::<Warning>() {
            Some(warning) => {
                warn!("{}", warning);
                Ok(())
            }
            None => {
                error!("{:#}", e);
                Err(e)
            }
        },
    }
}

/// ログの出力先を標準エラーに設定する。標準出力はレポート専用とする。
fn setup_logger(verbose: bool) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue);
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(io::stderr())
        .apply()
        .context("Failed to initialize logger")?;

    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let config = Config::new(args.state, args.tasks)?;
    let mut store = ThrottledStore::new(FileStore::new(&config.state_path));
    let mut state = store.load_state().await?;

    let mut stdout = io::stdout();
    let mut presenter = ConsoleMarkdownList::new(&mut stdout);

    let changed = match args.subcommand {
        SubCommands::Hours(hours) => {
            let source = JsonExportSource::new(config.tasks_path()?);
            let summary = HoursCommand::new(&source).run(hours).await?;
            presenter.show_hours(&summary.rows, summary.days)?;
            if let Some(path) = &summary.report_path {
                info!("Hours report written to {}", path.display());
            }
            false
        }
        SubCommands::Invoice(invoice) => {
            let source = JsonExportSource::new(config.tasks_path()?);
            let mut session = InvoiceSession::new();
            let outcome = InvoiceCommand::new(&source, SystemRandom)
                .run(invoice, &mut state, &mut session)
                .await?;
            presenter.show_invoice(&outcome.invoice)?;
            match outcome.finalize {
                Some(Finalize::Appended) => true,
                Some(_) => {
                    info!("Invoice #{} was already saved", outcome.invoice.number);
                    false
                }
                None => {
                    info!(
                        "Preview ready. Invoice #{} will be saved when run with --finalize",
                        outcome.invoice.number
                    );
                    false
                }
            }
        }
        SubCommands::Client(command) => {
            let projects = if command.needs_projects() {
                JsonExportSource::new(config.tasks_path()?)
                    .read_projects()
                    .await
                    .context("Failed to load projects")?
            } else {
                Vec::new()
            };
            command.run(&mut state, &projects, &mut presenter)?
        }
        SubCommands::Details(command) => command.run(&mut state, &mut presenter)?,
        SubCommands::Invoices(command) => command.run(&mut state, &mut presenter)?,
    };

    if changed {
        store.save_state(&state).await?;
    }

    Ok(())
}
