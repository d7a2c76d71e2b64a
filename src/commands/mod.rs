pub mod render;

use crate::config::Settings;
use crate::db::{Database, FileSource};
use crate::models::hierarchy;
use crate::tally::drilldown::{area_drill_down, row_drill_down, VoterFilter};
use crate::tally::report::{
    report_detail, station_status_map, ward_summary, ReportTarget, StationStatus, WardSummary,
};
use crate::tally::scope::{resolve, View, ViewMode};
use crate::tally::snapshot::{Snapshot, SnapshotLoader, SnapshotSource};
use crate::tally::{compute, ViewOutput};
use crate::tasks::refresher::{watch_task, Trigger};
use clap::{Parser, Subcommand};
use log::{info, warn};
use render::OutputFormat;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

type CommandResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[clap(name = "ward-tally", version, about = "Turnout and result aggregation for a ward election")]
pub struct Opts {
    /// Read a JSON snapshot file instead of the database
    #[clap(long, global = true)]
    snapshot: Option<PathBuf>,
    /// Output format
    #[clap(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,
    /// Run against a throwaway local Postgres (needs the embedded-postgres feature)
    #[clap(long, global = true)]
    embedded: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Aggregate one view
    Report {
        #[clap(long, value_enum, default_value = "ward")]
        view: ViewMode,
        /// Narrow the view to one unit, neighborhood or area id
        #[clap(long)]
        scope: Option<String>,
    },
    /// Ballot figures and candidate votes for the ward, a unit or an area
    Detail {
        #[clap(long, default_value = "ward")]
        target: String,
    },
    /// Ward totals and the status of every polling station
    Summary,
    /// List the voters behind a polling station or an aggregated row
    Drilldown {
        /// Polling station id, listed not-voted first
        #[clap(long, conflicts_with = "row")]
        area: Option<String>,
        /// Row key as printed by `report --format json`
        #[clap(long, requires = "view")]
        row: Option<String>,
        #[clap(long, value_enum)]
        view: Option<ViewMode>,
        #[clap(long, value_enum, default_value = "not-voted")]
        filter: VoterFilter,
    },
    /// Keep a view up to date, recomputing on every change
    Watch {
        #[clap(long, value_enum, default_value = "ward")]
        view: ViewMode,
        #[clap(long)]
        scope: Option<String>,
    },
    /// Create the backend tables and change triggers
    InitSchema,
}

#[derive(Serialize)]
struct SummaryOutput<'a> {
    summary: WardSummary,
    stations: &'a BTreeMap<&'static str, StationStatus>,
}

pub async fn run(opts: Opts, settings: Settings) -> CommandResult {
    if opts.embedded {
        #[cfg(feature = "embedded-postgres")]
        {
            let server = crate::db::embedded::EmbeddedServer::start().await?;
            let settings = Settings {
                database_url: server.url().to_string(),
                ..settings
            };
            let result = dispatch(opts, settings).await;
            server.stop().await?;
            return result;
        }
        #[cfg(not(feature = "embedded-postgres"))]
        return Err("--embedded needs a build with the embedded-postgres feature".into());
    }

    dispatch(opts, settings).await
}

async fn dispatch(opts: Opts, settings: Settings) -> CommandResult {
    let format = opts.format;

    if let Command::InitSchema = opts.command {
        if opts.snapshot.is_some() {
            return Err("init-schema needs a database, not a snapshot file".into());
        }
        Database::create_if_missing(&settings.database_url).await?;
        let database = Database::new(&settings).await?;
        database.init_schema(&settings.notify_channel).await?;
        return Ok(());
    }

    // Watching a database also needs its listener, so keep the concrete handle.
    let (source, database): (Arc<dyn SnapshotSource>, Option<Arc<Database>>) = match &opts.snapshot {
        Some(path) => {
            info!("Using snapshot file {}", path.display());
            (Arc::new(FileSource::new(path)) as Arc<dyn SnapshotSource>, None)
        }
        None => {
            let database = Arc::new(Database::new(&settings).await?);
            (database.clone() as Arc<dyn SnapshotSource>, Some(database))
        }
    };

    match opts.command {
        Command::Report { view, scope } => {
            let snapshot = Snapshot::fetch(source.as_ref()).await?;
            let output = compute(&View::new(view, scope), &snapshot);
            print_view(&output, &snapshot, format)?;
        }
        Command::Detail { target } => {
            let snapshot = Snapshot::fetch(source.as_ref()).await?;
            let mut detail = report_detail(ReportTarget::parse(&target), &snapshot);
            detail.fill_voter_count(source.as_ref()).await?;
            match format {
                OutputFormat::Text => print!("{}", render::detail_text(&detail)),
                OutputFormat::Json => println!("{}", render::json(&detail)?),
            }
        }
        Command::Summary => {
            let snapshot = Snapshot::fetch(source.as_ref()).await?;
            let summary = ward_summary(&snapshot);
            let stations = station_status_map(&snapshot);
            match format {
                OutputFormat::Text => print!("{}", render::summary_text(&summary, &stations)),
                OutputFormat::Json => println!(
                    "{}",
                    render::json(&SummaryOutput {
                        summary,
                        stations: &stations,
                    })?
                ),
            }
        }
        Command::Drilldown {
            area,
            row,
            view,
            filter,
        } => {
            let snapshot = Snapshot::fetch(source.as_ref()).await?;
            let (title, drill) = match (area, row, view) {
                (Some(area_id), _, _) => {
                    let title = hierarchy::find_area(&area_id)
                        .map(|a| a.name.to_string())
                        .unwrap_or_else(|| area_id.clone());
                    (title, area_drill_down(&area_id, &snapshot, filter))
                }
                (None, Some(key), Some(mode)) => {
                    let scope = resolve(&View::new(mode, None), &snapshot);
                    let row = scope
                        .rows
                        .iter()
                        .find(|row| row.key == key)
                        .ok_or_else(|| format!("No row {:?} in the {:?} view", key, mode))?;
                    (row.label.clone(), row_drill_down(row, &snapshot, filter))
                }
                _ => return Err("drilldown needs --area, or --row together with --view".into()),
            };
            match format {
                OutputFormat::Text => print!("{}", render::drilldown_text(&title, &drill)),
                OutputFormat::Json => println!("{}", render::json(&drill)?),
            }
        }
        Command::Watch { view, scope } => {
            let view = View::new(view, scope);
            let listener = match &database {
                Some(database) => match database.listener(&settings.notify_channel).await {
                    Ok(listener) => Some(listener),
                    Err(e) => {
                        warn!("Change notifications unavailable, polling only: {}", e);
                        None
                    }
                },
                None => None,
            };
            let shutdown = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };
            watch_task(
                SnapshotLoader::new(source),
                listener,
                settings.refresh_interval,
                shutdown,
                |refresh, trigger| {
                    if refresh.snapshot.is_empty() {
                        warn!("No data to show yet");
                    }
                    if let Trigger::Changed(tables) = trigger {
                        info!("Recomputing after changes to {}", tables.join(", "));
                    }
                    let output = compute(&view, &refresh.snapshot);
                    if let Err(e) = print_view(&output, &refresh.snapshot, format) {
                        warn!("Failed to render view: {}", e);
                    }
                },
            )
            .await;
        }
        Command::InitSchema => {}
    }

    Ok(())
}

fn print_view(output: &ViewOutput, snapshot: &Snapshot, format: OutputFormat) -> CommandResult {
    match format {
        OutputFormat::Text => print!("{}", render::view_text(output, snapshot.fetched_at())),
        OutputFormat::Json => println!("{}", render::json(output)?),
    }
    Ok(())
}
