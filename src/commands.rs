//! Subcommands and their handlers.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{ArgGroup, Args, Subcommand};
use serde::Serialize;
use tracing::{error, info, warn};

use telas_core::model::RollFilter;
use telas_core::{
    BulkImporter, ClientId, ClientRegistry, CommitSummary, CutRequest, CutSession, ImportPolicy,
    ImportSummary, LengthColumn, LengthEntry, NewRoll, Roll, RollCatalog, RollId, RollRepository,
    TelasError,
};

/// Shared state for one invocation.
pub struct Workspace {
    pub repo: Arc<dyn RollRepository>,
    pub base_url: String,
    pub output: Output,
}

/// Where results go: plain text or JSON on stdout.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    /// Print `value` as JSON, or each line of `text` otherwise.
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> Vec<String>) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            for line in text() {
                println!("{}", line);
            }
        }
        Ok(())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the record service answers
    Ping,

    /// Manage clients
    #[command(subcommand)]
    Clients(ClientsCommand),

    /// Manage rolls
    #[command(subcommand)]
    Rolls(RollsCommand),

    /// Create rolls for a client from a comma-separated file
    Import(ImportArgs),

    /// Select rolls for a cut and record the leftovers
    Cut(CutArgs),

    /// Suggest fabric types or colors from a client's rolls
    Suggest(SuggestArgs),
}

#[derive(Subcommand, Debug)]
pub enum ClientsCommand {
    /// List clients
    List {
        /// Only clients whose name contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Create a client
    Create { nombre: String },
    /// Rename a client
    Rename { id: ClientId, nombre: String },
    /// Delete a client without rolls
    Delete { id: ClientId },
    /// Roll counts for a client
    Stats { id: ClientId },
}

#[derive(Subcommand, Debug)]
pub enum RollsCommand {
    /// List rolls of a client
    List {
        #[arg(long)]
        client: ClientId,
        /// Only rolls in circulation
        #[arg(long)]
        available: bool,
        /// Fabric type contains
        #[arg(long)]
        fabric: Option<String>,
        /// Color contains
        #[arg(long)]
        color: Option<String>,
    },
    /// Add one roll
    Add(AddRollArgs),
    /// Delete a roll
    Delete { id: RollId },
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("length").required(true).args(["meters", "yards"])))]
pub struct AddRollArgs {
    #[arg(long)]
    client: ClientId,
    #[arg(long)]
    numero: String,
    #[arg(long, default_value = "")]
    lote: String,
    #[arg(long, default_value = "")]
    fabric: String,
    #[arg(long, default_value = "")]
    color: String,
    /// Date received, YYYY-MM-DD (default: today)
    #[arg(long)]
    fecha: Option<NaiveDate>,
    /// Length in meters
    #[arg(long)]
    meters: Option<f64>,
    /// Length in yards
    #[arg(long)]
    yards: Option<f64>,
    /// Register the roll as out of circulation
    #[arg(long)]
    unavailable: bool,
    #[arg(long, default_value = "0")]
    resto_limpio: f64,
    #[arg(long, default_value = "0")]
    resto_sucio: f64,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    #[arg(long)]
    client: ClientId,
    /// File to import
    file: PathBuf,
    /// Length column: auto, metraje or yards
    #[arg(long, default_value = "auto")]
    length_column: LengthColumn,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("length").required(true).args(["meters", "yards"])))]
pub struct CutArgs {
    #[arg(long)]
    client: ClientId,
    /// Fabric type contains
    #[arg(long, default_value = "")]
    fabric: String,
    /// Color contains
    #[arg(long, default_value = "")]
    color: String,
    /// Length required, in meters
    #[arg(long)]
    meters: Option<f64>,
    /// Length required, in yards
    #[arg(long)]
    yards: Option<f64>,
    /// Roll to use, with optional leftovers and new label
    #[arg(long = "pick", value_name = "ID[:LIMPIO[:SUCIO[:NUMERO]]]")]
    picks: Vec<PickSpec>,
    /// Show the updates without sending them
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("field").required(true).args(["fabric", "color"])))]
pub struct SuggestArgs {
    #[arg(long)]
    client: ClientId,
    #[arg(long)]
    fabric: Option<String>,
    #[arg(long)]
    color: Option<String>,
}

/// A roll picked on the command line and the edits to apply to it.
#[derive(Debug, Clone, PartialEq)]
pub struct PickSpec {
    pub roll_id: RollId,
    pub resto_limpio: Option<f64>,
    pub resto_sucio: Option<f64>,
    pub numero_rollo: Option<String>,
}

impl FromStr for PickSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.splitn(4, ':');
        let id = parts.next().unwrap_or_default().trim();
        let roll_id = id
            .parse()
            .map_err(|_| format!("'{}' is not a roll id", id))?;

        let mut length = |name: &str| -> std::result::Result<Option<f64>, String> {
            match parts.next().map(str::trim) {
                None | Some("") => Ok(None),
                Some(v) => v
                    .parse()
                    .map(Some)
                    .map_err(|_| format!("{} '{}' is not a number", name, v)),
            }
        };
        let resto_limpio = length("resto_limpio")?;
        let resto_sucio = length("resto_sucio")?;
        let numero_rollo = parts
            .next()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        Ok(Self {
            roll_id,
            resto_limpio,
            resto_sucio,
            numero_rollo,
        })
    }
}

/// Length typed as either meters or yards.
fn length_entry(meters: Option<f64>, yards: Option<f64>) -> LengthEntry {
    match (meters, yards) {
        (Some(m), _) => LengthEntry::meters(m),
        (None, Some(y)) => LengthEntry::yards(y),
        (None, None) => LengthEntry::default(),
    }
}

fn required_meters(meters: Option<f64>, yards: Option<f64>) -> Result<f64> {
    length_entry(meters, yards)
        .to_meters()?
        .context("A length is required (--meters or --yards)")
}

/// Read an import file as UTF-8 text.
pub fn read_import_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn format_roll(roll: &Roll) -> String {
    format!(
        "{:>6}  {:<10} {:<10} {} / {}  {:.2} m  usable {:.2} m  limpio {:.2}  sucio {:.2}  {}",
        roll.id,
        roll.numero_rollo,
        roll.lote,
        roll.tipo_tela,
        roll.color,
        roll.metraje,
        roll.usable_metraje(),
        roll.resto_limpio,
        roll.resto_sucio,
        if roll.disponible { "available" } else { "used" }
    )
}

fn format_commit(summary: &CommitSummary) -> Vec<String> {
    let mut lines: Vec<String> = summary
        .outcomes
        .iter()
        .map(|o| match &o.error {
            None => format!(
                "roll {}: {}",
                o.roll_id,
                if o.retired { "retired" } else { "kept available" }
            ),
            Some(e) => format!("roll {}: FAILED: {}", o.roll_id, e),
        })
        .collect();
    lines.push(format!(
        "{} of {} roll(s) updated",
        summary.ok_count(),
        summary.outcomes.len()
    ));
    lines
}

fn format_import(summary: &ImportSummary) -> Vec<String> {
    let mut lines = vec![format!("{} imported, {} failed", summary.ok, summary.failed)];
    for f in &summary.failures {
        lines.push(format!("row {} ({}): {}", f.row, f.numero_rollo, f.message));
    }
    lines
}

pub async fn run(command: Command, ws: &Workspace) -> Result<()> {
    match command {
        Command::Ping => ping(ws).await,
        Command::Clients(cmd) => clients(cmd, ws).await,
        Command::Rolls(cmd) => rolls(cmd, ws).await,
        Command::Import(args) => import(args, ws).await,
        Command::Cut(args) => cut(args, ws).await,
        Command::Suggest(args) => suggest(args, ws).await,
    }
}

async fn ping(ws: &Workspace) -> Result<()> {
    let clients = ws
        .repo
        .ping()
        .await
        .with_context(|| format!("Record service at {} is not reachable", ws.base_url))?;
    ws.output.emit(&serde_json::json!({ "reachable": true, "clients": clients }), || {
        vec![format!(
            "Record service at {} is reachable ({} client(s))",
            ws.base_url, clients
        )]
    })
}

async fn clients(cmd: ClientsCommand, ws: &Workspace) -> Result<()> {
    let registry = ClientRegistry::new(ws.repo.clone());
    match cmd {
        ClientsCommand::List { search } => {
            let clients = registry.list(search.as_deref()).await?;
            ws.output.emit(&clients, || {
                clients
                    .iter()
                    .map(|c| {
                        let since = c
                            .created_at
                            .map_or_else(|| "N/A".to_string(), |t| t.date_naive().to_string());
                        format!("{:>6}  {}  (since {})", c.id, c.nombre, since)
                    })
                    .collect()
            })
        }
        ClientsCommand::Create { nombre } => {
            let client = registry.create(&nombre).await?;
            ws.output.emit(&client, || {
                vec![format!("Created client {} ({})", client.id, client.nombre)]
            })
        }
        ClientsCommand::Rename { id, nombre } => {
            let client = registry
                .rename(id, &nombre)
                .await
                .with_context(|| format!("Failed to rename client {}", id))?;
            ws.output.emit(&client, || {
                vec![format!("Client {} is now {}", client.id, client.nombre)]
            })
        }
        ClientsCommand::Delete { id } => {
            registry
                .delete(id)
                .await
                .with_context(|| format!("Failed to delete client {}", id))?;
            ws.output.emit(&serde_json::json!({ "deleted": id }), || {
                vec![format!("Deleted client {}", id)]
            })
        }
        ClientsCommand::Stats { id } => {
            let stats = registry.stats(id).await?;
            ws.output.emit(&stats, || {
                vec![format!(
                    "{} roll(s): {} available, {} used ({}% available)",
                    stats.total, stats.disponibles, stats.usados, stats.availability_pct
                )]
            })
        }
    }
}

async fn rolls(cmd: RollsCommand, ws: &Workspace) -> Result<()> {
    match cmd {
        RollsCommand::List {
            client,
            available,
            fabric,
            color,
        } => {
            let mut filter = RollFilter::for_client(client);
            if available {
                filter = filter.available(true);
            }
            if let Some(f) = fabric {
                filter = filter.tipo_tela(f);
            }
            if let Some(c) = color {
                filter = filter.color(c);
            }
            let rolls = ws.repo.list_rolls(&filter).await?;
            ws.output
                .emit(&rolls, || rolls.iter().map(format_roll).collect())
        }
        RollsCommand::Add(args) => {
            let metraje = required_meters(args.meters, args.yards)?;
            let roll = NewRoll {
                cliente_id: args.client,
                numero_rollo: args.numero,
                lote: args.lote,
                tipo_tela: args.fabric,
                color: args.color,
                fecha: args
                    .fecha
                    .unwrap_or_else(|| chrono::Local::now().date_naive()),
                metraje: telas_core::units::round_to_storage(metraje),
                disponible: !args.unavailable,
                resto_limpio: args.resto_limpio,
                resto_sucio: args.resto_sucio,
            };
            let created = ClientRegistry::new(ws.repo.clone())
                .add_roll(&roll)
                .await
                .context("Failed to add roll")?;
            ws.output.emit(&created, || vec![format_roll(&created)])
        }
        RollsCommand::Delete { id } => {
            ClientRegistry::new(ws.repo.clone())
                .delete_roll(id)
                .await
                .with_context(|| format!("Failed to delete roll {}", id))?;
            ws.output.emit(&serde_json::json!({ "deleted": id }), || {
                vec![format!("Deleted roll {}", id)]
            })
        }
    }
}

async fn import(args: ImportArgs, ws: &Workspace) -> Result<()> {
    let text = read_import_file(&args.file)?;
    info!("Importing: {}", args.file.display());

    let summary = BulkImporter::new(ws.repo.clone())
        .import(&text, args.client, ImportPolicy::new(args.length_column))
        .await
        .with_context(|| format!("Failed to import {}", args.file.display()))?;

    ws.output.emit(&summary, || format_import(&summary))?;
    if summary.failed > 0 {
        warn!("{} record(s) were not imported", summary.failed);
    }
    Ok(())
}

async fn cut(args: CutArgs, ws: &Workspace) -> Result<()> {
    let metros = required_meters(args.meters, args.yards)?;
    let mut session = CutSession::new(ws.repo.clone(), args.client);

    let evaluation = session
        .evaluate(CutRequest::new(args.client, args.fabric, args.color, metros))
        .await
        .context("Failed to evaluate cut request")?;

    if args.picks.is_empty() {
        let candidates = session.candidates();
        return ws.output.emit(&evaluation, || {
            let mut lines: Vec<String> = candidates.iter().map(|r| format_roll(r)).collect();
            lines.push(format!(
                "{:.2} m available for {:.2} m required{}",
                evaluation.available,
                evaluation.request.metros_requeridos,
                if evaluation.feasible { "" } else { " (not enough)" }
            ));
            lines.push(session.status_line());
            lines
        });
    }

    for pick in &args.picks {
        session
            .toggle_select(pick.roll_id)
            .with_context(|| format!("Cannot pick roll {}", pick.roll_id))?;
        if let Some(numero) = &pick.numero_rollo {
            session.set_numero_rollo(pick.roll_id, numero.as_str())?;
        }
        if pick.resto_limpio.is_some() || pick.resto_sucio.is_some() {
            session.set_leftovers(
                pick.roll_id,
                pick.resto_limpio.unwrap_or(0.0),
                pick.resto_sucio.unwrap_or(0.0),
            )?;
        }
    }

    for (roll_id, issue) in session.open_issues() {
        error!("Roll {}: {}", roll_id, issue);
    }
    info!("{}", session.status_line());

    if args.dry_run {
        let planned = session.plan()?;
        return ws.output.emit(&planned, || {
            planned
                .iter()
                .map(|p| {
                    format!(
                        "roll {}: cut {:.2} m, resto_limpio {:.2}, resto_sucio {:.2} -> {}",
                        p.roll_id,
                        p.consumed,
                        p.patch.resto_limpio.unwrap_or_default(),
                        p.patch.resto_sucio.unwrap_or_default(),
                        if p.retired { "retire" } else { "keep available" }
                    )
                })
                .collect()
        });
    }

    match session.commit().await {
        Ok(summary) => ws.output.emit(&summary, || format_commit(&summary)),
        Err(TelasError::PartialCommit { summary }) => {
            ws.output.emit(&summary, || format_commit(&summary))?;
            bail!(
                "{} of {} roll update(s) failed; run the same cut again to retry",
                summary.failed_count(),
                summary.outcomes.len()
            )
        }
        Err(e) => Err(e).context("Cut was not committed"),
    }
}

async fn suggest(args: SuggestArgs, ws: &Workspace) -> Result<()> {
    let catalog = RollCatalog::load(ws.repo.as_ref(), args.client)
        .await
        .with_context(|| format!("Failed to load rolls of client {}", args.client))?;

    let suggestions = match (&args.fabric, &args.color) {
        (Some(text), _) => catalog.suggest_tipos_tela(text),
        (None, Some(text)) => catalog.suggest_colores(text),
        (None, None) => Vec::new(),
    };
    ws.output.emit(&suggestions, || suggestions.clone())
}
