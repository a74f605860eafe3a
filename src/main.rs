//! worklog: command-line front end for the work log.
//!
//! `add`, `search` and `export` map one-to-one onto store operations; the
//! remaining subcommands are the browse views (by day, customer, project).
//! Exit status is 2 for input the user has to correct, 1 for storage failures.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};

use worklog_lib::config::Config;
use worklog_lib::export::{self, ExportFormat};
use worklog_lib::summary::{monthly_counts, project_snapshot, project_summary_today};
use worklog_lib::{Entry, EntryDraft, EntryField, Worklog, WorklogError};

/// Longest cell shown in table output before truncation.
const MAX_CELL_CHARS: usize = 40;

#[derive(Parser)]
#[command(name = "worklog", version, about = "Work log organizer: record, browse, search and export")]
struct Cli {
    /// Database file (default: $WORKLOG_DB, then dbPath in ~/.worklog/config.json, then ~/.worklog/worklog.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an entry
    Add(AddArgs),
    /// Search customer, project, contact, summary, actions, next steps, tags and date
    Search {
        /// Text to look for; empty lists everything
        #[arg(long = "q", short = 'q')]
        query: String,
    },
    /// Export entries to CSV or Excel (all of them, or the matches of --q)
    Export {
        /// Only export entries matching this search term
        #[arg(long = "q", short = 'q')]
        query: Option<String>,
        /// csv or xlsx (default: exportFormat from config, else xlsx)
        #[arg(long)]
        format: Option<ExportFormat>,
        /// Output file (default: export.<format> in exportDir or the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Entries logged on one date
    Day {
        /// YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Entries for one customer, with a monthly report
    Customer { name: String },
    /// Entries for one project, with its latest status and open actions
    Project {
        /// Project name; "" selects entries without a project
        name: String,
    },
    /// Projects ordered by last activity
    Projects,
    /// Distinct values of a field (for pick-lists)
    Values { field: EntryField },
}

#[derive(Args)]
struct AddArgs {
    /// YYYY-MM-DD (default: today)
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long)]
    customer: String,
    /// What was done and why, in a sentence or a paragraph
    #[arg(long)]
    summary: String,
    #[arg(long)]
    project: Option<String>,
    /// Contact person or role
    #[arg(long)]
    contact: Option<String>,
    /// What was done today
    #[arg(long)]
    actions: Option<String>,
    /// What remains to be done
    #[arg(long = "next")]
    next_steps: Option<String>,
    /// Comma-separated tags
    #[arg(long)]
    tags: Option<String>,
}

impl AddArgs {
    fn into_draft(self) -> EntryDraft {
        let date = self.date.unwrap_or_else(|| Local::now().date_naive());
        let mut draft = EntryDraft::new(date, self.customer, self.summary);
        draft.project = self.project.unwrap_or_default();
        draft.contact = self.contact.unwrap_or_default();
        draft.actions = self.actions.unwrap_or_default();
        draft.next_steps = self.next_steps.unwrap_or_default();
        draft.tags = self.tags.unwrap_or_default();
        draft
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(worklog_err) = err.downcast_ref::<WorklogError>() {
                if worklog_err.requires_user_action() {
                    eprintln!("Not saved: {}", worklog_err);
                    eprintln!("{}", worklog_err.recovery_suggestion());
                    return ExitCode::from(2);
                }
                eprintln!("Error: {:#}", err);
                eprintln!("{}", worklog_err.recovery_suggestion());
                return ExitCode::FAILURE;
            }
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let db_path = config.resolve_db_path(cli.db.as_deref())?;
    log::debug!("Using database {}", db_path.display());

    let worklog = Worklog::new(db_path);
    worklog.ensure_schema()?;

    match cli.command {
        Commands::Add(args) => {
            let draft = args.into_draft();
            let id = worklog.insert(&draft)?;
            println!("Saved #{}: {} {}", id, draft.date, draft.customer.trim());
        }
        Commands::Search { query } => {
            let entries = worklog.search(&query)?;
            println!("{} results", entries.len());
            print_entries(&entries);
        }
        Commands::Export { query, format, out } => {
            let format = format.unwrap_or(config.export_format);
            let out = out.unwrap_or_else(|| config.default_export_path(format));
            let entries = match query {
                Some(query) => worklog.search(&query)?,
                None => worklog.all()?,
            };
            export::export_to_path(&entries, format, &out)
                .with_context(|| format!("Failed to export to {}", out.display()))?;
            println!("Exported {} entries -> {}", entries.len(), out.display());
        }
        Commands::Day { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let entries = worklog.by_date(date)?;
            if entries.is_empty() {
                println!("No entries on {}.", date);
            } else {
                print_entries(&entries);
            }
        }
        Commands::Customer { name } => {
            let entries = worklog.by_customer(&name)?;
            if entries.is_empty() {
                println!("No entries for customer '{}'.", name);
                let known = worklog.distinct_values(EntryField::Customer)?;
                if !known.is_empty() {
                    println!("Known customers: {}", known.join(", "));
                }
                return Ok(());
            }
            println!("{} entries", entries.len());
            print_entries(&entries);
            println!();
            println!("Monthly report");
            let rows = monthly_counts(&entries)
                .into_iter()
                .map(|m| vec![m.month, m.entries.to_string()])
                .collect();
            print_table(&["month", "entries"], rows);
        }
        Commands::Project { name } => {
            let entries = worklog.by_project(&name)?;
            let Some(snapshot) = project_snapshot(&entries) else {
                println!("No entries for project '{}'.", name);
                return Ok(());
            };
            println!("Last activity: {} {}", snapshot.last_date, one_line(&snapshot.last_summary));
            if snapshot.open_actions.is_empty() {
                println!("Open actions: none");
            } else {
                println!("Open actions:");
                for action in &snapshot.open_actions {
                    println!("  - {}", one_line(action));
                }
            }
            println!();
            print_entries(&entries);
        }
        Commands::Projects => {
            let entries = worklog.all()?;
            let rows = project_summary_today(&entries)
                .into_iter()
                .map(|p| {
                    vec![
                        p.project,
                        p.entries.to_string(),
                        p.last_date.to_string(),
                        p.days_since.to_string(),
                    ]
                })
                .collect();
            print_table(&["project", "entries", "last_date", "days_since"], rows);
        }
        Commands::Values { field } => {
            for value in worklog.distinct_values(field)? {
                println!("{}", value);
            }
        }
    }
    Ok(())
}

fn print_entries(entries: &[Entry]) {
    let rows = entries
        .iter()
        .map(|e| {
            let mut row = vec![e.id.to_string()];
            row.extend(EntryField::ALL.iter().map(|f| e.field(*f)));
            row.push(e.created_at.to_string());
            row
        })
        .collect();
    let mut headers = vec!["id"];
    headers.extend(EntryField::ALL.iter().map(|f| f.column()));
    headers.push("created_at");
    print_table(&headers, rows);
}

fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let rows: Vec<Vec<String>> = rows
        .into_iter()
        .map(|row| row.iter().map(|cell| truncate(&one_line(cell))).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", line(headers.to_vec()));
    for row in &rows {
        println!("{}", line(row.iter().map(String::as_str).collect()));
    }
}

fn one_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" / ")
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_CELL_CHARS - 1).collect();
    cut.push('…');
    cut
}
