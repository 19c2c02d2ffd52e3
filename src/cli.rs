//! CLI implementation for tasq

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser as ClapParser, Subcommand};
use colored::Colorize;
use ignore::WalkBuilder;

use tasq::{Condition, Config, Direction, GroupKey, Query, QueryGroup, SortKey, TaskEngine};

#[derive(ClapParser)]
#[command(name = "tasq")]
#[command(about = "Queryable task index over a markdown vault")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug info
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Query task records in a vault
    Query {
        /// Vault root directory
        #[arg(default_value = ".")]
        vault: PathBuf,

        /// Filter expression, e.g. "status is open" or "due before
        /// 2025-06-01" (repeat to AND several)
        #[arg(short, long)]
        filter: Vec<String>,

        /// Group results: none, status, priority, context, project, tag, due
        #[arg(short, long, default_value = "none")]
        group: String,

        /// Sort key: due, scheduled, priority, title, created, modified
        #[arg(short, long, default_value = "due")]
        sort: String,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Observation date (YYYY-MM-DD) for recurrence projection;
        /// "observed" in filters resolves to this
        #[arg(short = 'd', long)]
        date: Option<NaiveDate>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one record by its vault-relative path
    Show {
        /// Vault root directory
        vault: PathBuf,
        /// Record identity (vault-relative path, e.g. "inbox/rent.md")
        identity: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show store statistics for a vault
    Stats {
        /// Vault root directory
        #[arg(default_value = ".")]
        vault: PathBuf,
    },
}

/// Run CLI with pre-parsed arguments (main.rs inspects the verbose flag
/// before tracing init).
pub fn run_with(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Query {
            vault,
            filter,
            group,
            sort,
            desc,
            date,
            json,
        } => {
            let engine = load_vault(&vault)?;
            let query = build_query(&filter, &group, &sort, desc, date)?;
            let groups = engine.query(&query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
            } else {
                print_groups(&groups, query.group);
            }
            Ok(())
        }
        Commands::Show {
            vault,
            identity,
            json,
        } => {
            let engine = load_vault(&vault)?;
            let Some(record) = engine.get_record(&identity) else {
                if let Some(error) = engine.parse_error(&identity) {
                    bail!("'{}' failed to parse: {}", identity, error);
                }
                bail!("no record with identity '{}'", identity);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print_record(&record);
                let members = engine.project_members(&identity)?;
                if !members.is_empty() {
                    let ids: Vec<&str> =
                        members.iter().map(|r| r.identity.as_str()).collect();
                    println!("  members:   {}", ids.join(", "));
                }
            }
            Ok(())
        }
        Commands::Stats { vault } => {
            let engine = load_vault(&vault)?;
            let stats = engine.stats();
            println!("{}", "Store statistics".bold());
            println!("  Records:   {}", stats.records);
            println!("  Malformed: {}", stats.malformed);
            println!("  Tags:      {}", stats.tags);
            println!("  Contexts:  {}", stats.contexts);
            println!("  Projects:  {}", stats.projects);
            Ok(())
        }
    }
}

/// Scan a vault directory into a ready engine. Documents are enumerated
/// with gitignore semantics so `.obsidian/`-style ignores are honored.
fn load_vault(vault: &Path) -> Result<TaskEngine> {
    if !vault.is_dir() {
        bail!("vault root {} is not a directory", vault.display());
    }
    let config = Config::load(vault);
    let mut engine = TaskEngine::with_config(&config);

    let mut docs = Vec::new();
    for entry in WalkBuilder::new(vault).hidden(true).build() {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        let identity = path
            .strip_prefix(vault)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        docs.push((identity, content));
    }
    // Deterministic scan order, independent of directory traversal.
    docs.sort_by(|a, b| a.0.cmp(&b.0));

    engine.initial_scan(docs);
    Ok(engine)
}

fn build_query(
    filters: &[String],
    group: &str,
    sort: &str,
    desc: bool,
    date: Option<NaiveDate>,
) -> Result<Query> {
    let mut children = Vec::with_capacity(filters.len());
    for expr in filters {
        children.push(Condition::parse_leaf(expr)?);
    }
    Ok(Query {
        filter: Condition::and(children),
        sort: sort.parse::<SortKey>()?,
        direction: if desc {
            Direction::Descending
        } else {
            Direction::Ascending
        },
        group: group.parse::<GroupKey>()?,
        observation_date: date,
    })
}

fn print_groups(groups: &[QueryGroup], group_key: GroupKey) {
    if groups.is_empty() {
        println!("{}", "No matching records".dimmed());
        return;
    }
    for group in groups {
        if group_key != GroupKey::None {
            println!("{} ({})", group.label.bold().cyan(), group.records.len());
        }
        for record in &group.records {
            let mut line = format!("  {}", record.title);
            if let Some(status) = &record.status {
                line.push_str(&format!("  [{}]", status));
            }
            if let Some(due) = record.due {
                line.push_str(&format!("  due {}", due.date));
            }
            println!("{}  {}", line, record.identity.dimmed());
        }
    }
}

fn print_record(record: &tasq::Record) {
    println!("{}", record.title.bold());
    println!("  identity:  {}", record.identity);
    if let Some(status) = &record.status {
        println!("  status:    {}", status);
    }
    if let Some(priority) = &record.priority {
        println!("  priority:  {}", priority);
    }
    if let Some(due) = record.due {
        println!("  due:       {}", due);
    }
    if let Some(scheduled) = record.scheduled {
        println!("  scheduled: {}", scheduled);
    }
    if !record.tags.is_empty() {
        println!("  tags:      {}", record.tags.join(", "));
    }
    if !record.contexts.is_empty() {
        println!("  contexts:  {}", record.contexts.join(", "));
    }
    if !record.projects.is_empty() {
        println!("  projects:  {}", record.projects.join(", "));
    }
    if let Some(rule) = record.recurrence {
        println!("  recurs:    {}", rule);
        if !record.complete_instances.is_empty() {
            let days: Vec<String> = record
                .complete_instances
                .iter()
                .map(|d| d.to_string())
                .collect();
            println!("  completed: {}", days.join(", "));
        }
    }
    let minutes = record.tracked_minutes();
    if minutes > 0 {
        println!("  tracked:   {}m", minutes);
    }
}
