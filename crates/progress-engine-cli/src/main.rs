use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use progress_engine_api::{load_snapshot, DashboardApi};
use progress_engine_core::{
    categories_for, classify, group_rules, BoardFilter, BoardSort, CounterId, EntityId,
    MasterySort, OverlapSort, ReferenceTables, RosterFilter, SeriesFilter, SeriesSort, Snapshot,
    SortDirection,
};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CLI_CONTRACT_VERSION: &str = "cli.v1";

#[derive(Debug, Parser)]
#[command(name = "pdash")]
#[command(about = "Player progression dashboard CLI")]
struct Cli {
    /// Snapshot JSON produced by the collector.
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// YAML overrides for the built-in reference tables.
    #[arg(long, global = true)]
    tables: Option<PathBuf>,

    /// Fallback log filter when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Every derived view; empty when no snapshot is given.
    View,
    Resolve(ResolveArgs),
    /// Mastery roster with level progress.
    Mastery(MasteryArgs),
    /// Detail card for one entity.
    Detail(DetailArgs),
    /// Completed and available members of one counter.
    Members(MembersArgs),
    Series(SeriesArgs),
    Recommend(RecommendArgs),
    Overlap(OverlapArgs),
    Collection,
    Classify(ClassifyArgs),
    Team(TeamArgs),
    Board(BoardArgs),
    Classes,
    Tables,
}

#[derive(Debug, Args)]
struct ResolveArgs {
    #[arg(long)]
    counter_id: Option<u64>,
}

#[derive(Debug, Args)]
struct MasteryArgs {
    #[arg(long, default_value = "")]
    search: String,
    /// Keep entities with any of these archetypes.
    #[arg(long = "archetype")]
    archetypes: Vec<String>,
    #[arg(long, value_parser = mastery_sort, default_value = "level")]
    sort: MasterySort,
    #[arg(long, value_parser = sort_direction, default_value = "desc")]
    direction: SortDirection,
}

#[derive(Debug, Args)]
struct DetailArgs {
    #[arg(long)]
    entity_id: u32,
}

#[derive(Debug, Args)]
struct MembersArgs {
    #[arg(long)]
    counter_id: u64,
}

#[derive(Debug, Args)]
struct SeriesArgs {
    #[arg(long)]
    entity_id: Option<u32>,
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long = "archetype")]
    archetypes: Vec<String>,
    /// Drop entities with a completed series.
    #[arg(long, default_value_t = false)]
    hide_completed: bool,
    #[arg(long, value_parser = series_sort, default_value = "starter")]
    sort: SeriesSort,
    #[arg(long, value_parser = sort_direction, default_value = "desc")]
    direction: SortDirection,
}

#[derive(Debug, Args)]
struct OverlapArgs {
    #[arg(long, value_parser = overlap_sort, default_value = "owned")]
    sort: OverlapSort,
    #[arg(long, value_parser = sort_direction, default_value = "desc")]
    direction: SortDirection,
}

#[derive(Debug, Args)]
struct RecommendArgs {
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Debug, Args)]
struct ClassifyArgs {
    /// Capstone group whose members become the rule table.
    #[arg(long)]
    group: String,
}

#[derive(Debug, Args)]
struct TeamArgs {
    #[arg(long = "counter-id")]
    counter_ids: Vec<u64>,
    #[arg(long)]
    archetype: Option<String>,
}

#[derive(Debug, Args)]
struct BoardArgs {
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long, default_value_t = false)]
    hide_legacy: bool,
    #[arg(long, default_value_t = false)]
    hide_capstone: bool,
    #[arg(long, default_value_t = false)]
    hide_masters: bool,
    #[arg(long, value_parser = board_sort, default_value = "progress")]
    sort: BoardSort,
    #[arg(long, value_parser = sort_direction, default_value = "desc")]
    direction: SortDirection,
}

impl BoardArgs {
    fn filter(&self) -> BoardFilter {
        BoardFilter {
            search: self.search.clone(),
            hide_legacy: self.hide_legacy,
            hide_capstone: self.hide_capstone,
            hide_masters: self.hide_masters,
            sort: self.sort,
            direction: self.direction,
        }
    }
}

fn parsed<T>(value: &str, parse: fn(&str) -> Option<T>, expected: &str) -> Result<T, String> {
    parse(value).ok_or_else(|| format!("`{value}` is not one of: {expected}"))
}

fn board_sort(value: &str) -> Result<BoardSort, String> {
    parsed(value, BoardSort::parse, "name, progress")
}

fn mastery_sort(value: &str) -> Result<MasterySort, String> {
    parsed(value, MasterySort::parse, "level, points")
}

fn series_sort(value: &str) -> Result<SeriesSort, String> {
    parsed(value, SeriesSort::parse, "entity, starter, series1, series2")
}

fn overlap_sort(value: &str) -> Result<OverlapSort, String> {
    parsed(value, OverlapSort::parse, "entity, total, owned, queued, owned_plus_queued, unowned")
}

fn sort_direction(value: &str) -> Result<SortDirection, String> {
    parsed(value, SortDirection::parse, "asc, desc")
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level).with_context(|| format!("invalid --log-level `{log_level}`"))?,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

fn require_snapshot(path: Option<&Path>) -> Result<Snapshot> {
    let path = path.ok_or_else(|| anyhow!("--snapshot is required for this command"))?;
    load_snapshot(path)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let mut api = match cli.tables.as_deref() {
        Some(path) => DashboardApi::from_tables_path(path)?,
        None => DashboardApi::new(ReferenceTables::default())?,
    };
    debug!(command = ?cli.command, "running command");

    let snapshot_path = cli.snapshot.as_deref();
    match cli.command {
        Command::View => run_view(&mut api, snapshot_path),
        Command::Resolve(args) => run_resolve(&mut api, &require_snapshot(snapshot_path)?, &args),
        Command::Mastery(args) => run_mastery(&api, &require_snapshot(snapshot_path)?, &args),
        Command::Detail(args) => run_detail(&api, &require_snapshot(snapshot_path)?, &args),
        Command::Members(args) => run_members(&api, &require_snapshot(snapshot_path)?, &args),
        Command::Series(args) => run_series(&mut api, &require_snapshot(snapshot_path)?, &args),
        Command::Recommend(args) => run_recommend(&api, &require_snapshot(snapshot_path)?, &args),
        Command::Overlap(args) => run_overlap(&mut api, &require_snapshot(snapshot_path)?, &args),
        Command::Collection => run_collection(&mut api, &require_snapshot(snapshot_path)?),
        Command::Classify(args) => run_classify(&require_snapshot(snapshot_path)?, &args),
        Command::Team(args) => run_team(&api, &require_snapshot(snapshot_path)?, &args),
        Command::Board(args) => run_board(&api, &require_snapshot(snapshot_path)?, &args),
        Command::Classes => run_classes(&mut api, &require_snapshot(snapshot_path)?),
        Command::Tables => emit_json(serde_json::to_value(api.tables())?),
    }
}

fn run_view(api: &mut DashboardApi, snapshot_path: Option<&Path>) -> Result<()> {
    let snapshot = snapshot_path.map(load_snapshot).transpose()?;
    let view = api.view_or_empty(snapshot.as_ref())?;
    emit_json(serde_json::to_value(view)?)
}

fn run_resolve(api: &mut DashboardApi, snapshot: &Snapshot, args: &ResolveArgs) -> Result<()> {
    let view = api.view(snapshot)?;
    let counters = view
        .counters
        .iter()
        .filter(|entry| args.counter_id.is_none() || args.counter_id == Some(entry.resolution.counter_id.0))
        .collect::<Vec<_>>();
    if let Some(id) = args.counter_id.filter(|_| counters.is_empty()) {
        return Err(anyhow!("counter {id} is not in the snapshot"));
    }
    emit_json(serde_json::json!({
        "snapshot_id": view.snapshot_id,
        "counters": counters,
    }))
}

fn run_mastery(api: &DashboardApi, snapshot: &Snapshot, args: &MasteryArgs) -> Result<()> {
    let filter = RosterFilter {
        search: args.search.clone(),
        archetypes: args.archetypes.clone(),
        sort: args.sort,
        direction: args.direction,
    };
    let rows = api.mastery(snapshot, &filter);
    emit_json(serde_json::json!({
        "sort": filter.sort.as_str(),
        "direction": filter.direction.as_str(),
        "rows": rows,
    }))
}

fn run_detail(api: &DashboardApi, snapshot: &Snapshot, args: &DetailArgs) -> Result<()> {
    let detail = api.entity_detail(snapshot, EntityId(args.entity_id))?;
    emit_json(serde_json::to_value(detail)?)
}

fn run_members(api: &DashboardApi, snapshot: &Snapshot, args: &MembersArgs) -> Result<()> {
    let members = api.counter_members(snapshot, CounterId(args.counter_id))?;
    emit_json(serde_json::to_value(members)?)
}

fn run_series(api: &mut DashboardApi, snapshot: &Snapshot, args: &SeriesArgs) -> Result<()> {
    let filter = SeriesFilter {
        search: args.search.clone(),
        archetypes: args.archetypes.clone(),
        hide_completed: args.hide_completed,
        sort: args.sort,
        direction: args.direction,
    };
    let rollups = api
        .series_table(snapshot, &filter)
        .into_iter()
        .filter(|rollup| args.entity_id.is_none() || args.entity_id == Some(rollup.entity_id.0))
        .collect::<Vec<_>>();
    let view = api.view(snapshot)?;
    emit_json(serde_json::json!({
        "snapshot_id": view.snapshot_id,
        "sort": filter.sort.as_str(),
        "direction": filter.direction.as_str(),
        "series": rollups,
    }))
}

fn run_recommend(api: &DashboardApi, snapshot: &Snapshot, args: &RecommendArgs) -> Result<()> {
    let mut report = api.recommendations(snapshot);
    if let Some(limit) = args.limit {
        report.recommendations.truncate(limit);
    }
    emit_json(serde_json::to_value(report)?)
}

fn run_overlap(api: &mut DashboardApi, snapshot: &Snapshot, args: &OverlapArgs) -> Result<()> {
    let rows = api.overlap_table(snapshot, args.sort, args.direction);
    let view = api.view(snapshot)?;
    emit_json(serde_json::json!({
        "snapshot_id": view.snapshot_id,
        "sort": args.sort.as_str(),
        "direction": args.direction.as_str(),
        "overlaps": rows,
    }))
}

fn run_collection(api: &mut DashboardApi, snapshot: &Snapshot) -> Result<()> {
    let view = api.view(snapshot)?;
    emit_json(serde_json::json!({
        "snapshot_id": view.snapshot_id,
        "collection": view.collection,
    }))
}

fn run_classify(snapshot: &Snapshot, args: &ClassifyArgs) -> Result<()> {
    let rules = group_rules(&snapshot.counters, &args.group);
    if rules.is_empty() {
        return Err(anyhow!("capstone group `{}` has no member counters", args.group));
    }
    let entities = snapshot
        .entities
        .iter()
        .map(|entity| {
            serde_json::json!({
                "entity_id": entity.id,
                "name": entity.name,
                "category": classify(entity, &rules),
                "labels": categories_for(entity, &rules),
            })
        })
        .collect::<Vec<_>>();
    emit_json(serde_json::json!({
        "group": args.group,
        "rules": rules.iter().map(|rule| rule.label.as_str()).collect::<Vec<_>>(),
        "entities": entities,
    }))
}

fn run_team(api: &DashboardApi, snapshot: &Snapshot, args: &TeamArgs) -> Result<()> {
    let selected = args.counter_ids.iter().copied().map(CounterId).collect::<Vec<_>>();
    let pool = api.team(snapshot, &selected, args.archetype.as_deref())?;
    let available = pool.iter().filter(|candidate| candidate.available).count();
    emit_json(serde_json::json!({
        "available": available,
        "pool": pool,
    }))
}

fn run_board(api: &DashboardApi, snapshot: &Snapshot, args: &BoardArgs) -> Result<()> {
    let filter = args.filter();
    let entries = api.board(snapshot, &filter);
    emit_json(serde_json::json!({
        "sort": filter.sort.as_str(),
        "direction": filter.direction.as_str(),
        "entries": entries,
    }))
}

fn run_classes(api: &mut DashboardApi, snapshot: &Snapshot) -> Result<()> {
    let requirement_tier = api.tables().requirement_tier.clone();
    let view = api.view(snapshot)?;
    emit_json(serde_json::json!({
        "requirement_tier": requirement_tier,
        "classes": view.class_mastery,
    }))
}
