//! `cantine` — command-line front end for the Cantine meal tracker.
//!
//! Talks to a `cantine-server` when one is reachable and falls back to an
//! on-device store otherwise.
//!
//! # Usage
//!
//! ```text
//! cantine --url http://localhost:5000 --user admin --password secret consumers list
//! cantine --config ~/.config/cantine/config.toml meal add <consumer-id> 700
//! cantine mode local
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cantine_client::{
  Canteen, LocalDocs,
  mode::{ConnectivityFlag, ModeSelector, Preference},
  remote::{RemoteConfig, RemoteStore},
};
use cantine_core::{
  consumer::{ConsumerPatch, NewConsumer},
  report::Report,
  snapshot::{ImportSummary, Snapshot},
  store::CanteenStore,
};
use cantine_store_doc::DocStore;
use cantine_store_sqlite::SqliteStore;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "cantine", about = "Track canteen presences and meals")]
struct Args {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the cantine server (default: http://localhost:5000).
  #[arg(long, env = "CANTINE_URL")]
  url: Option<String>,

  #[arg(long, env = "CANTINE_USER")]
  user: Option<String>,

  #[arg(long, env = "CANTINE_PASSWORD")]
  password: Option<String>,

  /// Directory holding the on-device store and the mode preference.
  #[arg(long, env = "CANTINE_DATA_DIR")]
  data_dir: Option<PathBuf>,

  /// Treat the device as offline without probing the server.
  #[arg(long)]
  offline: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Manage consumers.
  #[command(subcommand)]
  Consumers(ConsumersCmd),
  /// Mark or list presences.
  #[command(subcommand)]
  Presence(PresenceCmd),
  /// Record, list or delete meals.
  #[command(subcommand)]
  Meal(MealCmd),
  /// Daily dashboard figures.
  Stats {
    #[arg(long)]
    date: Option<NaiveDate>,
  },
  /// Save the daily report.
  Report {
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Directory to write the report into.
    #[arg(long, default_value = ".")]
    out:  PathBuf,
  },
  /// Show the active mode, or set the preference.
  Mode { set: Option<ModeArg> },
  /// Write the on-device store to a JSON snapshot.
  Export { file: PathBuf },
  /// Load a JSON snapshot (e.g. from `cantine-server --export`) into the
  /// on-device store.
  Import { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum ConsumersCmd {
  List,
  Show { id: String },
  Add {
    name:       String,
    #[arg(long)]
    department: Option<String>,
  },
  /// Change a consumer's name or department. An empty department clears it.
  Edit {
    id:         String,
    #[arg(long)]
    name:       Option<String>,
    #[arg(long)]
    department: Option<String>,
  },
  Remove { id: String },
}

#[derive(Subcommand, Debug)]
enum PresenceCmd {
  List {
    #[arg(long)]
    date: Option<NaiveDate>,
  },
  Mark {
    consumer_id: String,
    #[arg(long)]
    date:        Option<NaiveDate>,
    #[arg(long)]
    absent:      bool,
  },
}

#[derive(Subcommand, Debug)]
enum MealCmd {
  List {
    #[arg(long)]
    date: Option<NaiveDate>,
  },
  Add {
    consumer_id: String,
    /// 700 or 1000.
    amount:      u32,
    #[arg(long)]
    date:        Option<NaiveDate>,
  },
  Remove { id: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
  Local,
  Remote,
}

// ─── Config file ──────────────────────────────────────────────────────────────

#[derive(Deserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum LocalBackend {
  #[default]
  Documents,
  Sqlite,
}

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:           String,
  #[serde(default)]
  username:      String,
  #[serde(default)]
  password:      String,
  data_dir:      Option<PathBuf>,
  #[serde(default)]
  local_backend: LocalBackend,
  #[serde(default)]
  offline:       bool,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let remote_config = RemoteConfig {
    base_url: args
      .url
      .clone()
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| RemoteConfig::default().base_url),
    username: args
      .user
      .clone()
      .or_else(|| (!file_cfg.username.is_empty()).then(|| file_cfg.username.clone()))
      .unwrap_or_default(),
    password: args
      .password
      .clone()
      .or_else(|| (!file_cfg.password.is_empty()).then(|| file_cfg.password.clone()))
      .unwrap_or_default(),
    ..RemoteConfig::default()
  };
  let data_dir = args
    .data_dir
    .clone()
    .or_else(|| file_cfg.data_dir.clone())
    .unwrap_or_else(|| PathBuf::from(".cantine"));
  let offline = args.offline || file_cfg.offline;

  let remote = RemoteStore::new(remote_config).context("building HTTP client")?;
  let online = !offline && remote.probe().await;
  if !online {
    tracing::warn!("server unreachable, using the on-device store");
  }
  let selector = ModeSelector::new(
    ConnectivityFlag::new(online),
    Preference::new(data_dir.join("local-mode")),
  );

  match file_cfg.local_backend {
    LocalBackend::Documents => {
      let local = LocalDocs::new(DocStore::new(data_dir.join("documents")));
      run(Canteen::new(local, remote, selector), args.command).await
    }
    LocalBackend::Sqlite => {
      let path = data_dir.join("cantine.db");
      tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("creating {}", data_dir.display()))?;
      let local = SqliteStore::open(&path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
      run(Canteen::new(local, remote, selector), args.command).await
    }
  }
}

// ─── Snapshots ────────────────────────────────────────────────────────────────

/// On-device stores that can be seeded from and dumped to a [`Snapshot`].
trait Seedable: CanteenStore {
  async fn dump(&self) -> Result<Snapshot>;
  async fn seed(&self, snapshot: Snapshot) -> Result<ImportSummary>;
}

impl Seedable for LocalDocs {
  async fn dump(&self) -> Result<Snapshot> { Ok(self.export().await?) }

  async fn seed(&self, snapshot: Snapshot) -> Result<ImportSummary> {
    Ok(self.import(snapshot).await?)
  }
}

impl Seedable for SqliteStore {
  async fn dump(&self) -> Result<Snapshot> { Ok(self.export_snapshot().await?) }

  async fn seed(&self, snapshot: Snapshot) -> Result<ImportSummary> {
    Ok(self.import_snapshot(snapshot).await?)
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

type App<L> = Canteen<L, RemoteStore, ModeSelector<ConnectivityFlag>>;

async fn run<L: Seedable>(canteen: App<L>, command: Command) -> Result<()> {
  match command {
    Command::Mode { set } => return mode(&canteen, set).await,
    Command::Export { file } => return export(canteen.local(), &file).await,
    Command::Import { file } => return import(canteen.local(), &file).await,
    _ => {}
  }

  canteen
    .reload()
    .await
    .with_context(|| format!("initializing {} data access", canteen.mode()))?;

  match command {
    Command::Consumers(cmd) => consumers(&canteen, cmd).await?,
    Command::Presence(cmd) => presence(&canteen, cmd).await?,
    Command::Meal(cmd) => meal(&canteen, cmd).await?,
    Command::Stats { date } => {
      let daily = canteen.statistics().daily(date).await?;
      let tiers = canteen.statistics().consumption(date).await?;
      println!("consumers      {}", daily.total_consumers);
      println!("present        {}", daily.present_today);
      println!(
        "meals          {} (700: {}, 1000: {})",
        daily.daily_consumptions, tiers.count700, tiers.count1000
      );
      println!("revenue        {} FCFA", daily.daily_revenue);
    }
    Command::Report { date, out } => {
      let report = canteen.reports().daily(date).await?;
      let path = out.join(report.filename());
      let bytes = match &report {
        Report::Document(doc) => doc.body.clone(),
        Report::Snapshot(snapshot) => serde_json::to_vec_pretty(snapshot)?,
      };
      tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
      println!("{}", path.display());
    }
    Command::Mode { .. } | Command::Export { .. } | Command::Import { .. } => {}
  }
  Ok(())
}

async fn consumers<L: Seedable>(canteen: &App<L>, cmd: ConsumersCmd) -> Result<()> {
  let consumers = canteen.consumers();
  match cmd {
    ConsumersCmd::List => {
      for c in consumers.list().await? {
        println!("{}  {}  {}", c.id, c.name, c.department.as_deref().unwrap_or("-"));
      }
    }
    ConsumersCmd::Show { id } => match consumers.get(&id).await? {
      Some(c) => println!("{}", serde_json::to_string_pretty(&c)?),
      None => anyhow::bail!("no consumer with id {id}"),
    },
    ConsumersCmd::Add { name, department } => {
      let c = consumers.create(NewConsumer::new(name, department.as_deref())).await?;
      println!("{}", c.id);
    }
    ConsumersCmd::Edit { id, name, department } => {
      let c = consumers.update(&id, ConsumerPatch { name, department }).await?;
      println!("{}  {}  {}", c.id, c.name, c.department.as_deref().unwrap_or("-"));
    }
    ConsumersCmd::Remove { id } => consumers.delete(&id).await?,
  }
  Ok(())
}

async fn presence<L: Seedable>(canteen: &App<L>, cmd: PresenceCmd) -> Result<()> {
  match cmd {
    PresenceCmd::List { date } => {
      for row in canteen.presences().for_date(date).await? {
        let mark = if row.is_present { "x" } else { " " };
        println!("[{mark}] {}  {}", row.consumer.id, row.consumer.name);
      }
    }
    PresenceCmd::Mark { consumer_id, date, absent } => {
      match canteen.presences().mark(&consumer_id, date, !absent).await? {
        Some(p) => println!("present on {}", p.date),
        None => println!("absent"),
      }
    }
  }
  Ok(())
}

async fn meal<L: Seedable>(canteen: &App<L>, cmd: MealCmd) -> Result<()> {
  match cmd {
    MealCmd::List { date } => {
      for row in canteen.consumptions().by_date(date).await? {
        let name = row.consumer.as_ref().map_or("?", |c| c.name.as_str());
        println!("{}  {:>5} FCFA  {}", row.record.id, row.record.amount, name);
      }
    }
    MealCmd::Add { consumer_id, amount, date } => {
      let m = canteen.consumptions().create(&consumer_id, amount, date).await?;
      println!("{}", m.id);
    }
    MealCmd::Remove { id } => canteen.consumptions().delete(&id).await?,
  }
  Ok(())
}

async fn mode<L: Seedable>(canteen: &App<L>, set: Option<ModeArg>) -> Result<()> {
  if let Some(set) = set {
    canteen
      .resolver()
      .preference()
      .set_local_mode(matches!(set, ModeArg::Local))?;
    canteen.reload().await.context("re-initializing data access")?;
  }
  println!("{}", canteen.mode());
  Ok(())
}

async fn export<L: Seedable>(local: &L, path: &Path) -> Result<()> {
  let snapshot = local.dump().await.context("reading the on-device store")?;
  tokio::fs::write(path, serde_json::to_vec_pretty(&snapshot)?)
    .await
    .with_context(|| format!("writing {}", path.display()))?;
  Ok(())
}

async fn import<L: Seedable>(local: &L, path: &Path) -> Result<()> {
  let bytes = tokio::fs::read(path)
    .await
    .with_context(|| format!("reading {}", path.display()))?;
  let snapshot: Snapshot = serde_json::from_slice(&bytes).context("malformed snapshot")?;
  let summary = local.seed(snapshot).await.context("import failed")?;
  println!(
    "imported {} consumers, {} presences, {} consumptions ({} skipped)",
    summary.consumers, summary.presences, summary.consumptions, summary.skipped
  );
  Ok(())
}
