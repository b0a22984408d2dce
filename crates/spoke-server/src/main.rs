//! `spoke`: community server and command-line client.
//!
//! Reads `spoke.toml` (or the path given with `--config`), opens the SQLite
//! store, and either serves the JSON API or runs a one-shot command against
//! the local store.

mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, anyhow, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use spoke_api::{AppState, Feeds};
use spoke_core::{
  catalog::{ADVENTURES, LIKES_FIELD, NewAdventure, RideCategory, default_query},
  document::DocumentId,
  filter::Filter,
  identity::Identity,
  live::{LiveCollection, ViewState},
  mutation::{CounterMode, Mutations, WriteOutcome},
  query::{CollectionQuery, Direction},
  seed::seed_if_empty,
  session::AuthSession,
  store::DocumentStore,
};
use spoke_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Spoke cycling community server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "spoke.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API.
  Serve,
  /// Populate empty catalog collections with starter content.
  Seed,
  /// Print a live collection every time it changes, until interrupted.
  Watch(WatchArgs),
  /// Create an account.
  Signup {
    #[command(flatten)]
    creds: Credentials,
    /// Name shown as author on posts and comments.
    #[arg(long, default_value = "")]
    name:  String,
  },
  /// Share an adventure.
  Post {
    #[command(flatten)]
    creds:       Credentials,
    #[arg(long)]
    title:       String,
    #[arg(long, default_value = "Mountain")]
    category:    RideCategory,
    #[arg(long)]
    description: String,
  },
  /// Like a document.
  Like {
    #[command(flatten)]
    creds:      Credentials,
    id:         String,
    #[arg(long, default_value = ADVENTURES)]
    collection: String,
  },
  /// Comment on a document.
  Comment {
    #[command(flatten)]
    creds:      Credentials,
    id:         String,
    text:       String,
    #[arg(long, default_value = ADVENTURES)]
    collection: String,
  },
}

#[derive(Args)]
struct WatchArgs {
  collection: String,
  /// Field to order by. Defaults to the catalog ordering.
  #[arg(long)]
  order_by:   Option<String>,
  #[arg(long)]
  desc:       bool,
  /// Only print items in this category.
  #[arg(long)]
  category:   Option<String>,
}

#[derive(Args)]
struct Credentials {
  #[arg(long, env = "SPOKE_EMAIL")]
  email:    String,
  #[arg(long, env = "SPOKE_PASSWORD", hide_env_values = true)]
  password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config)?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?
    .with_access_rules(cfg.access.clone());
  let store = Arc::new(store);

  match cli.command {
    Command::Serve => serve(store, cfg).await,
    Command::Seed => seed(&store).await,
    Command::Watch(args) => watch(&store, args).await,
    Command::Signup { creds, name } => {
      let session = AuthSession::new(store.clone());
      let who = session
        .sign_up(&creds.email, &creds.password, &name)
        .await
        .context("sign-up failed")?;
      println!("created {} ({})", who.uid, who.author_label());
      session.sign_out().await;
      Ok(())
    }
    Command::Post { creds, title, category, description } => {
      let adventure = NewAdventure { title, category, description };
      with_identity(&store, &creds, cfg.counter_mode, async move |who, mutations| {
        let item = adventure.into_document(who, Utc::now().date_naive())?;
        let doc = mutations.create_item(who, ADVENTURES, item).await?;
        println!("posted {}", doc.id);
        Ok(())
      })
      .await
    }
    Command::Like { creds, id, collection } => {
      let id = DocumentId::from(id);
      let observed = store
        .get_document(&collection, &id)
        .await?
        .ok_or_else(|| anyhow!("document {collection}/{id} not found"))?
        .counter(LIKES_FIELD);
      with_identity(&store, &creds, cfg.counter_mode, async |who, mutations| {
        let doc = mutations
          .increment_counter(who, &collection, &id, LIKES_FIELD, observed)
          .await?;
        println!("{} likes", doc.counter(LIKES_FIELD));
        Ok(())
      })
      .await
    }
    Command::Comment { creds, id, text, collection } => {
      let id = DocumentId::from(id);
      with_identity(&store, &creds, cfg.counter_mode, async |who, mutations| {
        match mutations.add_comment(who, &collection, &id, &text).await? {
          WriteOutcome::Written(doc) => println!("{} comments", doc.comments().len()),
          WriteOutcome::Skipped => println!("empty comment, nothing sent"),
        }
        Ok(())
      })
      .await
    }
  }
}

// ─── Serve ────────────────────────────────────────────────────────────────────

async fn serve(store: Arc<SqliteStore>, cfg: ServerConfig) -> anyhow::Result<()> {
  if cfg.seed_on_start {
    seed_if_empty(&*store).await.context("failed to seed store")?;
  }

  let feeds = Feeds::open(&*store, &cfg.feeds).await;
  let state = AppState::new(store, feeds).with_counter_mode(cfg.counter_mode);
  let feeds = state.feeds.clone();

  let app = spoke_api::api_router(state).layer(TraceLayer::new_for_http());
  let address = cfg.address();

  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let served = axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error");

  feeds.close();
  served
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  info!("shutting down");
}

// ─── Seed ─────────────────────────────────────────────────────────────────────

async fn seed(store: &SqliteStore) -> anyhow::Result<()> {
  let report = seed_if_empty(store).await.context("failed to seed store")?;
  for (collection, count) in &report.written {
    println!("{collection}: {count}");
  }
  println!("{} documents written", report.total());
  Ok(())
}

// ─── Watch ────────────────────────────────────────────────────────────────────

fn watch_query(args: &WatchArgs) -> anyhow::Result<CollectionQuery> {
  let direction = if args.desc { Direction::Descending } else { Direction::Ascending };
  match (&args.order_by, default_query(&args.collection)) {
    (Some(order_by), _) => Ok(CollectionQuery::new(&args.collection, order_by, direction)),
    (None, Some(query)) => Ok(query),
    (None, None) => bail!("--order-by is required for collection {:?}", args.collection),
  }
}

fn print_state(state: &ViewState, filter: &Filter) -> anyhow::Result<()> {
  println!("── revision {} ──", state.revision);
  for doc in filter.select(&state.items) {
    println!("{}", serde_json::to_string(doc)?);
  }
  Ok(())
}

async fn watch(store: &SqliteStore, args: WatchArgs) -> anyhow::Result<()> {
  let query = watch_query(&args)?;
  let filter = Filter::category(args.category.as_deref());

  let mut view = LiveCollection::open(store, query).await;
  let result = follow(&mut view, &filter).await;
  view.close();
  result
}

async fn follow(view: &mut LiveCollection, filter: &Filter) -> anyhow::Result<()> {
  let mut state = view.loaded().await;
  loop {
    if let Some(error) = &state.error {
      bail!("subscription failed: {error}");
    }
    print_state(&state, filter)?;

    tokio::select! {
      _ = tokio::signal::ctrl_c() => return Ok(()),
      next = view.changed() => match next {
        Some(next) => state = next,
        None => return Ok(()),
      },
    }
  }
}

// ─── Signed-in commands ───────────────────────────────────────────────────────

/// Sign in, run `f` with the resulting identity, then sign out again.
async fn with_identity<F>(
  store: &Arc<SqliteStore>,
  creds: &Credentials,
  mode: CounterMode,
  f: F,
) -> anyhow::Result<()>
where
  F: AsyncFnOnce(&Identity, &Mutations<SqliteStore>) -> anyhow::Result<()>,
{
  let session = AuthSession::new(store.clone());
  session.restore(None).await?;
  session
    .sign_in(&creds.email, &creds.password)
    .await
    .context("sign-in failed")?;
  let who = session.require()?;

  let mutations = Mutations::new(store.clone()).with_counter_mode(mode);
  let result = f(&who, &mutations).await;
  session.sign_out().await;
  result
}
