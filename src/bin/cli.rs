//! Posts CLI
//!
//! Searches the remote listing page by page, shows single posts and manages
//! local favorites and search history.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use posts::{
    error::{AppError, Result},
    models::{Config, LocaleConfig, Post},
    paging::LoadState,
    repo::{HintRepository, PostRepository},
    services::{HttpPostApi, PostApi},
    state::{DetailState, FavoritesState, Resource, SearchState},
    storage::{PostStore, SqliteStore},
};

const PREVIEW_GRAPHEMES: usize = 60;

/// posts - paged post search with local favorites
#[derive(Parser, Debug)]
#[command(name = "posts", version, about = "Search posts, keep favorites and search history")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "posts.toml")]
    config: PathBuf,

    /// Path to the locale file with display strings
    #[arg(short, long, default_value = "locale.toml")]
    locale: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search posts by body text; lists everything without a query
    Search {
        query: Option<String>,

        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },

    /// Show one post, local copy first
    Show { id: i64 },

    /// Manage favorites
    Favorite {
        #[command(subcommand)]
        action: FavoriteAction,
    },

    /// Manage search history
    Hints {
        #[command(subcommand)]
        action: HintsAction,
    },

    /// Validate configuration files
    Validate,
}

#[derive(Subcommand, Debug)]
enum FavoriteAction {
    Add { id: i64 },
    Remove { id: i64 },
    List,
}

#[derive(Subcommand, Debug)]
enum HintsAction {
    List,
    Clear,
}

/// Initialize logging with `level` unless RUST_LOG says otherwise.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Everything the commands need, built from configuration.
struct App {
    config: Config,
    locale: LocaleConfig,
    store: Arc<SqliteStore>,
    posts: Arc<PostRepository>,
    hints: Arc<HintRepository>,
}

impl App {
    async fn open(config: Config, locale: LocaleConfig) -> Result<Self> {
        config.validate()?;
        let api: Arc<dyn PostApi> = Arc::new(HttpPostApi::new(&config.remote)?);
        let store = Arc::new(SqliteStore::open(config.store.db_path()).await?);
        let dyn_store: Arc<dyn PostStore> = store.clone();
        let posts = Arc::new(PostRepository::new(
            api,
            Arc::clone(&dyn_store),
            config.paging.page_size,
        ));
        let hints = Arc::new(HintRepository::new(dyn_store));
        Ok(Self {
            config,
            locale,
            store,
            posts,
            hints,
        })
    }

    async fn favorite_ids(&self) -> Result<HashSet<i64>> {
        let favorites = self.store.favorites().await?;
        Ok(favorites.into_iter().map(|f| f.id).collect())
    }

    fn print_post_line(&self, post: &Post, favorite: bool) {
        let marker = if favorite {
            self.locale.messages.favorite_marker.as_str()
        } else {
            " "
        };
        println!(
            "{} {:>5}  {}  | {}",
            marker,
            post.id,
            post.display_title(&self.locale),
            post.preview(&self.locale, PREVIEW_GRAPHEMES)
        );
    }

    fn load_error(&self, error: &AppError) -> String {
        self.locale
            .messages
            .load_error
            .replace("{error}", &error.to_string())
    }

    async fn search(&self, query: Option<String>, pages: usize) -> Result<()> {
        let state = SearchState::new(
            Arc::clone(&self.posts),
            Arc::clone(&self.hints),
            self.config.state.keep_alive(),
        )?;
        let query = state
            .on_query_change(query.as_deref().unwrap_or_default())
            .await?;
        log::info!("Searching posts (query {:?})", query);

        let pager = state.posts();
        let mut last = pager.refresh().await;
        for _ in 1..pages {
            if last.is_error() || last.is_end() {
                break;
            }
            last = pager.append().await;
        }

        let data = pager.snapshot();
        let favorites = self.favorite_ids().await?;
        if data.items.is_empty() && !last.is_error() {
            println!("{}", self.locale.messages.no_results);
        }
        for post in &data.items {
            self.print_post_line(post, favorites.contains(&post.id));
        }
        match &last {
            LoadState::Error(e) => println!("{}", self.load_error(e)),
            LoadState::NotLoading {
                end_of_pagination: true,
            } => println!(
                "{}",
                self.locale
                    .messages
                    .end_of_results
                    .replace("{count}", &data.items.len().to_string())
            ),
            _ => {}
        }
        Ok(())
    }

    async fn show(&self, id: i64) -> Result<()> {
        let state = DetailState::new(Arc::clone(&self.posts), self.config.state.keep_alive())?;
        let mut detail = state.post(id).subscribe();
        let mut status = state.is_favorite(id).subscribe();

        println!("{}", self.locale.messages.loading);
        let resource = detail
            .wait_for(|r| !r.is_loading())
            .await
            .ok_or(AppError::Cancelled)?;
        let favorite = status
            .wait_for(Option::is_some)
            .await
            .flatten()
            .unwrap_or(false);

        if let Some(post) = resource.data() {
            let marker = if favorite {
                self.locale.messages.favorite_marker.as_str()
            } else {
                ""
            };
            println!("{} {}", post.display_title(&self.locale), marker);
            println!();
            println!("{}", post.display_body(&self.locale));
        }
        if let Resource::Error { data, error } = &resource {
            if data.is_some() {
                println!("{}", self.locale.messages.stale_data);
            }
            println!("{}", self.load_error(error));
        }
        Ok(())
    }

    async fn favorite(&self, action: FavoriteAction) -> Result<()> {
        match action {
            FavoriteAction::Add { id } => {
                let state =
                    DetailState::new(Arc::clone(&self.posts), self.config.state.keep_alive())?;
                let mut detail = state.post(id).subscribe();
                let mut status = state.is_favorite(id).subscribe();
                let resource = detail
                    .wait_for(|r| !r.is_loading())
                    .await
                    .ok_or(AppError::Cancelled)?;
                if let Some(error) = resource.error_ref() {
                    log::warn!("Post {} could not be refreshed: {}", id, error);
                }
                let already = status.wait_for(Option::is_some).await.flatten();
                if already != Some(true) {
                    state.toggle_favorite(id).await?;
                }
                println!(
                    "{}",
                    self.locale
                        .messages
                        .favorite_added
                        .replace("{id}", &id.to_string())
                );
            }
            FavoriteAction::Remove { id } => {
                self.posts.remove_favorite(id).await?;
                println!(
                    "{}",
                    self.locale
                        .messages
                        .favorite_removed
                        .replace("{id}", &id.to_string())
                );
            }
            FavoriteAction::List => {
                let state =
                    FavoritesState::new(Arc::clone(&self.posts), self.config.state.keep_alive())?;
                let mut favorites = state.favorites().subscribe();
                let favorites = favorites.changed().await.unwrap_or_default();
                if favorites.is_empty() {
                    println!("{}", self.locale.messages.no_favorites);
                }
                for post in &favorites {
                    self.print_post_line(post, true);
                }
            }
        }
        Ok(())
    }

    async fn hints(&self, action: HintsAction) -> Result<()> {
        match action {
            HintsAction::List => {
                let mut live = self.hints.hints();
                let hints = live.next().await.transpose()?.unwrap_or_default();
                if hints.is_empty() {
                    println!("{}", self.locale.messages.no_hints);
                }
                // Most recent first.
                for hint in hints.iter().rev() {
                    println!("{}", hint);
                }
            }
            HintsAction::Clear => {
                self.hints.clear_all_hints().await?;
                println!("{}", self.locale.messages.hints_cleared);
            }
        }
        Ok(())
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let level = match (&loaded, cli.verbose) {
        (_, true) => "debug",
        (Ok(config), false) => config.logging.level.as_str(),
        (Err(_), false) => "info",
    };
    init_logging(level);

    let config = loaded.unwrap_or_else(|e| {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        );
        Config::default()
    });

    if let Command::Validate = cli.command {
        log::info!("Validating configuration...");
        if let Err(e) = config.validate() {
            log::error!("Config validation failed: {}", e);
            return Err(e);
        }
        log::info!("✓ Config OK");
        if let Err(e) = LocaleConfig::load(&cli.locale) {
            log::error!("Locale file {} is invalid: {}", cli.locale.display(), e);
            return Err(e);
        }
        log::info!("✓ Locale OK");
        return Ok(());
    }

    let locale = LocaleConfig::load_or_default(&cli.locale);
    let app = App::open(config, locale).await?;

    let outcome = match cli.command {
        Command::Search { query, pages } => app.search(query, pages.max(1)).await,
        Command::Show { id } => app.show(id).await,
        Command::Favorite { action } => app.favorite(action).await,
        Command::Hints { action } => app.hints(action).await,
        Command::Validate => Ok(()),
    };

    app.store.close().await;
    outcome
}
