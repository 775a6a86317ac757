//! Postboard command line client
//!
//! Loads the first page, scrolls a simulated viewport to pull in further
//! pages, then optionally adds or removes a post, printing the list after
//! every step.

use anyhow::{Context, anyhow};
use clap::Parser;
use postboard::actions::{add_post, fetch_more_posts, refresh, remove_post};
use postboard::scroll::{Geometry, LIST_THRESHOLD, ScrollObserver};
use postboard::view::{debug_panel, render};
use postboard::{
    Coordinator, HttpPostsApi, InMemoryPostsApi, ListState, NewPost, PostId, PostsAction, PostsApi,
    PostsConfig, PostsEnvironment, PostsReducer, PostsStore,
};
use postboard_runtime::Store;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Height of one rendered line in scroll units
const LINE_HEIGHT: u32 = 20;

/// Time pending effects get to finish on exit
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "postboard", version, about = "Browse, add and remove posts")]
struct Cli {
    /// Listing server (overrides POSTBOARD_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Serve generated posts instead of calling the server
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Most next pages to load by scrolling
    #[arg(short, long, default_value_t = 2)]
    pages: u32,

    /// Add a post
    #[arg(long, num_args = 2, value_names = ["TITLE", "BODY"])]
    add: Option<Vec<String>>,

    /// Remove the post with this id
    #[arg(long, value_name = "ID")]
    remove: Option<u64>,

    /// Rows of the simulated viewport
    #[arg(long, default_value_t = 24)]
    viewport_lines: u32,

    /// Print paging counters under each screen
    #[arg(long, default_value_t = false)]
    debug_panel: bool,

    /// Seconds to wait for each result
    #[arg(long, default_value_t = 30)]
    wait_secs: u64,
}

/// Dispatches intents and prints the screens that follow
struct Session<'a> {
    store: &'a PostsStore,
    wait: Duration,
    debug_panel: bool,
}

impl Session<'_> {
    async fn dispatch<F>(&self, action: PostsAction, is_result: F) -> anyhow::Result<PostsAction>
    where
        F: Fn(&PostsAction) -> bool,
    {
        let label = format!("{action:?}");
        self.store
            .send_and_wait_for(action, is_result, self.wait)
            .await
            .with_context(|| format!("no result for {label}"))
    }

    async fn show(&self) {
        println!("{}", self.store.state(render).await);
        if self.debug_panel {
            println!("{}\n", self.store.state(debug_panel).await);
        }
    }

    /// Scroll to the bottom until the observer stops asking for pages
    async fn scroll(&self, max_pages: u32, viewport_lines: u32) -> anyhow::Result<()> {
        let mut observer = ScrollObserver::new(LIST_THRESHOLD);

        for _ in 0..max_pages {
            let (lines, page, next, loading_more, has_more, failed) = self
                .store
                .state(|s| {
                    let lines = u32::try_from(render(s).lines().count()).unwrap_or(u32::MAX);
                    (lines, s.page, s.next_page(), s.loading_more, s.has_more, s.error.is_some())
                })
                .await;
            if failed {
                break;
            }

            let geometry = Geometry::at_bottom(
                lines.saturating_mul(LINE_HEIGHT),
                viewport_lines.saturating_mul(LINE_HEIGHT),
            );
            let wants_more = ScrollObserver::initial_check(geometry, loading_more, has_more)
                || observer.on_scroll(geometry, loading_more, has_more);
            if !wants_more {
                tracing::info!(page, has_more, "Nothing more to load");
                break;
            }

            println!(">>> Scrolled to the bottom, loading page {next}\n");
            self.dispatch(fetch_more_posts(next), |a| {
                matches!(
                    a,
                    PostsAction::FetchMorePostsSuccess { .. }
                        | PostsAction::FetchMorePostsFailure { .. }
                        | PostsAction::FetchMorePostsCancelled { .. }
                )
            })
            .await?;
            self.show().await;
        }
        Ok(())
    }
}

fn build_api(cli: &Cli, config: &PostsConfig) -> anyhow::Result<Arc<dyn PostsApi>> {
    if cli.offline {
        tracing::info!(posts = config.total_count, "Serving generated posts");
        return Ok(Arc::new(InMemoryPostsApi::sample(config.total_count)));
    }

    tracing::info!(base_url = %config.base_url, "Using listing server");
    let api = HttpPostsApi::new(config.base_url.clone(), config.request_timeout())
        .context("failed to build HTTP client")?;
    Ok(Arc::new(api))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postboard=info,postboard_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = PostsConfig::from_env();
    if let Some(base_url) = &cli.base_url {
        config.base_url.clone_from(base_url);
    }
    config.validate().context("invalid configuration")?;

    let env = PostsEnvironment {
        api: build_api(&cli, &config)?,
        listing: config.listing(),
        default_author_id: config.default_author_id,
    };
    let store: PostsStore = Store::new(ListState::default(), PostsReducer::new(), env);

    let coordinator = Coordinator::new();
    let watcher = coordinator.spawn(&store, config.restart_policy());

    let session = Session {
        store: &store,
        wait: Duration::from_secs(cli.wait_secs),
        debug_panel: cli.debug_panel,
    };

    println!(">>> Loading posts\n");
    session
        .dispatch(refresh(), |a| {
            matches!(
                a,
                PostsAction::FetchPostsSuccess { .. } | PostsAction::FetchPostsFailure { .. }
            )
        })
        .await?;
    session.show().await;

    session.scroll(cli.pages, cli.viewport_lines).await?;

    if let Some(fields) = cli.add.clone() {
        let [title, body]: [String; 2] = fields
            .try_into()
            .map_err(|_| anyhow!("--add takes a title and a body"))?;
        let post = NewPost::new(title, body);
        post.validate()?;

        println!(">>> Adding \"{}\"\n", post.title);
        session
            .dispatch(add_post(post), |a| {
                matches!(
                    a,
                    PostsAction::AddPostSuccess { .. } | PostsAction::AddPostFailure { .. }
                )
            })
            .await?;
        session.show().await;
    }

    if let Some(id) = cli.remove.map(PostId::new) {
        if store.state(|s| s.get(id).is_none()).await {
            tracing::warn!(%id, "No loaded post has this id");
        }

        println!(">>> Removing #{id}\n");
        session
            .dispatch(remove_post(id), |a| {
                matches!(
                    a,
                    PostsAction::RemovePostSuccess { .. } | PostsAction::RemovePostFailure { .. }
                )
            })
            .await?;
        session.show().await;
    }

    coordinator.stop();
    tracing::debug!(pending = store.pending_effects(), "Shutting down");
    store
        .shutdown(SHUTDOWN_TIMEOUT)
        .await
        .context("pending effects did not finish")?;
    watcher
        .await
        .context("coordinator task failed")?
        .context("coordinator gave up")?;

    Ok(())
}
