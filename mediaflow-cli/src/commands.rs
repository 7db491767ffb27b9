//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use mediaflow::prelude::*;
use mediaflow::resolver::ScoredCandidate;
use tracing::{info, warn};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a title to an AniList media id
    Resolve {
        /// Title to resolve
        title: String,
        /// Minimum similarity for a match
        #[arg(short, long)]
        threshold: Option<f64>,
    },
    /// Estimate the air date of a series episode
    Estimate {
        /// Series name
        series: String,
        /// Episode number
        episode: u32,
    },
    /// Print the entries of an AniDB wishlist
    Wishlist {
        /// Wishlist options as JSON, e.g. '{"user_id": 12345}'
        options: String,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the configuration, network or source error of the failing command
pub async fn handle_command(command: Commands, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = RateLimiterRegistry::from_config(&config.rate_limits);
    let cancel = Arc::new(CancellationToken::new());
    spawn_interrupt_handler(Arc::clone(&cancel));

    match command {
        Commands::Resolve { title, threshold } => {
            resolve_title(&config, registry, &cancel, &title, threshold).await
        }
        Commands::Estimate { series, episode } => {
            estimate_release(&config, registry, &cancel, &series, episode).await
        }
        Commands::Wishlist { options } => read_wishlist(&config, registry, &cancel, &options).await,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<MediaflowConfig> {
    let config = match path {
        Some(path) => MediaflowConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => MediaflowConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn spawn_interrupt_handler(cancel: Arc<CancellationToken>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight requests");
            cancel.cancel("interrupted");
        }
    });
}

async fn resolve_title(
    config: &MediaflowConfig,
    registry: RateLimiterRegistry,
    cancel: &CancellationToken,
    title: &str,
    threshold: Option<f64>,
) -> anyhow::Result<()> {
    let resolver = TitleResolver::new(threshold.unwrap_or(config.resolver.threshold))?;
    let client = AniListClient::connect(config, registry)?;

    let outcome = client.search(title, Some(cancel)).await?;
    if outcome.is_partial() {
        warn!(completion = ?outcome.completion, "Search results are incomplete");
    }
    let candidates = outcome.into_items();

    match classify(&resolver, title, &candidates)? {
        Resolution::Matched(best) => {
            println!("{}\t{:.3}\t{}", best.external_id, best.score, best.matched_text);
        }
        Resolution::BelowThreshold(nearest) => {
            info!(
                nearest = %nearest.matched_text,
                score = nearest.score,
                threshold = resolver.threshold(),
                "No candidate above threshold"
            );
        }
        Resolution::NoTitles => info!(candidates = candidates.len(), "No candidate titles"),
    }
    Ok(())
}

#[derive(Debug, PartialEq)]
enum Resolution {
    Matched(ScoredCandidate),
    BelowThreshold(ScoredCandidate),
    NoTitles,
}

/// Scores without a threshold so a miss can report its nearest title.
fn classify(
    resolver: &TitleResolver,
    title: &str,
    candidates: &[SearchCandidate],
) -> anyhow::Result<Resolution> {
    let nearest = TitleResolver::new(0.0)?.score(title, candidates).into_iter().next();
    Ok(match nearest {
        Some(best) if best.score >= resolver.threshold() => Resolution::Matched(best),
        Some(nearest) => Resolution::BelowThreshold(nearest),
        None => Resolution::NoTitles,
    })
}

async fn estimate_release(
    config: &MediaflowConfig,
    registry: RateLimiterRegistry,
    cancel: &CancellationToken,
    series: &str,
    episode: u32,
) -> anyhow::Result<()> {
    let resolver = TitleResolver::new(config.resolver.threshold)?;
    let estimator = ReleaseEstimator::new(AniListClient::connect(config, registry)?, resolver);

    let entry = Entry::new(format!("{series} - {episode:02}")).with_series(series, Some(episode));
    match estimator.try_estimate(&entry, Some(cancel)).await? {
        Some(airs_at) => println!("{}", airs_at.to_rfc3339()),
        None => info!(series = %series, episode, "No release estimate"),
    }
    Ok(())
}

async fn read_wishlist(
    config: &MediaflowConfig,
    registry: RateLimiterRegistry,
    cancel: &CancellationToken,
    options: &str,
) -> anyhow::Result<()> {
    let wishlist_config = WishlistConfig::from_json_str(options).context("parsing wishlist options")?;
    let wishlist = AnidbWishlist::connect(config, registry)?;

    let outcome = wishlist.entries(&wishlist_config, Some(cancel)).await?;
    if outcome.is_partial() {
        warn!(completion = ?outcome.completion, "Wishlist is incomplete");
    }
    for entry in &outcome.items {
        println!("{}", serde_json::to_string(entry)?);
    }
    Ok(())
}
