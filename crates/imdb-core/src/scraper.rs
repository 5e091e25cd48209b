//! Main IMDb scraping pipeline
//!
//! This module ties the HTTP client, the render pool, and the structural
//! parsers into one high-level API: fetch series metadata, discover which
//! seasons exist, render and parse every episode list, and optionally
//! download cover art. Unreachable pages degrade the result instead of
//! failing it; only invalid input and persistence problems are errors.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::client::{ClientConfig, ImdbClient, IMDB_BASE_URL};
use crate::error::{ImdbError, Result};
use crate::images;
use crate::parser::{parse_episodes, parse_season_numbers, parse_series_metadata};
use crate::render::{RenderConfig, RenderPool};
use crate::types::{Episode, SeriesMetadata, TitleAggregate};

/// Pipeline configuration
///
/// `pool_size` is the one knob most callers touch: it bounds concurrent
/// browser pages, and image downloads run at twice it. The nested configs
/// expose the retry and timeout details.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Maximum concurrent browser pages (default: 4)
    pub pool_size: usize,
    /// Restrict scraping to these seasons; `None` scrapes all discovered
    pub seasons: Option<Vec<u32>>,
    /// Directory for cover images; setting it enables downloading
    pub images_dir: Option<PathBuf>,
    /// Download covers into `./images` when no directory is given
    pub download_images: bool,
    /// HTTP client settings
    pub client: ClientConfig,
    /// Render pool settings
    pub render: RenderConfig,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            seasons: None,
            images_dir: None,
            download_images: false,
            client: ClientConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

/// Main scraper API for IMDb TV series
///
/// Provides metadata fetching, season discovery, episode scraping, and
/// cover image downloading. All operations are asynchronous.
///
/// # Example
/// ```no_run
/// use imdb_core::ImdbScraper;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let scraper = ImdbScraper::new()?;
///
///     let title = scraper.scrape_title("tt7441658").await?;
///     println!(
///         "{}: {} seasons, {} episodes",
///         title.meta.series_name,
///         title.season_count(),
///         title.episode_count()
///     );
///
///     Ok(())
/// }
/// ```
pub struct ImdbScraper {
    client: ImdbClient,
    pool: RenderPool,
    config: ScrapeConfig,
}

impl ImdbScraper {
    /// Create a new scraper with default configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    ///
    /// # Example
    /// ```
    /// use imdb_core::ImdbScraper;
    ///
    /// let scraper = ImdbScraper::new().expect("Failed to create scraper");
    /// ```
    pub fn new() -> Result<Self> {
        Self::with_config(ScrapeConfig::default())
    }

    /// Create a new scraper with custom configuration.
    ///
    /// `config.pool_size` overrides the pool sizes of the nested client and
    /// render configs so one number governs the whole pipeline.
    ///
    /// # Arguments
    /// * `config` - Pipeline configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_config(config: ScrapeConfig) -> Result<Self> {
        let mut client_config = config.client.clone();
        client_config.pool_size = config.pool_size;
        let mut render_config = config.render.clone();
        render_config.pool_size = config.pool_size;

        let client = ImdbClient::with_config(client_config)?;
        let pool = RenderPool::new(render_config);
        Ok(Self {
            client,
            pool,
            config,
        })
    }

    /// Fetch series-level metadata without touching a browser.
    ///
    /// A title page that stays unreachable yields degraded metadata that
    /// carries the title ID as the series name, so the rest of the pipeline
    /// can continue.
    ///
    /// # Arguments
    /// * `title_id` - IMDb title ID, e.g. `tt7441658`
    ///
    /// # Returns
    /// * `Ok(SeriesMetadata)` parsed from the title page, or degraded
    /// * `Err(ImdbError::InvalidTitleId)` if the ID is not `tt` + digits
    ///
    /// # Example
    /// ```no_run
    /// use imdb_core::ImdbScraper;
    ///
    /// # async fn example() -> Result<(), imdb_core::ImdbError> {
    /// let scraper = ImdbScraper::new()?;
    /// let meta = scraper.fetch_metadata("tt7441658").await?;
    /// println!("{} ({})", meta.series_name, meta.years.unwrap_or_default());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch_metadata(&self, title_id: &str) -> Result<SeriesMetadata> {
        validate_title_id(title_id)?;

        let url = format!("{IMDB_BASE_URL}/title/{title_id}/");
        match self.client.fetch(&url).await {
            Some(html) => Ok(parse_series_metadata(&html, title_id)),
            None => {
                warn!(
                    "title page for {} unreachable, using degraded metadata",
                    title_id
                );
                Ok(SeriesMetadata {
                    title_id: title_id.to_string(),
                    series_name: title_id.to_string(),
                    ..SeriesMetadata::default()
                })
            }
        }
    }

    /// Discover which season numbers exist for a title.
    ///
    /// Reads the episode index page over plain HTTP. An unreachable page
    /// yields an empty vector, which [`scrape_title`] treats as "assume
    /// season 1".
    ///
    /// [`scrape_title`]: ImdbScraper::scrape_title
    ///
    /// # Arguments
    /// * `title_id` - IMDb title ID
    pub async fn discover_seasons(&self, title_id: &str) -> Result<Vec<u32>> {
        validate_title_id(title_id)?;

        let url = format!("{IMDB_BASE_URL}/title/{title_id}/episodes/");
        match self.client.fetch(&url).await {
            Some(html) => Ok(parse_season_numbers(&html)),
            None => {
                warn!("episode index for {} unreachable", title_id);
                Ok(Vec::new())
            }
        }
    }

    /// Render the given seasons and parse their episode cards.
    ///
    /// Returns one entry per requested season, in request order. A season
    /// whose page never rendered carries `None`; a rendered page yields its
    /// episodes in document order (possibly empty).
    ///
    /// # Arguments
    /// * `title_id` - IMDb title ID
    /// * `seasons` - Season numbers to render
    ///
    /// # Errors
    /// Returns `ImdbError::Browser` when no browser could be launched at
    /// all, `ImdbError::InvalidTitleId` on malformed IDs.
    pub async fn render_seasons(
        &self,
        title_id: &str,
        seasons: &[u32],
    ) -> Result<Vec<(u32, Option<Vec<Episode>>)>> {
        validate_title_id(title_id)?;

        let rendered = self.pool.render_seasons(title_id, seasons).await?;
        Ok(rendered
            .into_iter()
            .map(|result| {
                let episodes = result.html.map(|html| parse_episodes(&html));
                (result.season, episodes)
            })
            .collect())
    }

    /// Scrape a whole title: metadata, all requested seasons, and
    /// optionally cover images.
    ///
    /// Season selection follows the configuration: `seasons: None` scrapes
    /// everything discovered, otherwise the requested seasons that actually
    /// exist. When discovery finds nothing the pipeline assumes season 1.
    /// Failed seasons are skipped, not fatal.
    ///
    /// # Arguments
    /// * `title_id` - IMDb title ID
    ///
    /// # Example
    /// ```no_run
    /// use imdb_core::{ImdbScraper, ScrapeConfig};
    ///
    /// # async fn example() -> Result<(), imdb_core::ImdbError> {
    /// let scraper = ImdbScraper::with_config(ScrapeConfig {
    ///     seasons: Some(vec![1, 2]),
    ///     ..ScrapeConfig::default()
    /// })?;
    /// let title = scraper.scrape_title("tt7441658").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn scrape_title(&self, title_id: &str) -> Result<TitleAggregate> {
        let meta = self.fetch_metadata(title_id).await?;
        info!("scraping {} ({})", meta.series_name, title_id);

        let discovered = self.discover_seasons(title_id).await?;
        if discovered.is_empty() {
            warn!("no seasons discovered for {}, assuming season 1", title_id);
        }
        let target = plan_seasons(discovered, self.config.seasons.as_deref());
        info!("rendering seasons {:?}", target);

        let mut aggregate = TitleAggregate::new(meta);
        for (season, episodes) in self.render_seasons(title_id, &target).await? {
            match episodes {
                Some(episodes) => {
                    info!("season {}: {} episodes", season, episodes.len());
                    aggregate.seasons.insert(season, episodes);
                }
                None => warn!("season {} skipped: page never rendered", season),
            }
        }

        if let Some(dir) = self.images_destination() {
            self.download_images(&mut aggregate, &dir).await;
        }

        Ok(aggregate)
    }

    /// Scrape a single season's episodes.
    ///
    /// Cheaper than [`scrape_title`] when only one season matters: the
    /// title page is never fetched and only one page is rendered. A season
    /// that does not exist yields an empty vector.
    ///
    /// [`scrape_title`]: ImdbScraper::scrape_title
    ///
    /// # Arguments
    /// * `title_id` - IMDb title ID
    /// * `season` - Season number (1-indexed)
    pub async fn scrape_season(&self, title_id: &str, season: u32) -> Result<Vec<Episode>> {
        validate_title_id(title_id)?;

        let discovered = self.discover_seasons(title_id).await?;
        let known = plan_seasons(discovered, None);
        if !known.contains(&season) {
            return Ok(Vec::new());
        }

        let mut rendered = self.render_seasons(title_id, &[season]).await?;
        Ok(rendered
            .pop()
            .and_then(|(_, episodes)| episodes)
            .unwrap_or_default())
    }

    /// Scrape a single episode by season and episode number.
    ///
    /// Renders only the containing season, then picks the matching episode.
    ///
    /// # Arguments
    /// * `title_id` - IMDb title ID
    /// * `season` - Season number (1-indexed)
    /// * `episode` - Episode number within the season (1-indexed)
    ///
    /// # Returns
    /// The matching episode, or `None` if it does not exist.
    pub async fn scrape_episode(
        &self,
        title_id: &str,
        season: u32,
        episode: u32,
    ) -> Result<Option<Episode>> {
        let episodes = self.scrape_season(title_id, season).await?;
        Ok(episodes.into_iter().find(|ep| ep.episode == episode))
    }

    /// Download cover images for an already-scraped aggregate.
    ///
    /// Exposed separately so a saved aggregate can be hydrated with images
    /// later. Returns how many files exist after the run; individual
    /// failures are logged and skipped.
    ///
    /// # Arguments
    /// * `aggregate` - Scraped title, updated in place with local paths
    /// * `images_dir` - Directory that receives a `<title_id>/` subdirectory
    pub async fn download_images(
        &self,
        aggregate: &mut TitleAggregate,
        images_dir: &Path,
    ) -> usize {
        images::download_images(
            &self.client,
            aggregate,
            images_dir,
            self.config.pool_size * 2,
        )
        .await
    }

    /// Where covers should go, if downloading is configured at all.
    fn images_destination(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.config.images_dir {
            Some(dir.clone())
        } else if self.config.download_images {
            Some(PathBuf::from("images"))
        } else {
            None
        }
    }
}

/// Validate the `tt` + digits shape of an IMDb title ID.
fn validate_title_id(title_id: &str) -> Result<()> {
    let valid = regex_lite::Regex::new(r"^tt\d+$")
        .map(|re| re.is_match(title_id))
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(ImdbError::InvalidTitleId(title_id.to_string()))
    }
}

/// Decide which seasons to render.
///
/// Empty discovery falls back to season 1. A requested subset keeps only
/// seasons that were discovered, preserving discovered order.
fn plan_seasons(discovered: Vec<u32>, requested: Option<&[u32]>) -> Vec<u32> {
    let discovered = if discovered.is_empty() {
        vec![1]
    } else {
        discovered
    };
    match requested {
        Some(requested) => discovered
            .into_iter()
            .filter(|season| requested.contains(season))
            .collect(),
        None => discovered,
    }
}
