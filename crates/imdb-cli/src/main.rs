//! Command-line interface for the IMDb series scraper
//!
//! Covers the whole library surface: full-title scraping, season filtering,
//! metadata-only fetches, JSON save/load, and cover image downloading.

mod display;

use std::path::PathBuf;

use clap::Parser;
use imdb_core::{ImdbScraper, ScrapeConfig, TitleAggregate};

#[derive(Parser)]
#[command(name = "imdb-cli")]
#[command(
    about = "Scrape episode titles, ratings, descriptions and cover art for any IMDb TV series",
    long_about = None
)]
#[command(after_help = "Examples:
  imdb-cli tt7441658                    # Black Clover, all seasons
  imdb-cli tt7441658 -s 1 2             # specific seasons only
  imdb-cli tt7441658 -o out.json        # save results to a JSON file
  imdb-cli tt7441658 --download-images  # also download cover art
  imdb-cli tt7441658 --meta-only        # series metadata only, no browser
  imdb-cli --load out.json              # display a previously saved file")]
struct Cli {
    /// IMDb title ID, the 'tt…' code from any IMDb URL, e.g. tt7441658
    #[arg(value_name = "TITLE_ID", required_unless_present = "load")]
    title_id: Option<String>,

    /// Restrict scraping to these season numbers
    #[arg(short, long, num_args = 1.., value_name = "N")]
    seasons: Option<Vec<u32>>,

    /// Save the scraped results to this JSON file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Maximum concurrent browser pages; image downloads run at twice this
    #[arg(short, long, default_value_t = 4, value_name = "N")]
    pool_size: usize,

    /// Download episode cover images to ./images/<title_id>/
    #[arg(long)]
    download_images: bool,

    /// Download cover images to this directory (implies --download-images)
    #[arg(long, value_name = "DIR")]
    images_dir: Option<PathBuf>,

    /// Fetch and display series metadata only, no browser needed
    #[arg(long)]
    meta_only: bool,

    /// Pretty-print a JSON file saved with --output, fully offline
    #[arg(long, value_name = "FILE")]
    load: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if let Some(path) = &cli.load {
        let aggregate = TitleAggregate::load(path)?;
        display::print_title(&aggregate);
        return Ok(());
    }

    let Some(title_id) = cli.title_id else {
        return Err("a title ID is required unless --load is used".into());
    };

    if cli.meta_only {
        let scraper = ImdbScraper::new()?;
        let meta = scraper.fetch_metadata(&title_id).await?;
        println!("\n{meta}\n");
        if !meta.tags.is_empty() {
            println!("Tags: {}", meta.tags.join(", "));
        }
        return Ok(());
    }

    let scraper = ImdbScraper::with_config(ScrapeConfig {
        pool_size: cli.pool_size,
        seasons: cli.seasons,
        images_dir: cli.images_dir,
        download_images: cli.download_images,
        ..ScrapeConfig::default()
    })?;

    let aggregate = scraper.scrape_title(&title_id).await?;

    if let Some(path) = &cli.output {
        let saved = aggregate.save(path)?;
        println!("\n▸  Saved → {}", saved.display());
    }

    display::print_title(&aggregate);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_declaration_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_title_id_required_unless_load() {
        assert!(Cli::try_parse_from(["imdb-cli"]).is_err());
        assert!(Cli::try_parse_from(["imdb-cli", "tt7441658"]).is_ok());
        assert!(Cli::try_parse_from(["imdb-cli", "--load", "out.json"]).is_ok());
    }

    #[test]
    fn test_seasons_take_multiple_values() {
        let cli = Cli::try_parse_from(["imdb-cli", "tt7441658", "-s", "1", "2"]).unwrap();
        assert_eq!(cli.seasons, Some(vec![1, 2]));
        assert_eq!(cli.pool_size, 4);
        assert!(!cli.download_images);
    }

    #[test]
    fn test_images_dir_is_a_path() {
        let cli =
            Cli::try_parse_from(["imdb-cli", "tt7441658", "--images-dir", "covers"]).unwrap();
        assert_eq!(cli.images_dir, Some(PathBuf::from("covers")));
    }
}
