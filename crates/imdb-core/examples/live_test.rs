use imdb_core::ImdbScraper;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let scraper = ImdbScraper::new()?;

    // Black Clover
    let title_id = "tt7441658";

    println!("🔍 Fetching metadata for {}...\n", title_id);

    let meta = scraper.fetch_metadata(title_id).await?;

    println!("Name: {}", meta.series_name);
    if let Some(kind) = &meta.kind {
        println!("Type: {}", kind);
    }
    if let Some(years) = &meta.years {
        println!("Years: {}", years);
    }
    if let Some(rating) = &meta.imdb_rating {
        let votes = meta.rating_count.as_deref().unwrap_or("?");
        println!("Rating: {} ({} votes)", rating, votes);
    }
    if !meta.tags.is_empty() {
        println!("Tags: {}", meta.tags.join(", "));
    }

    println!("\n📋 Discovering seasons...");

    let seasons = scraper.discover_seasons(title_id).await?;
    println!("Found {} season(s): {:?}", seasons.len(), seasons);

    // Render only the first season; rendering launches a Chromium instance
    if let Some(&first) = seasons.first() {
        println!("\n🎬 Rendering season {}...\n", first);

        let rendered = scraper.render_seasons(title_id, &[first]).await?;
        match rendered.into_iter().next() {
            Some((season, Some(episodes))) => {
                for ep in episodes.iter().take(10) {
                    println!("  {} {} [{}]", ep.episode_code, ep.title, ep.rating);
                }
                if episodes.len() > 10 {
                    println!("  ... and {} more", episodes.len() - 10);
                }
                println!("\nSeason {} has {} episodes in total.", season, episodes.len());
            }
            _ => println!("❌ The season page never rendered."),
        }
    }

    Ok(())
}
