//! Terminal output for scraped titles
//!
//! Renders a [`TitleAggregate`] as a box-drawn plain-text report: a header
//! with the series metadata, then one block per season with a star bar and
//! a short description for every episode. Purely cosmetic, no scraping
//! logic lives here.

use imdb_core::{Episode, TitleAggregate};

/// Total report width in characters.
const WIDTH: usize = 72;

/// Pretty-print a full aggregate to stdout.
pub fn print_title(aggregate: &TitleAggregate) {
    print!("{}", render_title(aggregate));
}

/// Build the whole report as one string.
fn render_title(aggregate: &TitleAggregate) -> String {
    let meta = &aggregate.meta;
    let mut lines: Vec<String> = Vec::new();

    lines.push(String::new());
    lines.push(format!("╔{}╗", "═".repeat(WIDTH - 2)));
    lines.push(box_row(&format!(
        "  {}  ·  {}",
        meta.series_name, meta.title_id
    )));

    let meta_parts: Vec<&str> = [
        meta.kind.as_deref(),
        meta.years.as_deref(),
        meta.content_rating.as_deref(),
        meta.episode_duration.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !meta_parts.is_empty() {
        lines.push(box_row(&format!("  {}", meta_parts.join("  ·  "))));
    }

    if let Some(rating) = &meta.imdb_rating {
        let votes = meta
            .rating_count
            .as_ref()
            .map(|count| format!("  ({count} votes)"))
            .unwrap_or_default();
        let popularity = meta
            .popularity
            .as_ref()
            .map(|rank| format!("   Popularity: #{rank}"))
            .unwrap_or_default();
        lines.push(box_row(&format!("  ★  {rating}{votes}{popularity}")));
    }

    if !meta.tags.is_empty() {
        let mut tag_row = format!("  {}", meta.tags.join(" · "));
        if tag_row.chars().count() > WIDTH - 2 {
            tag_row = tag_row.chars().take(WIDTH - 5).collect::<String>() + "...";
        }
        lines.push(box_row(&tag_row));
    }

    lines.push(box_row(&format!(
        "  Seasons: {}   Episodes: {}",
        aggregate.season_count(),
        aggregate.episode_count()
    )));
    lines.push(format!("╚{}╝", "═".repeat(WIDTH - 2)));

    for (season, episodes) in &aggregate.seasons {
        lines.push(String::new());
        lines.push(season_header(*season, episodes.len()));
        for episode in episodes {
            render_episode(&mut lines, episode);
        }
        lines.push(format!("  └{}┘", "─".repeat(WIDTH - 4)));
    }

    lines.push(String::new());
    lines.join("\n") + "\n"
}

/// One `║ … ║` row, content padded to the report width.
fn box_row(content: &str) -> String {
    let pad = (WIDTH - 2).saturating_sub(content.chars().count());
    format!("║{content}{}║", " ".repeat(pad))
}

/// `┌ SEASON n ───… x episodes ┐` opener for a season block.
fn season_header(season: u32, episode_count: usize) -> String {
    let label = format!(" SEASON {season} ");
    let count = format!(" {episode_count} episodes ");
    let pad = (WIDTH - 4).saturating_sub(label.chars().count() + count.chars().count());
    format!("  ┌{label}{}{count}┐", "─".repeat(pad))
}

/// Append the compact card for one episode.
fn render_episode(lines: &mut Vec<String>, episode: &Episode) {
    lines.push(format!(
        "  │ {:<8} {}",
        episode.episode_code, episode.title
    ));

    let (number, votes) = rating_parts(&episode.rating);
    let votes_part = votes.map(|v| format!(" ({v})")).unwrap_or_default();
    lines.push(format!(
        "  │   {}  {}/10{}",
        stars(&episode.rating),
        number,
        votes_part
    ));

    let wrapped = wrap(&episode.description, WIDTH - 8);
    for (index, line) in wrapped.iter().take(2).enumerate() {
        let suffix = if index == 1 && wrapped.len() > 2 {
            " …"
        } else {
            ""
        };
        lines.push(format!("  │   {line}{suffix}"));
    }

    if let Some(local) = &episode.cover_image_local {
        lines.push(format!("  │   ▸ {local}"));
    }

    lines.push("  │".to_string());
}

/// Split a display rating like "7.6/10 (1.6K)" into number and vote count.
fn rating_parts(rating: &str) -> (String, Option<String>) {
    if let Ok(re) = regex_lite::Regex::new(r"([\d.]+)/10(?:\s*\(([^)]+)\))?") {
        if let Some(caps) = re.captures(rating) {
            let number = caps
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let votes = caps.get(2).map(|m| m.as_str().to_string());
            return (number, votes);
        }
    }
    ("?".to_string(), None)
}

/// Convert "7.6/10" into a ten-character star bar.
fn stars(rating: &str) -> String {
    match leading_number(rating) {
        Some(value) => {
            let filled = (value.round() as usize).min(10);
            format!("{}{}", "★".repeat(filled), "☆".repeat(10 - filled))
        }
        None => "─── no rating ───".to_string(),
    }
}

fn leading_number(rating: &str) -> Option<f64> {
    let re = regex_lite::Regex::new(r"^([\d.]+)").ok()?;
    let caps = re.captures(rating)?;
    caps.get(1)?.as_str().parse().ok()
}

/// Word-wrap to lines of at most `width` characters.
///
/// A single word longer than the width gets its own over-long line, same
/// as any greedy wrapper. Empty text yields one empty line.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return vec![String::new()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in words {
        if !current.is_empty()
            && current.chars().count() + 1 + word.chars().count() > width
        {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else if current.is_empty() {
            current.push_str(word);
        } else {
            current.push(' ');
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use imdb_core::SeriesMetadata;

    fn sample_aggregate() -> TitleAggregate {
        let meta = SeriesMetadata {
            title_id: "tt7441658".to_string(),
            series_name: "Black Clover".to_string(),
            kind: Some("TV Series".to_string()),
            years: Some("2017-2021".to_string()),
            imdb_rating: Some("8.2/10".to_string()),
            rating_count: Some("47K".to_string()),
            popularity: Some("529".to_string()),
            tags: vec!["Anime".to_string(), "Action".to_string()],
            ..Default::default()
        };
        let mut aggregate = TitleAggregate::new(meta);
        aggregate.seasons.insert(
            1,
            vec![Episode {
                episode_code: "S1.E1".to_string(),
                title: "Asta and Yuno".to_string(),
                season: 1,
                episode: 1,
                description: "Asta and Yuno were abandoned at a church on the same day."
                    .to_string(),
                rating: "7.6/10 (1.6K)".to_string(),
                cover_image_local: Some("images/tt7441658/S1E1.jpg".to_string()),
                ..Default::default()
            }],
        );
        aggregate
    }

    #[test]
    fn test_stars_rounds_to_nearest() {
        assert_eq!(stars("7.6/10 (1.6K)"), "★★★★★★★★☆☆");
        assert_eq!(stars("7.4/10"), "★★★★★★★☆☆☆");
        assert_eq!(stars("10/10"), "★★★★★★★★★★");
        assert_eq!(stars("N/A"), "─── no rating ───");
        assert_eq!(stars(""), "─── no rating ───");
    }

    #[test]
    fn test_rating_parts_extracts_votes() {
        assert_eq!(
            rating_parts("7.6/10 (1.6K)"),
            ("7.6".to_string(), Some("1.6K".to_string()))
        );
        assert_eq!(rating_parts("8.0/10"), ("8.0".to_string(), None));
        assert_eq!(rating_parts("N/A"), ("?".to_string(), None));
    }

    #[test]
    fn test_wrap_respects_width() {
        let lines = wrap("one two three four five", 9);
        assert_eq!(lines, ["one two", "three", "four five"]);
        for line in &lines {
            assert!(line.chars().count() <= 9);
        }
    }

    #[test]
    fn test_wrap_empty_and_long_word() {
        assert_eq!(wrap("", 10), [""]);
        assert_eq!(wrap("   ", 10), [""]);
        assert_eq!(wrap("extraordinarily", 5), ["extraordinarily"]);
    }

    #[test]
    fn test_box_row_pads_to_width() {
        let row = box_row("  Black Clover");
        assert_eq!(row.chars().count(), WIDTH);
        assert!(row.starts_with("║  Black Clover"));
        assert!(row.ends_with('║'));
    }

    #[test]
    fn test_season_header_is_full_width() {
        let header = season_header(1, 51);
        assert_eq!(header.chars().count(), WIDTH);
        assert!(header.contains(" SEASON 1 "));
        assert!(header.contains(" 51 episodes "));
    }

    #[test]
    fn test_render_title_layout() {
        let report = render_title(&sample_aggregate());
        assert!(report.contains("Black Clover  ·  tt7441658"));
        assert!(report.contains("TV Series  ·  2017-2021"));
        assert!(report.contains("★  8.2/10  (47K votes)   Popularity: #529"));
        assert!(report.contains("Anime · Action"));
        assert!(report.contains("Seasons: 1   Episodes: 1"));
        assert!(report.contains(" SEASON 1 "));
        assert!(report.contains("S1.E1    Asta and Yuno"));
        assert!(report.contains("▸ images/tt7441658/S1E1.jpg"));
        assert!(report.starts_with('\n'));
        assert!(report.ends_with("┘\n\n"));
    }

    #[test]
    fn test_long_description_gets_ellipsis() {
        let mut aggregate = sample_aggregate();
        if let Some(episodes) = aggregate.seasons.get_mut(&1) {
            episodes[0].description = "word ".repeat(60).trim_end().to_string();
        }
        let report = render_title(&aggregate);
        assert!(report.contains(" …"));
        let description_rows = report
            .lines()
            .filter(|line| line.starts_with("  │   word"))
            .count();
        assert_eq!(description_rows, 2);
    }
}
