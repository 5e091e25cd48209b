//! Episode card parser for rendered IMDb season pages
//!
//! Episode cards are discovered in three tiers and every field is
//! extracted through its own fallback cascade, so a layout change that
//! breaks one path degrades a single field instead of the whole page.

use scraper::{ElementRef, Html, Selector};

use crate::client::IMDB_BASE_URL;
use crate::types::Episode;

/// Parse all episode cards from rendered season page HTML.
///
/// A page with no recognizable cards yields an empty vector, not an
/// error; cards are returned in document order.
///
/// # Arguments
/// * `html` - Fully rendered HTML of a season page
pub fn parse_episodes(html: &str) -> Vec<Episode> {
    let document = Html::parse_document(html);
    let mut episodes = Vec::new();

    for card in find_episode_cards(&document) {
        let raw = find_title_text(&card);
        let (episode_code, title) = split_title(&raw);
        let (season, episode) = parse_episode_code(&episode_code).unwrap_or((0, 0));

        episodes.push(Episode {
            episode_code,
            title,
            season,
            episode,
            air_date: find_air_date(&card),
            description: find_description(&card),
            rating: find_rating(&card),
            cover_image: find_cover_image(&card),
            cover_image_local: None,
            imdb_url: find_episode_link(&card),
        });
    }

    episodes
}

/// Parse an episode code like "S1.E5" into season and episode numbers.
///
/// The match is anchored at the start of the text, where the code sits in
/// card titles. Returns `None` when the text does not begin with a code.
///
/// # Examples
/// ```
/// use imdb_core::parser::parse_episode_code;
///
/// assert_eq!(parse_episode_code("S1.E5"), Some((1, 5)));
/// assert_eq!(parse_episode_code("s2.e10"), Some((2, 10)));
/// assert_eq!(parse_episode_code("Episode 5"), None);
/// ```
pub fn parse_episode_code(text: &str) -> Option<(u32, u32)> {
    let re = regex_lite::Regex::new(r"(?i)^S(\d+)\.E(\d+)").ok()?;
    let caps = re.captures(text)?;
    let season: u32 = caps.get(1)?.as_str().parse().ok()?;
    let episode: u32 = caps.get(2)?.as_str().parse().ok()?;
    Some((season, episode))
}

/// Split a raw card title like "S1.E1 ∙ Asta and Yuno" into code and
/// title. Without a separator the whole text doubles as the title.
fn split_title(raw: &str) -> (String, String) {
    if let Ok(re) = regex_lite::Regex::new(r"\s*[∙·]\s*") {
        let parts: Vec<&str> = re.splitn(raw, 2).collect();
        if parts.len() == 2 {
            return (parts[0].trim().to_string(), parts[1].trim().to_string());
        }
    }
    (raw.trim().to_string(), raw.to_string())
}

/// Locate episode cards in three tiers, first non-empty tier wins:
/// 1. articles with an episode ref link and the code text,
/// 2. elements whose data-testid mentions episodes,
/// 3. any article carrying the code text.
fn find_episode_cards(document: &Html) -> Vec<ElementRef<'_>> {
    let se = match regex_lite::Regex::new(r"(?i)S\d+\.E\d+") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    if let (Ok(article_selector), Ok(link_selector)) =
        (Selector::parse("article"), Selector::parse("a[href]"))
    {
        if let Ok(ep_link) = regex_lite::Regex::new(r"/title/tt\d+/\?ref_=ttep") {
            let cards: Vec<ElementRef<'_>> = document
                .select(&article_selector)
                .filter(|article| {
                    let has_ref_link = article.select(&link_selector).any(|a| {
                        a.value()
                            .attr("href")
                            .map(|href| ep_link.is_match(href))
                            .unwrap_or(false)
                    });
                    has_ref_link && se.is_match(&article.text().collect::<String>())
                })
                .collect();
            if !cards.is_empty() {
                return cards;
            }
        }

        if let Ok(testid_selector) = Selector::parse("[data-testid]") {
            if let Ok(episode_re) = regex_lite::Regex::new(r"(?i)episode") {
                let cards: Vec<ElementRef<'_>> = document
                    .select(&testid_selector)
                    .filter(|el| {
                        let testid = el.value().attr("data-testid").unwrap_or("");
                        episode_re.is_match(testid)
                            && se.is_match(&el.text().collect::<String>())
                    })
                    .collect();
                if !cards.is_empty() {
                    return cards;
                }
            }
        }

        return document
            .select(&article_selector)
            .filter(|article| se.is_match(&article.text().collect::<String>()))
            .collect();
    }

    Vec::new()
}

/// Raw title text of a card: the slate title marker, else the first
/// compact element carrying the code, else a link aria-label.
fn find_title_text(card: &ElementRef) -> String {
    if let Ok(selector) = Selector::parse(r#"[data-testid="slate-list-card-title"]"#) {
        if let Some(node) = card.select(&selector).next() {
            return node.text().collect::<String>().trim().to_string();
        }
    }

    if let (Ok(selector), Ok(se)) = (
        Selector::parse("div, h4, h3, span"),
        regex_lite::Regex::new(r"(?i)S\d+\.E\d+"),
    ) {
        for el in card.select(&selector) {
            let text = el.text().collect::<String>().trim().to_string();
            if se.is_match(&text) && text.chars().count() < 200 {
                return text;
            }
        }
    }

    if let Ok(selector) = Selector::parse("a[aria-label]") {
        if let Some(link) = card.select(&selector).next() {
            return link.value().attr("aria-label").unwrap_or("").to_string();
        }
    }

    String::new()
}

/// Air date: a short date-shaped text, else an element whose class
/// mentions date or air (the one tolerated class heuristic).
fn find_air_date(card: &ElementRef) -> String {
    if let (Ok(selector), Ok(date)) = (
        Selector::parse("span, div, time"),
        regex_lite::Regex::new(
            r"(?i)(Mon|Tue|Wed|Thu|Fri|Sat|Sun),\s+\w+\s+\d+,\s+\d{4}|\d{1,2}\s+\w+\s+\d{4}|\d{4}-\d{2}-\d{2}",
        ),
    ) {
        for el in card.select(&selector) {
            let text = el.text().collect::<String>().trim().to_string();
            if date.is_match(&text) && text.chars().count() < 50 {
                return text;
            }
        }
    }

    if let Ok(selector) = Selector::parse("span[class], div[class]") {
        for el in card.select(&selector) {
            let class = el.value().attr("class").unwrap_or("").to_lowercase();
            if class.contains("date") || class.contains("air") {
                return el.text().collect::<String>().trim().to_string();
            }
        }
    }

    String::new()
}

/// Description: plot testid markers, else a presentation div, else the
/// longest leaf text that is neither a title line nor a date line.
fn find_description(card: &ElementRef) -> String {
    if let Ok(testid_selector) = Selector::parse("[data-testid]") {
        for fragment in ["plot", "synopsis", "description", "html-content"] {
            if let Ok(re) = regex_lite::Regex::new(&format!("(?i){fragment}")) {
                for el in card.select(&testid_selector) {
                    let testid = el.value().attr("data-testid").unwrap_or("");
                    if re.is_match(testid) {
                        return el.text().collect::<String>().trim().to_string();
                    }
                }
            }
        }
    }

    if let Ok(selector) = Selector::parse(r#"div[role="presentation"]"#) {
        for el in card.select(&selector) {
            let text = el.text().collect::<String>().trim().to_string();
            if text.chars().count() > 30 {
                return text;
            }
        }
    }

    if let (Ok(selector), Ok(se), Ok(date)) = (
        Selector::parse("div, p"),
        regex_lite::Regex::new(r"S\d+\.E\d+"),
        regex_lite::Regex::new(r"(?i)\d{4}|Mon|Tue|Wed|Thu|Fri|Sat|Sun"),
    ) {
        let mut best: Option<String> = None;
        for el in card.select(&selector) {
            if el.select(&selector).next().is_some() {
                continue;
            }
            let text = el.text().collect::<String>().trim().to_string();
            let head: String = text.chars().take(15).collect();
            if text.chars().count() > 30 && !se.is_match(&text) && !date.is_match(&head) {
                let longer = best
                    .as_ref()
                    .map(|b| text.chars().count() > b.chars().count())
                    .unwrap_or(true);
                if longer {
                    best = Some(text);
                }
            }
        }
        if let Some(text) = best {
            return text;
        }
    }

    String::new()
}

/// Display rating like "7.6/10 (1.6K)". Sources in order: the rating
/// group markers, a rating aria-label, the bare "x.y/10" text shape.
/// Unrated cards yield "N/A".
fn find_rating(card: &ElementRef) -> String {
    for testid in ["ratingGroup--imdb-rating", "ratingGroup--container"] {
        if let Ok(selector) = Selector::parse(&format!(r#"[data-testid="{testid}"]"#)) {
            if let Some(node) = card.select(&selector).next() {
                let label = node.value().attr("aria-label").unwrap_or("");
                if let Some(score) = first_number(label) {
                    let full = joined_text(&node);
                    return match parenthesized_votes(&full) {
                        Some(votes) => format!("{score}/10 ({votes})"),
                        None => format!("{score}/10"),
                    };
                }
            }
        }
    }

    if let (Ok(selector), Ok(label_re)) = (
        Selector::parse("span[aria-label]"),
        regex_lite::Regex::new(r"(?i)IMDb rating"),
    ) {
        let node = card
            .select(&selector)
            .find(|el| label_re.is_match(el.value().attr("aria-label").unwrap_or("")));
        if let Some(el) = node {
            if let Some(score) = first_number(el.value().attr("aria-label").unwrap_or("")) {
                return format!("{score}/10");
            }
        }
    }

    let full = card.text().collect::<Vec<_>>().join(" ");
    if let Ok(re) = regex_lite::Regex::new(r"\b(\d\.\d)\s*/\s*10\b") {
        if let Some(caps) = re.captures(&full) {
            if let Some(score) = caps.get(1) {
                let score = score.as_str();
                return match parenthesized_votes(&full) {
                    Some(votes) => format!("{score}/10 ({votes})"),
                    None => format!("{score}/10"),
                };
            }
        }
    }

    "N/A".to_string()
}

/// First number-like token in a string, e.g. "IMDb rating: 7.6" -> "7.6".
fn first_number(text: &str) -> Option<String> {
    let re = regex_lite::Regex::new(r"([\d.]+)").ok()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parenthesized vote count like "(1.6K)".
fn parenthesized_votes(text: &str) -> Option<String> {
    let re = regex_lite::Regex::new(r"\(\s*([\d.,KkMm]+)\s*\)").ok()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Cover image: a CDN-hosted image first, then anything that looks big
/// enough to be a still rather than an icon.
fn find_cover_image(card: &ElementRef) -> Option<String> {
    let img_selector = Selector::parse("img").ok()?;

    for img in card.select(&img_selector) {
        let srcset = img.value().attr("srcset").unwrap_or("");
        let src = img.value().attr("src").unwrap_or("");
        if srcset.contains("media-amazon.com") || src.contains("media-amazon.com") {
            return best_image(&img);
        }
    }

    for img in card.select(&img_selector) {
        let width = img
            .value()
            .attr("width")
            .and_then(|w| w.parse::<u32>().ok())
            .unwrap_or(0);
        if width >= 80 {
            return best_image(&img);
        }
        let src = img.value().attr("src").unwrap_or("");
        if !src.is_empty() && !src.ends_with(".svg") && !src.to_lowercase().contains("icon") {
            return best_image(&img);
        }
    }

    None
}

/// Pick the highest-resolution URL from a srcset attribute, falling back
/// to src. Entries without a parsable width descriptor are skipped.
fn best_image(img: &ElementRef) -> Option<String> {
    let srcset = img.value().attr("srcset").unwrap_or("").trim();
    if !srcset.is_empty() {
        let mut candidates: Vec<(u32, String)> = Vec::new();
        for entry in split_srcset(srcset) {
            if let Some((url, descriptor)) = entry.rsplit_once(|c: char| c.is_whitespace()) {
                if let Some(width) = descriptor_width(descriptor) {
                    candidates.push((width, url.trim().to_string()));
                }
            }
        }
        if let Some((_, url)) = candidates.into_iter().max() {
            return Some(url);
        }
    }
    img.value().attr("src").map(|s| s.to_string())
}

/// Split a srcset into entries without breaking CDN URLs that contain
/// embedded commas, e.g. "...CR0,0,1000,563_.jpg 1000w". A new entry
/// starts only where a comma is followed by another URL scheme.
fn split_srcset(srcset: &str) -> Vec<&str> {
    let re = match regex_lite::Regex::new(r",\s+https?://") {
        Ok(re) => re,
        Err(_) => return vec![srcset],
    };

    let mut entries = Vec::new();
    let mut start = 0;
    for m in re.find_iter(srcset) {
        entries.push(&srcset[start..m.start()]);
        let scheme_offset = srcset[m.start()..m.end()].find("http").unwrap_or(0);
        start = m.start() + scheme_offset;
    }
    entries.push(&srcset[start..]);
    entries
}

/// Width in a srcset descriptor like "1000w", digits only.
fn descriptor_width(descriptor: &str) -> Option<u32> {
    let digits: String = descriptor.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Episode page URL, preferring links with the episode ref marker.
/// Site-relative hrefs are absolutized.
fn find_episode_link(card: &ElementRef) -> String {
    if let (Ok(selector), Ok(title_re)) = (
        Selector::parse("a[href]"),
        regex_lite::Regex::new(r"/title/tt\d+/"),
    ) {
        for a in card.select(&selector) {
            let href = a.value().attr("href").unwrap_or("");
            if title_re.is_match(href) && href.contains("ref_=ttep") {
                return absolutize(href);
            }
        }
        for a in card.select(&selector) {
            let href = a.value().attr("href").unwrap_or("");
            if title_re.is_match(href) {
                return absolutize(href);
            }
        }
    }
    String::new()
}

/// Prefix site-relative hrefs with the IMDb origin.
fn absolutize(href: &str) -> String {
    if href.starts_with('/') {
        format!("{IMDB_BASE_URL}{href}")
    } else {
        href.to_string()
    }
}

/// Join the stripped text nodes of an element with single spaces.
fn joined_text(element: &ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
