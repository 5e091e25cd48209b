//! Series metadata parser for IMDb title pages
//!
//! Extracts the hero-section fields: series name, kind, years, content
//! rating, episode duration, aggregate rating, vote count, popularity and
//! interest tags. Every selector keys on data-testid markers, href
//! patterns or text shape, never on CSS class names.

use scraper::{ElementRef, Html, Selector};

use crate::types::SeriesMetadata;

/// Parse series metadata from title page HTML.
///
/// Never fails: fields that cannot be located stay `None` and the series
/// name falls back to the title ID itself.
///
/// # Arguments
/// * `html` - Raw HTML content of the title page
/// * `title_id` - The IMDb title ID (used in the result and as name fallback)
pub fn parse_series_metadata(html: &str, title_id: &str) -> SeriesMetadata {
    let document = Html::parse_document(html);

    let mut meta = SeriesMetadata {
        title_id: title_id.to_string(),
        series_name: title_id.to_string(),
        ..Default::default()
    };

    if let Some(name) = extract_series_name(&document) {
        meta.series_name = name;
    }

    classify_hero_list(&document, &mut meta);

    if let Ok(selector) = Selector::parse(r#"[data-testid="hero-rating-bar__aggregate-rating"]"#) {
        if let Some(agg) = document.select(&selector).next() {
            meta.imdb_rating = extract_rating_score(&agg);
            meta.rating_count = extract_vote_count(&agg);
        }
    }

    if let Ok(selector) = Selector::parse(r#"[data-testid="hero-rating-bar__popularity__score"]"#) {
        if let Some(el) = document.select(&selector).next() {
            let text = el.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                meta.popularity = Some(text);
            }
        }
    }

    meta.tags = extract_tags(&document);

    meta
}

/// Extract the series name from the hero heading, with document-title and
/// og:title fallbacks. Each fallback is only consulted when the previous
/// source is absent entirely, not merely empty.
fn extract_series_name(document: &Html) -> Option<String> {
    if let Ok(selector) = Selector::parse(r#"[data-testid="hero__pageTitle"]"#) {
        if let Some(el) = document.select(&selector).next() {
            let text = el.text().collect::<String>().trim().to_string();
            if text.is_empty() {
                return None;
            }
            return Some(text);
        }
    }

    if let Ok(selector) = Selector::parse("title") {
        if let Some(el) = document.select(&selector).next() {
            let cleaned = strip_title_suffix(&el.text().collect::<String>());
            if cleaned.is_empty() {
                return None;
            }
            return Some(cleaned);
        }
    }

    if let Ok(selector) = Selector::parse(r#"meta[property="og:title"]"#) {
        if let Some(el) = document.select(&selector).next() {
            let content = el.value().attr("content").unwrap_or("").trim().to_string();
            if !content.is_empty() {
                return Some(content);
            }
        }
    }

    None
}

/// Remove the site suffix and a trailing "(YYYY...)" qualifier from a
/// document title like "Black Clover (TV Series 2017–2021) - IMDb".
fn strip_title_suffix(text: &str) -> String {
    let mut cleaned = text.trim().to_string();
    if let Ok(re) = regex_lite::Regex::new(r"(?i)\s*-\s*IMDb\s*$") {
        cleaned = re.replace(&cleaned, "").to_string();
    }
    if let Ok(re) = regex_lite::Regex::new(r"\s*\(\d{4}.*?\)\s*$") {
        cleaned = re.replace(&cleaned, "").to_string();
    }
    cleaned.trim().to_string()
}

/// Classify the inline hero list items into kind, years, content rating
/// and episode duration. Content rating is checked first because "TV-PG"
/// would otherwise match the kind pattern.
fn classify_hero_list(document: &Html, meta: &mut SeriesMetadata) {
    let hero_selector = match Selector::parse(r#"[data-testid="hero__pageTitle"]"#) {
        Ok(s) => s,
        Err(_) => return,
    };
    let ul_selector = match Selector::parse("ul") {
        Ok(s) => s,
        Err(_) => return,
    };
    let li_selector = match Selector::parse("li") {
        Ok(s) => s,
        Err(_) => return,
    };

    let hero = match document.select(&hero_selector).next() {
        Some(el) => el,
        None => return,
    };
    let parent = match hero.parent().and_then(ElementRef::wrap) {
        Some(el) => el,
        None => return,
    };
    let list = match parent.select(&ul_selector).next() {
        Some(el) => el,
        None => return,
    };

    for li in list.select(&li_selector) {
        let item = li.text().collect::<String>().trim().to_string();
        if matches_pattern(&item, r"(?i)^(TV-(G|PG|14|MA)|(G|PG|PG-13|R|NC-17)$)") {
            meta.content_rating = Some(item);
        } else if matches_pattern(&item, r"(?i)^(TV\s|Movie|Short|Special|Mini)") {
            meta.kind = Some(item);
        } else if matches_pattern(&item, r"^\d{4}") {
            meta.years = Some(item);
        } else if matches_pattern(&item, r"\d+\s*(h|m)") {
            meta.episode_duration = Some(item);
        }
    }
}

/// Whether the text matches the given pattern.
fn matches_pattern(text: &str, pattern: &str) -> bool {
    regex_lite::Regex::new(pattern)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

/// Extract the aggregate score as "8.2/10" from the rating block.
fn extract_rating_score(agg: &ElementRef) -> Option<String> {
    let score_selector =
        Selector::parse(r#"[data-testid="hero-rating-bar__aggregate-rating__score"]"#).ok()?;
    let span_selector = Selector::parse("span").ok()?;

    let score = agg.select(&score_selector).next()?;
    let first = score.select(&span_selector).next()?;
    let text = first.text().collect::<String>().trim().to_string();
    if text.is_empty() {
        return None;
    }
    Some(format!("{text}/10"))
}

/// Extract the vote count from the rating block text.
///
/// The vote count follows the LAST "/10" occurrence; the first "/10" is
/// the score span itself, followed by a repeat of the rating number.
fn extract_vote_count(agg: &ElementRef) -> Option<String> {
    let re = regex_lite::Regex::new(r"/\s*10\s+([\d.,KkMm]+)").ok()?;
    let text = joined_text(agg);
    re.captures_iter(&text)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Interest tags via the /interest/ href pattern, deduplicated in
/// document order. The href shape is far more stable than any class name.
fn extract_tags(document: &Html) -> Vec<String> {
    let mut tags = Vec::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        if let Ok(re) = regex_lite::Regex::new(r"^/interest/in\d+") {
            for el in document.select(&selector) {
                let href = el.value().attr("href").unwrap_or("");
                if !re.is_match(href) {
                    continue;
                }
                let text = el.text().collect::<String>().trim().to_string();
                if !text.is_empty() && !tags.contains(&text) {
                    tags.push(text);
                }
            }
        }
    }

    tags
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
