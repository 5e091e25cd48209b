//! Season discovery parser for the IMDb episodes index page

use std::collections::BTreeSet;

use scraper::{Html, Selector};

/// Extract all available season numbers from episodes index HTML.
///
/// Three strategies, no class names, first one that finds anything wins:
/// 1. `data-testid="tab-season-entry"` tab labels
/// 2. `<select>/<option>` season picker values
/// 3. any href carrying a `?season=N` query
///
/// The result is deduplicated and ascending; an unrecognizable page
/// yields an empty vector.
pub fn parse_season_numbers(html: &str) -> Vec<u32> {
    let document = Html::parse_document(html);
    let mut found = BTreeSet::new();

    if let Ok(selector) = Selector::parse(r#"[data-testid="tab-season-entry"]"#) {
        for el in document.select(&selector) {
            let text = el.text().collect::<String>().trim().to_string();
            if let Some(n) = parse_digits(&text) {
                found.insert(n);
            }
        }
    }

    if found.is_empty() {
        if let Ok(selector) = Selector::parse("select option") {
            for el in document.select(&selector) {
                let value = el.value().attr("value").unwrap_or("").trim();
                if let Some(n) = parse_digits(value) {
                    found.insert(n);
                }
            }
        }
    }

    if found.is_empty() {
        if let (Ok(selector), Ok(re)) = (
            Selector::parse("a[href]"),
            regex_lite::Regex::new(r"\?season=(\d+)"),
        ) {
            for el in document.select(&selector) {
                let href = el.value().attr("href").unwrap_or("");
                if let Some(n) = re
                    .captures(href)
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| m.as_str().parse().ok())
                {
                    found.insert(n);
                }
            }
        }
    }

    found.into_iter().collect()
}

/// Parse a string consisting only of digits.
fn parse_digits(text: &str) -> Option<u32> {
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        return text.parse().ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_entries_deduplicated_and_sorted() {
        let html = r#"
            <a data-testid="tab-season-entry" href="?season=3">3</a>
            <a data-testid="tab-season-entry" href="?season=1">1</a>
            <a data-testid="tab-season-entry" href="?season=2">2</a>
            <a data-testid="tab-season-entry" href="?season=1">1</a>
        "#;
        assert_eq!(parse_season_numbers(html), [1, 2, 3]);
    }

    #[test]
    fn test_non_digit_tab_entries_are_ignored() {
        let html = r#"
            <a data-testid="tab-season-entry">1</a>
            <a data-testid="tab-season-entry">See all</a>
        "#;
        assert_eq!(parse_season_numbers(html), [1]);
    }

    #[test]
    fn test_select_option_fallback() {
        let html = r#"
            <select>
                <option value="2">Season 2</option>
                <option value="1">Season 1</option>
                <option value="all">All</option>
            </select>
        "#;
        assert_eq!(parse_season_numbers(html), [1, 2]);
    }

    #[test]
    fn test_href_query_fallback() {
        let html = r#"
            <a href="/title/tt1/episodes/?season=4">4</a>
            <a href="/title/tt1/episodes/?season=2&ref_=x">2</a>
            <a href="/title/tt1/">no season</a>
        "#;
        assert_eq!(parse_season_numbers(html), [2, 4]);
    }

    #[test]
    fn test_tabs_take_priority_over_options() {
        let html = r#"
            <a data-testid="tab-season-entry">1</a>
            <select><option value="1">1</option><option value="2">2</option></select>
        "#;
        assert_eq!(parse_season_numbers(html), [1]);
    }

    #[test]
    fn test_empty_page_yields_empty_vec() {
        assert!(parse_season_numbers("<html><body></body></html>").is_empty());
    }
}
