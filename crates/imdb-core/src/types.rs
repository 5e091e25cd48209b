//! Data types for the IMDb scraper
//!
//! This module contains all the core data structures used throughout the
//! library. All types implement Serialize and Deserialize; an assembled
//! [`TitleAggregate`] round-trips through the JSON files written by
//! [`TitleAggregate::save`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

fn default_rating() -> String {
    "N/A".to_string()
}

/// A single episode extracted from a rendered season page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Raw episode marker as displayed, e.g. "S1.E1"
    #[serde(default)]
    pub episode_code: String,
    /// Display title of the episode
    #[serde(default)]
    pub title: String,
    /// Season number parsed from the code, 0 when unparsed
    #[serde(default)]
    pub season: u32,
    /// Episode number parsed from the code, 0 when unparsed
    #[serde(default)]
    pub episode: u32,
    /// Air date exactly as displayed, empty when unknown
    #[serde(default)]
    pub air_date: String,
    /// Plot description, empty when unknown
    #[serde(default)]
    pub description: String,
    /// Display rating, e.g. "7.6/10 (1.6K)", "N/A" when unrated
    #[serde(default = "default_rating")]
    pub rating: String,
    /// Best cover image URL from the episode card
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Local path of the downloaded cover, set by the image stage
    #[serde(default)]
    pub cover_image_local: Option<String>,
    /// Absolute URL of the episode page, empty when missing
    #[serde(default)]
    pub imdb_url: String,
}

impl Default for Episode {
    fn default() -> Self {
        Self {
            episode_code: String::new(),
            title: String::new(),
            season: 0,
            episode: 0,
            air_date: String::new(),
            description: String::new(),
            rating: default_rating(),
            cover_image: None,
            cover_image_local: None,
            imdb_url: String::new(),
        }
    }
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} · {}  [{}]", self.episode_code, self.title, self.rating)
    }
}

/// Series-level metadata parsed from the title page hero section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesMetadata {
    /// IMDb title identifier, e.g. "tt7441658"
    #[serde(default)]
    pub title_id: String,
    /// Display name of the series, falls back to the title ID
    #[serde(default)]
    pub series_name: String,
    /// Title kind, e.g. "TV Series"
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Year or year range, e.g. "2017-2021"
    #[serde(default)]
    pub years: Option<String>,
    /// Content rating, e.g. "TV-PG"
    #[serde(default)]
    pub content_rating: Option<String>,
    /// Typical episode duration, e.g. "24m"
    #[serde(default)]
    pub episode_duration: Option<String>,
    /// Aggregate rating in display form, e.g. "8.2/10"
    #[serde(default)]
    pub imdb_rating: Option<String>,
    /// Vote count in display form, e.g. "47K"
    #[serde(default)]
    pub rating_count: Option<String>,
    /// Popularity rank as displayed
    #[serde(default)]
    pub popularity: Option<String>,
    /// Interest tags in document order, deduplicated
    #[serde(default)]
    pub tags: Vec<String>,
}

impl fmt::Display for SeriesMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec![self.series_name.clone()];
        if let Some(years) = &self.years {
            parts.push(years.clone());
        }
        if let Some(kind) = &self.kind {
            parts.push(kind.clone());
        }
        if let Some(rating) = &self.imdb_rating {
            let votes = self
                .rating_count
                .as_ref()
                .map(|count| format!(" ({count})"))
                .unwrap_or_default();
            parts.push(format!("★ {rating}{votes}"));
        }
        write!(f, "{}", parts.join("  ·  "))
    }
}

/// Complete scrape result: series metadata plus episodes keyed by season
///
/// Season keys iterate in ascending order and serialize as stringified
/// JSON object keys, so a saved aggregate loads back identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleAggregate {
    #[serde(flatten)]
    pub meta: SeriesMetadata,
    #[serde(default)]
    pub seasons: BTreeMap<u32, Vec<Episode>>,
}

impl TitleAggregate {
    /// Create an aggregate with no seasons yet
    pub fn new(meta: SeriesMetadata) -> Self {
        Self {
            meta,
            seasons: BTreeMap::new(),
        }
    }

    /// All episodes flattened in ascending season order
    pub fn all_episodes(&self) -> Vec<&Episode> {
        self.seasons.values().flatten().collect()
    }

    /// Look up one episode by season and episode number
    pub fn get_episode(&self, season: u32, episode: u32) -> Option<&Episode> {
        self.seasons
            .get(&season)?
            .iter()
            .find(|ep| ep.episode == episode)
    }

    /// Total number of episodes across all seasons
    pub fn episode_count(&self) -> usize {
        self.seasons.values().map(Vec::len).sum()
    }

    /// Number of seasons present in the aggregate
    pub fn season_count(&self) -> usize {
        self.seasons.len()
    }

    /// Write the aggregate as pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or the filesystem write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(path.to_path_buf())
    }

    /// Read an aggregate back from a JSON file written by [`save`]
    ///
    /// Missing optional episode fields are filled with their defaults,
    /// so files from older runs keep loading.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or the JSON does not
    /// describe an aggregate.
    ///
    /// [`save`]: TitleAggregate::save
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let aggregate = serde_json::from_str(&json)?;
        Ok(aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_episode(season: u32, episode: u32) -> Episode {
        Episode {
            episode_code: format!("S{season}.E{episode}"),
            title: format!("Episode {episode}"),
            season,
            episode,
            air_date: "Tue, Oct 3, 2017".to_string(),
            description: "A young orphan refuses to give up.".to_string(),
            rating: "7.6/10 (1.6K)".to_string(),
            cover_image: Some("https://m.media-amazon.com/images/M/ep.jpg".to_string()),
            cover_image_local: None,
            imdb_url: "https://www.imdb.com/title/tt7441658/".to_string(),
        }
    }

    fn sample_aggregate() -> TitleAggregate {
        let meta = SeriesMetadata {
            title_id: "tt7441658".to_string(),
            series_name: "Black Clover".to_string(),
            kind: Some("TV Series".to_string()),
            years: Some("2017-2021".to_string()),
            content_rating: Some("TV-PG".to_string()),
            episode_duration: Some("24m".to_string()),
            imdb_rating: Some("8.2/10".to_string()),
            rating_count: Some("47K".to_string()),
            popularity: Some("529".to_string()),
            tags: vec!["Anime".to_string(), "Action".to_string()],
        };
        let mut aggregate = TitleAggregate::new(meta);
        aggregate
            .seasons
            .insert(2, vec![sample_episode(2, 1), sample_episode(2, 2)]);
        aggregate.seasons.insert(
            1,
            vec![
                sample_episode(1, 1),
                sample_episode(1, 2),
                sample_episode(1, 3),
            ],
        );
        aggregate
    }

    #[test]
    fn test_episode_defaults() {
        let episode = Episode::default();
        assert_eq!(episode.episode_code, "");
        assert_eq!(episode.title, "");
        assert_eq!(episode.season, 0);
        assert_eq!(episode.episode, 0);
        assert_eq!(episode.air_date, "");
        assert_eq!(episode.description, "");
        assert_eq!(episode.rating, "N/A");
        assert_eq!(episode.cover_image, None);
        assert_eq!(episode.cover_image_local, None);
        assert_eq!(episode.imdb_url, "");
    }

    #[test]
    fn test_episode_display() {
        let episode = sample_episode(1, 1);
        let display = episode.to_string();
        assert!(display.contains("S1.E1"));
        assert!(display.contains("Episode 1"));
        assert!(display.contains("7.6/10 (1.6K)"));
    }

    #[test]
    fn test_episode_serde_round_trip() {
        let episode = sample_episode(1, 2);
        let json = serde_json::to_string(&episode).unwrap();
        let back: Episode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, episode);
    }

    #[test]
    fn test_episode_missing_fields_get_defaults() {
        let back: Episode = serde_json::from_str(r#"{"episode_code": "S1.E1"}"#).unwrap();
        assert_eq!(back.episode_code, "S1.E1");
        assert_eq!(back.title, "");
        assert_eq!(back.rating, "N/A");
        assert_eq!(back.cover_image, None);
        assert_eq!(back.imdb_url, "");
    }

    #[test]
    fn test_metadata_kind_serializes_as_type() {
        let meta = SeriesMetadata {
            title_id: "tt1".to_string(),
            series_name: "Test".to_string(),
            kind: Some("TV Series".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"type\":\"TV Series\""));
        assert!(!json.contains("\"kind\""));
    }

    #[test]
    fn test_metadata_display_skips_missing_fields() {
        let full = SeriesMetadata {
            title_id: "tt7441658".to_string(),
            series_name: "Black Clover".to_string(),
            kind: Some("TV Series".to_string()),
            years: Some("2017-2021".to_string()),
            imdb_rating: Some("8.2/10".to_string()),
            rating_count: Some("47K".to_string()),
            ..Default::default()
        };
        assert_eq!(
            full.to_string(),
            "Black Clover  ·  2017-2021  ·  TV Series  ·  ★ 8.2/10 (47K)"
        );

        let bare = SeriesMetadata {
            title_id: "tt1".to_string(),
            series_name: "tt1".to_string(),
            ..Default::default()
        };
        assert_eq!(bare.to_string(), "tt1");
    }

    #[test]
    fn test_metadata_unicode_round_trip() {
        let meta = SeriesMetadata {
            title_id: "tt7441658".to_string(),
            series_name: "ブラッククローバー".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&meta).unwrap();
        let back: SeriesMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back.series_name, "ブラッククローバー");
    }

    #[test]
    fn test_aggregate_all_episodes_in_season_order() {
        let aggregate = sample_aggregate();
        let codes: Vec<&str> = aggregate
            .all_episodes()
            .iter()
            .map(|ep| ep.episode_code.as_str())
            .collect();
        assert_eq!(codes, ["S1.E1", "S1.E2", "S1.E3", "S2.E1", "S2.E2"]);
    }

    #[test]
    fn test_aggregate_get_episode() {
        let aggregate = sample_aggregate();
        let found = aggregate.get_episode(1, 2).unwrap();
        assert_eq!(found.episode_code, "S1.E2");
        assert!(aggregate.get_episode(99, 1).is_none());
        assert!(aggregate.get_episode(1, 99).is_none());
    }

    #[test]
    fn test_aggregate_counts() {
        let aggregate = sample_aggregate();
        assert_eq!(aggregate.season_count(), 2);
        assert_eq!(aggregate.episode_count(), 5);
    }

    #[test]
    fn test_aggregate_season_zero_allowed() {
        let mut aggregate = sample_aggregate();
        let mut special = sample_episode(0, 1);
        special.episode_code = "S0.E1".to_string();
        aggregate.seasons.insert(0, vec![special]);
        assert_eq!(aggregate.get_episode(0, 1).unwrap().episode_code, "S0.E1");
        assert_eq!(aggregate.all_episodes()[0].episode_code, "S0.E1");
    }

    #[test]
    fn test_aggregate_flattens_meta_and_stringifies_season_keys() {
        let aggregate = sample_aggregate();
        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&aggregate).unwrap()).unwrap();
        assert_eq!(value["title_id"], "tt7441658");
        assert_eq!(value["type"], "TV Series");
        assert!(value.get("meta").is_none());
        let seasons = value["seasons"].as_object().unwrap();
        assert!(seasons.contains_key("1"));
        assert!(seasons.contains_key("2"));
        assert_eq!(seasons["1"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_aggregate_save_load_round_trip() {
        let aggregate = sample_aggregate();
        let path = std::env::temp_dir().join(format!(
            "imdb_core_round_trip_{}.json",
            std::process::id()
        ));
        let written = aggregate.save(&path).unwrap();
        assert_eq!(written, path);
        let back = TitleAggregate::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(back, aggregate);
        assert_eq!(back.seasons.keys().copied().collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn test_aggregate_load_missing_file_is_error() {
        let path = std::env::temp_dir().join("imdb_core_definitely_missing.json");
        assert!(TitleAggregate::load(&path).is_err());
    }
}
