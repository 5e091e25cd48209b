//! Concurrent cover image downloads
//!
//! Episodes keep their CDN cover URL either way; this stage additionally
//! saves the files under `<images_dir>/<title_id>/S<season>E<episode><ext>`
//! and records that path in `cover_image_local`. The path is written before
//! the download is attempted: the path records intent, the file's existence
//! records success, and a re-run skips files that are already there.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tokio::fs;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::client::ImdbClient;
use crate::types::TitleAggregate;

/// Map a CDN URL to a safe file extension.
///
/// Anything outside the usual image extensions becomes `.jpg`.
fn extension_for(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or(path);
    match name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") => ".jpg",
        Some("jpeg") => ".jpeg",
        Some("png") => ".png",
        Some("webp") => ".webp",
        Some("gif") => ".gif",
        _ => ".jpg",
    }
}

/// Download every episode cover image referenced by the aggregate.
///
/// `cover_image_local` is updated for every episode that has a cover URL.
/// Jobs run concurrently under `pool_size` permits; individual failures are
/// logged and skipped. Returns how many files exist after the run.
///
/// # Arguments
/// * `client` - HTTP client used for the image fetches
/// * `aggregate` - Scraped title whose episodes get local paths
/// * `images_dir` - Directory that receives a `<title_id>/` subdirectory
/// * `pool_size` - Maximum concurrent downloads
pub async fn download_images(
    client: &ImdbClient,
    aggregate: &mut TitleAggregate,
    images_dir: &Path,
    pool_size: usize,
) -> usize {
    let base = images_dir.join(&aggregate.meta.title_id);
    let mut jobs: Vec<(String, PathBuf)> = Vec::new();

    for episodes in aggregate.seasons.values_mut() {
        for episode in episodes.iter_mut() {
            let Some(url) = episode.cover_image.clone() else {
                episode.cover_image_local = None;
                continue;
            };
            let filename = format!(
                "S{}E{}{}",
                episode.season,
                episode.episode,
                extension_for(&url)
            );
            let dest = base.join(filename);
            episode.cover_image_local = Some(dest.to_string_lossy().into_owned());
            jobs.push((url, dest));
        }
    }

    if jobs.is_empty() {
        info!("no cover image URLs to download");
        return 0;
    }

    let total = jobs.len();
    info!("downloading {} cover image(s) to {}", total, base.display());

    let semaphore = Arc::new(Semaphore::new(pool_size.max(1)));
    let downloads = jobs.into_iter().map(|(url, dest)| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => return false,
            };
            download_one(client, &url, &dest).await
        }
    });
    let results = join_all(downloads).await;

    let saved = results.into_iter().filter(|ok| *ok).count();
    info!("{}/{} cover images saved", saved, total);
    saved
}

/// Fetch one image to disk. Already-present files count as saved.
async fn download_one(client: &ImdbClient, url: &str, dest: &Path) -> bool {
    if dest.exists() {
        debug!("{} already downloaded", dest.display());
        return true;
    }

    let Some(bytes) = client.fetch_bytes(url).await else {
        warn!("cover image {} could not be fetched", url);
        return false;
    };

    if let Some(parent) = dest.parent() {
        if let Err(e) = fs::create_dir_all(parent).await {
            warn!("creating {} failed: {}", parent.display(), e);
            return false;
        }
    }
    match fs::write(dest, &bytes).await {
        Ok(()) => {
            debug!("saved {} ({} bytes)", dest.display(), bytes.len());
            true
        }
        Err(e) => {
            warn!("writing {} failed: {}", dest.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::{ClientConfig, ImdbClient};
    use crate::types::{Episode, SeriesMetadata};

    fn fast_client() -> ImdbClient {
        ImdbClient::with_config(ClientConfig {
            backoff_ms: 1,
            ..ClientConfig::default()
        })
        .unwrap()
    }

    fn aggregate_with(episodes: Vec<Episode>) -> TitleAggregate {
        let mut aggregate = TitleAggregate::new(SeriesMetadata {
            title_id: "tt0000001".to_string(),
            series_name: "Test Series".to_string(),
            ..SeriesMetadata::default()
        });
        aggregate.seasons.insert(1, episodes);
        aggregate
    }

    fn episode(season: u32, number: u32, cover: Option<String>) -> Episode {
        Episode {
            episode_code: format!("S{season}.E{number}"),
            season,
            episode: number,
            cover_image: cover,
            ..Episode::default()
        }
    }

    fn temp_images_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("imdb_images_{}_{}", tag, std::process::id()))
    }

    #[test]
    fn test_extension_for_known_and_unknown() {
        assert_eq!(extension_for("https://cdn/img/a.jpg"), ".jpg");
        assert_eq!(extension_for("https://cdn/img/a.JPEG"), ".jpeg");
        assert_eq!(extension_for("https://cdn/img/a.png?x=1"), ".png");
        assert_eq!(extension_for("https://cdn/img/a.webp#frag"), ".webp");
        assert_eq!(extension_for("https://cdn/img/a.gif"), ".gif");
        assert_eq!(extension_for("https://cdn/img/a.svg"), ".jpg");
        assert_eq!(extension_for("https://cdn/img/noext"), ".jpg");
    }

    #[tokio::test]
    async fn test_downloads_name_files_by_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/covers/one.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
            .mount(&server)
            .await;

        let dir = temp_images_dir("naming");
        let mut aggregate = aggregate_with(vec![episode(
            1,
            5,
            Some(format!("{}/covers/one.png", server.uri())),
        )]);

        let saved = download_images(&fast_client(), &mut aggregate, &dir, 2).await;

        let expected = dir.join("tt0000001").join("S1E5.png");
        assert_eq!(saved, 1);
        assert!(expected.exists());
        assert_eq!(
            aggregate.seasons[&1][0].cover_image_local.as_deref(),
            Some(expected.to_string_lossy().as_ref())
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_existing_file_is_not_refetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/covers/two.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9]))
            .expect(0)
            .mount(&server)
            .await;

        let dir = temp_images_dir("resume");
        let dest = dir.join("tt0000001").join("S1E1.jpg");
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(&dest, b"already here").unwrap();

        let mut aggregate = aggregate_with(vec![episode(
            1,
            1,
            Some(format!("{}/covers/two.jpg", server.uri())),
        )]);

        let saved = download_images(&fast_client(), &mut aggregate, &dir, 2).await;

        assert_eq!(saved, 1);
        assert_eq!(std::fs::read(&dest).unwrap(), b"already here");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_failures_are_skipped_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/covers/broken.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/covers/fine.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7]))
            .mount(&server)
            .await;

        let dir = temp_images_dir("partial");
        let mut aggregate = aggregate_with(vec![
            episode(1, 1, Some(format!("{}/covers/broken.jpg", server.uri()))),
            episode(1, 2, Some(format!("{}/covers/fine.jpg", server.uri()))),
            episode(1, 3, None),
        ]);

        let saved = download_images(&fast_client(), &mut aggregate, &dir, 2).await;

        assert_eq!(saved, 1);
        // Local paths record intent for both attempted episodes.
        assert!(aggregate.seasons[&1][0].cover_image_local.is_some());
        assert!(aggregate.seasons[&1][1].cover_image_local.is_some());
        assert!(aggregate.seasons[&1][2].cover_image_local.is_none());
        assert!(!dir.join("tt0000001").join("S1E1.jpg").exists());
        assert!(dir.join("tt0000001").join("S1E2.jpg").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_no_urls_is_a_noop() {
        let dir = temp_images_dir("empty");
        let mut aggregate = aggregate_with(vec![episode(1, 1, None)]);

        let saved = download_images(&fast_client(), &mut aggregate, &dir, 2).await;

        assert_eq!(saved, 0);
        assert!(!dir.exists());
    }
}
