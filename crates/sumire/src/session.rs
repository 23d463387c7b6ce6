use std::{num::NonZeroU32, path::PathBuf};

use reqwest::Client;
use url::Url;

use crate::{
    download::RenditionDownloader,
    error::{SumireError, SumireResult},
    manifest,
    reconcile::reconcile,
    rendition::Rendition,
};

pub struct SessionOptions {
    /// URI of the HLS master manifest.
    pub manifest_url: Url,
    /// Every rendition is written to `<output_name>-<bandwidth>.mp4`.
    pub output_name: String,
    /// Root under which each rendition keeps its `<bandwidth>/` cache.
    pub download_root: PathBuf,
    /// When set, only the rendition with this exact bitrate is fetched;
    /// the others still load and count for reconciliation.
    pub bitrate: Option<u64>,
    /// Remove a rendition's cache directory after a successful merge.
    pub cleanup: bool,
    /// Fetch nothing; remux and concatenate whatever is already cached.
    pub skip_download: bool,
    /// Workers per download/remux phase.
    pub concurrency: NonZeroU32,
    /// Total attempts per segment download.
    pub max_attempts: NonZeroU32,
    /// Request retries for a media playlist before its variant is dropped.
    pub manifest_retries: u32,
}

/// ┌──────────────┐   reconcile   ┌──────────────┐  per rendition, in turn
/// │ master.m3u8  ├───────────────► aligned      ├────────────────────────┐
/// │  ├ 500000    │  same start,  │ segment      │                        │
/// │  └ 1000000   │  same length  │ lists        │                        │
/// └──────────────┘               └──────────────┘                        │
///                 ┌──────────────────────────────────────────────────────┘
///                 │
///          ┌──────▼──────┐       ┌─────────────┐       ┌────────────────┐
///          │  download   │       │    remux    │       │     concat     │
///          │ [task pool] ├───────► [task pool] ├───────► ffmpeg -f      │
///          │ fetch+retry │       │ ffmpeg copy │       │ concat         │
///          └─────────────┘       └─────────────┘       └────────────────┘
///
/// Renditions run one at a time; the worker pools inside each phase are
/// where the concurrency lives. Each rendition owns its cache directory,
/// so a failed rendition never disturbs the others.
pub struct Session {
    client: Client,
    options: SessionOptions,
}

impl Session {
    pub fn new(client: Client, options: SessionOptions) -> Self {
        Self { client, options }
    }

    pub async fn run(&self) -> SumireResult<()> {
        let mut renditions = self.discover().await?;
        reconcile(&mut renditions)?;
        self.write_discontinuity_file(&renditions).await?;

        let mut failed = Vec::new();
        for rendition in &renditions {
            if let Some(bitrate) = self.options.bitrate {
                if rendition.bandwidth() != bitrate {
                    log::debug!(
                        "Bitrate {} does not match the target {bitrate}, not fetching",
                        rendition.bandwidth()
                    );
                    continue;
                }
            }

            if let Err(error) = self.process(rendition).await {
                log::error!("Bitrate {}: {error}", rendition.bandwidth());
                failed.push(rendition.bandwidth());
            }
        }

        if !failed.is_empty() {
            return Err(SumireError::RenditionsFailed(failed));
        }
        Ok(())
    }

    /// Build one rendition per master-manifest variant. A variant whose
    /// playlist cannot be loaded is logged and left out; only a fully
    /// unusable manifest is fatal.
    async fn discover(&self) -> SumireResult<Vec<Rendition>> {
        let variants = manifest::load_master(&self.client, &self.options.manifest_url).await?;

        let mut renditions = Vec::with_capacity(variants.len());
        for variant in variants {
            log::info!("Building segment list from {}", variant.playlist_url);
            let playlist = match manifest::load_media(
                &self.client,
                &variant.playlist_url,
                self.options.manifest_retries,
            )
            .await
            {
                Ok(playlist) => playlist,
                Err(error) => {
                    log::warn!("Skipping variant {}: {error}", variant.playlist_url);
                    continue;
                }
            };

            match Rendition::from_playlist(variant.bitrate(), variant.playlist_url.clone(), &playlist)
            {
                Ok(rendition) => renditions.push(rendition),
                Err(error) => log::warn!("Skipping variant {}: {error}", variant.playlist_url),
            }
        }

        if renditions.is_empty() {
            return Err(SumireError::NoUsableRendition);
        }
        Ok(renditions)
    }

    async fn process(&self, rendition: &Rendition) -> SumireResult<()> {
        let downloader = RenditionDownloader::new(
            self.client.clone(),
            rendition,
            &self.options.download_root,
            self.options.concurrency,
            self.options.max_attempts,
        );

        if self.options.skip_download {
            log::info!("Bitrate {}: download skipped", rendition.bandwidth());
        } else {
            downloader.download().await?;
        }

        let mp4s = downloader.remux().await?;
        downloader.concat(&mp4s, &self.options.output_name).await?;

        if self.options.cleanup {
            downloader.cleanup().await?;
        }
        Ok(())
    }

    /// All renditions share one discontinuity timeline once reconciled, so
    /// the offsets of the first rendition stand in for every other one.
    async fn write_discontinuity_file(&self, renditions: &[Rendition]) -> SumireResult<()> {
        let Some(first) = renditions.first() else {
            return Ok(());
        };

        let offsets = first.discontinuity_offsets();
        let mut contents = String::new();
        for offset in &offsets {
            contents.push_str(&format!("{offset:.3}\n"));
        }

        let path = format!("{}-discontinuities.txt", self.options.output_name);
        tokio::fs::write(&path, contents).await?;
        log::info!("Wrote {} discontinuity offset(s) to {path}", offsets.len());
        Ok(())
    }
}
