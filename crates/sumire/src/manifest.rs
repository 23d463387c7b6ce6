use m3u8_rs::{MediaPlaylist, Playlist};
use reqwest::Client;
use url::Url;

use crate::error::{SumireError, SumireResult};

/// One variant entry of a master manifest.
#[derive(Debug, Clone)]
pub struct Variant {
    pub playlist_url: Url,
    pub average_bandwidth: Option<u64>,
    pub bandwidth: u64,
}

impl Variant {
    /// Bitrate identity used for directory naming and filtering: the
    /// average bandwidth when declared, the peak bandwidth otherwise.
    pub fn bitrate(&self) -> u64 {
        self.average_bandwidth.unwrap_or(self.bandwidth)
    }
}

/// Load a master manifest and return its variant descriptors.
///
/// Media playlist input is rejected; this tool only operates on
/// multi-variant streams.
pub async fn load_master(client: &Client, url: &Url) -> SumireResult<Vec<Variant>> {
    log::info!("Fetching master manifest {url}");

    let response = client.get(url.clone()).send().await?;
    if !response.status().is_success() {
        return Err(SumireError::HttpError(response.status()));
    }
    let bytes = response.bytes().await?;

    parse_master(url, &bytes)
}

fn parse_master(url: &Url, bytes: &[u8]) -> SumireResult<Vec<Variant>> {
    match m3u8_rs::parse_playlist_res(bytes) {
        Ok(Playlist::MasterPlaylist(master)) => {
            let mut variants = Vec::with_capacity(master.variants.len());
            for variant in master.variants.iter().filter(|v| !v.is_i_frame) {
                let playlist_url = url.join(&variant.uri)?;
                if variant.average_bandwidth.is_none() {
                    log::warn!(
                        "Variant {} declares no average bandwidth, using peak bandwidth {}",
                        variant.uri,
                        variant.bandwidth
                    );
                }
                variants.push(Variant {
                    playlist_url,
                    average_bandwidth: variant.average_bandwidth,
                    bandwidth: variant.bandwidth,
                });
            }
            Ok(variants)
        }
        Ok(Playlist::MediaPlaylist(_)) => Err(SumireError::NotMasterManifest(url.to_string())),
        Err(_) => Err(SumireError::ManifestParseError(url.to_string())),
    }
}

/// Load a variant's media playlist, retrying the request a bounded number
/// of times before giving up.
pub async fn load_media(
    client: &Client,
    url: &Url,
    total_retry: u32,
) -> SumireResult<MediaPlaylist> {
    let mut retry = total_retry;
    loop {
        if retry == 0 {
            return Err(SumireError::ManifestFetchError(url.to_string()));
        }

        match client.get(url.clone()).send().await {
            Ok(response) => match response.bytes().await {
                Ok(bytes) => match m3u8_rs::parse_media_playlist_res(&bytes) {
                    Ok(playlist) => return Ok(playlist),
                    Err(_) => {
                        log::warn!("Failed to parse media playlist {url}");
                        retry -= 1;
                    }
                },
                Err(error) => {
                    log::warn!("Failed to fetch media playlist {url}: {error}");
                    retry -= 1;
                }
            },
            Err(error) => {
                log::warn!("Failed to fetch media playlist {url}: {error}");
                retry -= 1;
            }
        }
    }
}
