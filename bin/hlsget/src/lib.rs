use std::{num::NonZeroU32, path::PathBuf, time::Duration};

use anyhow::Context;
use reqwest::{Client, Url};
use sumire::{Session, SessionOptions};

#[derive(clap::Parser, Debug, Clone)]
pub struct HlsgetArgs {
    /// Debug output
    #[clap(short, long, alias = "debug")]
    pub verbose: bool,

    /// Workers per download/remux phase
    #[clap(long, default_value_t = sumire::DEFAULT_CONCURRENCY)]
    threads: u32,

    /// Retry limit for a single segment download
    #[clap(long, default_value_t = sumire::DEFAULT_MAX_ATTEMPTS - 1)]
    retries: u32,

    /// Retry limit for media playlist requests
    #[clap(long, default_value = "3")]
    manifest_retries: u32,

    /// Timeout seconds for each manifest/segment request
    #[clap(long, default_value = "10")]
    timeout: u64,

    /// Only fetch the rendition with this exact bitrate
    #[clap(long)]
    bitrate: Option<u64>,

    /// Fetch nothing; remux and concatenate what is already cached
    #[clap(long)]
    skip_download: bool,

    /// Keep per-bitrate segment directories after a successful merge
    #[clap(long)]
    nocleanup: bool,

    /// Directory holding the per-bitrate segment caches
    #[clap(long, env = "TEMP", default_value = ".")]
    temp_dir: PathBuf,

    /// URI to the HLS master manifest
    manifest: String,

    /// Output name; each rendition is written to <OUTPUT>-<bitrate>.mp4
    #[clap(default_value = "out")]
    output: String,
}

impl HlsgetArgs {
    fn client(&self) -> Client {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout))
            .build()
            .unwrap()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let manifest_url = Url::parse(&self.manifest)
            .with_context(|| format!("invalid manifest URI: {}", self.manifest))?;

        let concurrency = NonZeroU32::new(self.threads).context("--threads must be at least 1")?;
        let max_attempts = NonZeroU32::new(self.retries.saturating_add(1)).unwrap();
        let client = self.client();

        log::info!("Downloading HLS: {manifest_url}");
        let options = SessionOptions {
            manifest_url,
            output_name: self.output,
            download_root: self.temp_dir,
            bitrate: self.bitrate,
            cleanup: !self.nocleanup,
            skip_download: self.skip_download,
            concurrency,
            max_attempts,
            manifest_retries: self.manifest_retries,
        };

        Session::new(client, options).run().await?;
        Ok(())
    }
}
