use std::{
    collections::HashSet,
    num::NonZeroU32,
    path::{Path, PathBuf},
    sync::Arc,
};

use reqwest::Client;
use url::Url;

use crate::{
    error::{SumireError, SumireResult},
    fetch,
    pool::{self, PoolTask},
    remux,
    rendition::Rendition,
};

/// Drives one reconciled rendition through its download, remux and
/// concatenation phases, in that order.
pub struct RenditionDownloader<'a> {
    client: Client,
    rendition: &'a Rendition,
    dir: PathBuf,
    concurrency: NonZeroU32,
    max_attempts: NonZeroU32,
}

struct FetchTask {
    client: Client,
    url: Url,
    file_name: String,
    path: PathBuf,
}

impl PoolTask for FetchTask {
    fn name(&self) -> String {
        self.file_name.clone()
    }

    async fn run(self: Arc<Self>) -> SumireResult<()> {
        fetch::fetch_to_file(&self.client, self.url.clone(), &self.path).await
    }
}

struct RemuxTask {
    file_name: String,
    input: PathBuf,
    output: PathBuf,
}

impl PoolTask for RemuxTask {
    fn name(&self) -> String {
        self.file_name.clone()
    }

    async fn run(self: Arc<Self>) -> SumireResult<()> {
        remux::remux_segment(&self.input, &self.output).await
    }
}

/// Remux input/output pair for one segment, in ordinal order.
struct RemuxTarget {
    file_name: String,
    input: PathBuf,
    output: PathBuf,
}

impl<'a> RenditionDownloader<'a> {
    pub fn new(
        client: Client,
        rendition: &'a Rendition,
        root: &Path,
        concurrency: NonZeroU32,
        max_attempts: NonZeroU32,
    ) -> Self {
        Self {
            client,
            dir: rendition.directory(root),
            rendition,
            concurrency,
            max_attempts,
        }
    }

    /// Fetch every segment that is not already cached on disk.
    ///
    /// Any segment that exhausts its attempts fails the whole rendition;
    /// the error is raised only after the pool has drained.
    pub async fn download(&self) -> SumireResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut tasks = Vec::new();
        for segment in self.rendition.segments() {
            let path = self.dir.join(&segment.file_name);
            if path.is_file() {
                log::debug!("{} already exists, skipping", path.display());
                continue;
            }
            tasks.push(Arc::new(FetchTask {
                client: self.client.clone(),
                url: segment.url.clone(),
                file_name: segment.file_name.clone(),
                path,
            }));
        }

        if tasks.is_empty() {
            log::info!(
                "Bitrate {}: all segments already cached",
                self.rendition.bandwidth()
            );
            return Ok(());
        }

        log::info!(
            "Bitrate {}: downloading {} segment(s) with {} worker(s)",
            self.rendition.bandwidth(),
            tasks.len(),
            self.concurrency
        );
        let reports = pool::run(tasks, self.concurrency, self.max_attempts).await;

        let failed = reports.iter().filter(|report| report.failed()).count();
        if failed > 0 {
            return Err(SumireError::SegmentsFailed {
                bandwidth: self.rendition.bandwidth(),
                count: failed,
            });
        }
        Ok(())
    }

    /// Remux every downloaded segment into an MP4 container.
    ///
    /// Remux failures are reported and the remaining segments proceed;
    /// the returned paths are in ordinal order and only cover segments
    /// whose remuxed output exists.
    pub async fn remux(&self) -> SumireResult<Vec<PathBuf>> {
        let targets = self.remux_targets();

        let mut tasks = Vec::new();
        for target in &targets {
            if target.output.is_file() {
                log::debug!("{} already exists, skipping", target.output.display());
                continue;
            }
            tasks.push(Arc::new(RemuxTask {
                file_name: target.file_name.clone(),
                input: target.input.clone(),
                output: target.output.clone(),
            }));
        }

        if !tasks.is_empty() {
            log::info!(
                "Bitrate {}: remuxing {} segment(s) with {} worker(s)",
                self.rendition.bandwidth(),
                tasks.len(),
                self.concurrency
            );
        }
        // External tool failures are not worth repeating; one attempt each.
        let reports = pool::run(tasks, self.concurrency, NonZeroU32::MIN).await;

        let failed: HashSet<String> = reports
            .iter()
            .filter(|report| report.failed())
            .map(|report| report.name.clone())
            .collect();
        if !failed.is_empty() {
            log::error!(
                "Bitrate {}: {} segment(s) failed to remux and are left out",
                self.rendition.bandwidth(),
                failed.len()
            );
        }

        Ok(targets
            .into_iter()
            .filter(|target| !failed.contains(&target.file_name))
            .map(|target| target.output)
            .collect())
    }

    /// Concatenate the remuxed segments into `<output_name>-<bandwidth>.mp4`,
    /// unless that file already exists.
    pub async fn concat(&self, mp4s: &[PathBuf], output_name: &str) -> SumireResult<PathBuf> {
        let output = PathBuf::from(format!(
            "{output_name}-{}.mp4",
            self.rendition.bandwidth()
        ));
        if output.is_file() {
            log::info!("{} already exists, skipping concatenation", output.display());
            return Ok(output);
        }

        log::info!(
            "Bitrate {}: concatenating {} segment(s) into {}",
            self.rendition.bandwidth(),
            mp4s.len(),
            output.display()
        );
        remux::concat_segments(mp4s, &output).await?;
        Ok(output)
    }

    /// Remove this rendition's segment directory.
    pub async fn cleanup(&self) -> SumireResult<()> {
        if self.dir.exists() {
            log::debug!("Removing {}", self.dir.display());
            tokio::fs::remove_dir_all(&self.dir).await?;
        }
        Ok(())
    }

    /// Remux pairs in ordinal order. Downloads complete in arbitrary order,
    /// so the order is rebuilt from segment ordinals rather than taken from
    /// any completion bookkeeping.
    fn remux_targets(&self) -> Vec<RemuxTarget> {
        let mut segments: Vec<_> = self.rendition.segments().iter().collect();
        segments.sort_by_key(|segment| segment.sequence);

        segments
            .into_iter()
            .map(|segment| RemuxTarget {
                file_name: segment.file_name.clone(),
                input: self.dir.join(&segment.file_name),
                output: self.dir.join(format!("{}.mp4", segment.file_name)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Segment;

    #[test]
    fn test_remux_targets_are_ordinal_ordered() {
        let base = Url::parse("http://example.com/hls/").unwrap();
        // Stored out of order, as if rebuilt from completion records.
        let segments = [2u64, 0, 1]
            .iter()
            .map(|&sequence| Segment {
                url: base.join(&format!("seg{sequence}.ts")).unwrap(),
                file_name: format!("seg{sequence}.ts"),
                duration: 4.0,
                discontinuity: false,
                sequence,
            })
            .collect();
        let rendition = Rendition::new(500000, base, segments);

        let client = Client::new();
        let downloader = RenditionDownloader::new(
            client,
            &rendition,
            Path::new("/tmp/work"),
            NonZeroU32::new(10).unwrap(),
            NonZeroU32::new(4).unwrap(),
        );

        let targets = downloader.remux_targets();
        let names: Vec<_> = targets.iter().map(|t| t.file_name.as_str()).collect();
        assert_eq!(names, vec!["seg0.ts", "seg1.ts", "seg2.ts"]);
        assert_eq!(
            targets[0].output,
            PathBuf::from("/tmp/work/500000/seg0.ts.mp4")
        );
    }
}
