use std::path::{Path, PathBuf};

use m3u8_rs::MediaPlaylist;
use url::Url;

use crate::{error::SumireResult, segment::Segment};

/// One bitrate variant of the stream, wrapping its ordered segment list.
///
/// The list is mutable while renditions are being reconciled to a common
/// start and length, and is not touched afterwards.
pub struct Rendition {
    bandwidth: u64,
    playlist_url: Url,
    segments: Vec<Segment>,
}

impl Rendition {
    pub fn from_playlist(
        bandwidth: u64,
        playlist_url: Url,
        playlist: &MediaPlaylist,
    ) -> SumireResult<Self> {
        let mut segments = Vec::with_capacity(playlist.segments.len());
        for (i, segment) in playlist.segments.iter().enumerate() {
            let url = playlist_url.join(&segment.uri)?;
            let file_name = url
                .path_segments()
                .and_then(|c| c.last())
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("{i}.ts"));

            segments.push(Segment {
                url,
                file_name,
                duration: f64::from(segment.duration),
                discontinuity: segment.discontinuity,
                sequence: i as u64,
            });
        }

        Ok(Self {
            bandwidth,
            playlist_url,
            segments,
        })
    }

    #[cfg(test)]
    pub(crate) fn new(bandwidth: u64, playlist_url: Url, segments: Vec<Segment>) -> Self {
        Self {
            bandwidth,
            playlist_url,
            segments,
        }
    }

    pub fn bandwidth(&self) -> u64 {
        self.bandwidth
    }

    pub fn playlist_url(&self) -> &Url {
        &self.playlist_url
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Identity of the first segment, used to pick a common start point.
    pub fn first_identifier(&self) -> Option<&str> {
        self.segments.first().map(Segment::identifier)
    }

    /// Directory this rendition downloads into, keyed by bandwidth so that
    /// renditions sharing a download root never collide.
    pub fn directory(&self, root: &Path) -> PathBuf {
        root.join(self.bandwidth.to_string())
    }

    /// Drop the leading segment. Ordinals of the remaining segments keep
    /// their discovery-time values.
    pub(crate) fn drop_first(&mut self) -> Option<Segment> {
        if self.segments.is_empty() {
            None
        } else {
            Some(self.segments.remove(0))
        }
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.segments.truncate(len);
    }

    /// Cumulative elapsed duration at the start of every segment flagged
    /// discontinuous, in segment order. The flagged segment's own duration
    /// is not included in its offset.
    pub fn discontinuity_offsets(&self) -> Vec<f64> {
        let mut offsets = Vec::new();
        let mut elapsed = 0.0;
        for segment in &self.segments {
            if segment.discontinuity {
                offsets.push(elapsed);
            }
            elapsed += segment.duration;
        }
        offsets
    }
}
