use url::Url;

/// One media chunk referenced by a variant playlist.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Absolute URL, resolved against the playlist URL.
    pub url: Url,
    /// Local file name, the basename of the URI path.
    pub file_name: String,
    /// Duration in seconds as declared by the playlist.
    pub duration: f64,
    /// A playlist-declared timeline break precedes this segment.
    pub discontinuity: bool,
    /// Ordinal position allocated at discovery, starts from 0.
    ///
    /// Downloads complete in arbitrary order; this is the only ordering key.
    pub sequence: u64,
}

impl Segment {
    /// File name with the extension stripped. Renditions of the same stream
    /// name corresponding segments alike, so this is the identity used to
    /// align them.
    pub fn identifier(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.file_name)
    }
}
