use std::num::NonZeroU32;

use anyhow::Result;
use reqwest::{Client, Url};
use sumire::{download::RenditionDownloader, manifest, Rendition, SumireError};
use wiremock::{
    matchers::{method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

const PLAYLIST: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:4
#EXTINF:4,
seg0.ts
#EXTINF:4,
seg1.ts
#EXT-X-ENDLIST
";

async fn rendition_from(server: &MockServer) -> Result<Rendition> {
    Mock::given(method("GET"))
        .and(path("/hls/index.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PLAYLIST))
        .mount(server)
        .await;

    let client = Client::new();
    let url = Url::parse(&format!("{}/hls/index.m3u8", server.uri()))?;
    let playlist = manifest::load_media(&client, &url, 3).await?;
    Ok(Rendition::from_playlist(500000, url, &playlist)?)
}

fn downloader<'a>(rendition: &'a Rendition, root: &std::path::Path) -> RenditionDownloader<'a> {
    RenditionDownloader::new(
        Client::new(),
        rendition,
        root,
        NonZeroU32::new(4).unwrap(),
        NonZeroU32::new(4).unwrap(),
    )
}

#[tokio::test]
async fn test_segment_retry_succeeds_within_budget() -> Result<()> {
    let server = MockServer::start().await;
    let rendition = rendition_from(&server).await?;

    // First hit on seg0 fails, the retry succeeds.
    Mock::given(method("GET"))
        .and(path("/hls/seg0.ts"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hls/seg0.ts"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(&b"segment 0"[..]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hls/seg1.ts"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(&b"segment 1"[..]))
        .mount(&server)
        .await;

    let root = tempfile::tempdir()?;
    downloader(&rendition, root.path()).download().await?;

    assert_eq!(
        std::fs::read(root.path().join("500000/seg0.ts"))?,
        b"segment 0"
    );
    assert_eq!(
        std::fs::read(root.path().join("500000/seg1.ts"))?,
        b"segment 1"
    );
    Ok(())
}

#[tokio::test]
async fn test_retry_exhaustion_fails_the_rendition() -> Result<()> {
    let server = MockServer::start().await;
    let rendition = rendition_from(&server).await?;

    Mock::given(method("GET"))
        .and(path("/hls/seg0.ts"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hls/seg1.ts"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(&b"segment 1"[..]))
        .mount(&server)
        .await;

    let root = tempfile::tempdir()?;
    let error = downloader(&rendition, root.path())
        .download()
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        SumireError::SegmentsFailed {
            bandwidth: 500000,
            count: 1
        }
    ));

    // Four attempts total hit the wire before the segment was dropped.
    let requests = server.received_requests().await.unwrap();
    let seg0_hits = requests
        .iter()
        .filter(|r| r.url.path() == "/hls/seg0.ts")
        .count();
    assert_eq!(seg0_hits, 4);

    // The healthy segment still landed; the failure only surfaced after
    // the pool drained.
    assert!(root.path().join("500000/seg1.ts").is_file());
    Ok(())
}

#[tokio::test]
async fn test_cached_segments_are_not_refetched() -> Result<()> {
    let server = MockServer::start().await;
    let rendition = rendition_from(&server).await?;

    Mock::given(method("GET"))
        .and(path_regex(r"^/hls/seg\d+\.ts$"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let root = tempfile::tempdir()?;
    let dir = root.path().join("500000");
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("seg0.ts"), b"cached 0")?;
    std::fs::write(dir.join("seg1.ts"), b"cached 1")?;

    downloader(&rendition, root.path()).download().await?;

    assert_eq!(std::fs::read(dir.join("seg0.ts"))?, b"cached 0");
    assert_eq!(std::fs::read(dir.join("seg1.ts"))?, b"cached 1");
    Ok(())
}
