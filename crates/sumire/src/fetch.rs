use std::path::Path;

use reqwest::Client;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::{SumireError, SumireResult};

/// Fetch one remote file in full and write it to `path`.
///
/// A non-2xx status is an error like any transport failure, so the caller's
/// retry wrapper absorbs both the same way. The file is only created once
/// the whole body has arrived.
pub async fn fetch_to_file(client: &Client, url: Url, path: &Path) -> SumireResult<()> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(SumireError::HttpError(response.status()));
    }
    let bytes = response.bytes().await?;

    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;

    Ok(())
}
