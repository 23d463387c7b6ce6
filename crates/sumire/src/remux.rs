use std::{
    io::Write,
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::process::Command;

use crate::error::{SumireError, SumireResult};

/// Fixed per-segment options: copy both codecs bit-for-bit, rewrite ADTS
/// audio headers for the MP4 container, and normalize container timing.
const REMUX_ARGS: &[&str] = &[
    "-acodec",
    "copy",
    "-bsf:a",
    "aac_adtstoasc",
    "-vcodec",
    "copy",
    "-avoid_negative_ts",
    "make_zero",
    "-copyts",
];

/// Repackage one downloaded segment into an MP4 container without
/// re-encoding. A failed run removes whatever partial output it produced,
/// so a later invocation does not mistake it for a finished segment.
pub async fn remux_segment(input: &Path, output: &Path) -> SumireResult<()> {
    let ffmpeg = which::which("ffmpeg")?;

    log::debug!(
        "COMMAND: ffmpeg -i {} {} {}",
        input.display(),
        REMUX_ARGS.join(" "),
        output.display()
    );
    let status = Command::new(ffmpeg)
        .arg("-i")
        .arg(input)
        .args(REMUX_ARGS)
        .arg(output)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    if !status.success() {
        if output.exists() {
            let _ = tokio::fs::remove_file(output).await;
        }
        return Err(SumireError::CommandFailed {
            tool: "ffmpeg",
            status,
        });
    }
    Ok(())
}

/// Concatenate remuxed segments, in the order given, into a single file
/// with ffmpeg's concat demuxer.
pub async fn concat_segments(inputs: &[PathBuf], output: &Path) -> SumireResult<()> {
    let ffmpeg = which::which("ffmpeg")?;

    let mut list = tempfile::Builder::new().suffix(".txt").tempfile()?;
    write_concat_list(inputs, &mut list)?;
    list.flush()?;

    log::debug!(
        "COMMAND: ffmpeg -f concat -safe 0 -i {} -c copy {}",
        list.path().display(),
        output.display()
    );
    let status = Command::new(ffmpeg)
        .args(["-f", "concat", "-safe", "0", "-i"])
        .arg(list.path())
        .args(["-c", "copy"])
        .arg(output)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    if !status.success() {
        return Err(SumireError::CommandFailed {
            tool: "ffmpeg",
            status,
        });
    }
    Ok(())
}

/// One `file '<path>'` line per segment, in the order given.
pub(crate) fn write_concat_list<W: Write>(
    inputs: &[PathBuf],
    writer: &mut W,
) -> std::io::Result<()> {
    for input in inputs {
        writeln!(writer, "file '{}'", input.display())?;
    }
    Ok(())
}
