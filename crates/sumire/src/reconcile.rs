use crate::{
    error::{SumireError, SumireResult},
    rendition::Rendition,
};

/// Align all renditions to a common start segment and a common length, in
/// place, before anything is downloaded.
///
/// The start point is elected by majority vote over first-segment
/// identifiers; a tie goes to the identifier held by the lowest-bandwidth
/// rendition. Renditions that start early drop leading segments until they
/// match, then every rendition is trimmed to the shortest length.
pub fn reconcile(renditions: &mut [Rendition]) -> SumireResult<()> {
    if renditions.is_empty() {
        return Err(SumireError::NoUsableRendition);
    }

    let winner = elect_start(renditions).ok_or(SumireError::NoUsableRendition)?;
    log::info!("Aligning {} rendition(s) to first segment {winner}", renditions.len());

    for rendition in renditions.iter_mut() {
        align_start(rendition, &winner)?;
    }

    let min_len = renditions.iter().map(Rendition::len).min().unwrap_or(0);
    for rendition in renditions.iter_mut() {
        if rendition.len() > min_len {
            log::info!(
                "Trimming bitrate {} from {} to {min_len} segment(s)",
                rendition.bandwidth(),
                rendition.len()
            );
            rendition.truncate(min_len);
        }
    }

    // Alignment is best effort: structurally diverged streams can still
    // disagree here, and processing continues.
    let aligned = renditions
        .iter()
        .all(|r| r.first_identifier() == Some(winner.as_str()));
    if !aligned {
        log::warn!(
            "Renditions still disagree on the first segment after alignment; output may be misaligned"
        );
    }

    Ok(())
}

/// Majority vote over first-segment identifiers. Ties are broken in favor
/// of the identifier held by the lowest-bandwidth rendition, which keeps
/// the election deterministic regardless of manifest order.
fn elect_start(renditions: &[Rendition]) -> Option<String> {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for rendition in renditions {
        let Some(id) = rendition.first_identifier() else {
            continue;
        };
        match tally.iter_mut().find(|(name, _)| *name == id) {
            Some((_, count)) => *count += 1,
            None => tally.push((id, 1)),
        }
    }

    let best = tally.iter().map(|(_, count)| *count).max()?;
    let leaders: Vec<&str> = tally
        .iter()
        .filter(|(_, count)| *count == best)
        .map(|(name, _)| *name)
        .collect();

    renditions
        .iter()
        .filter(|r| r.first_identifier().is_some_and(|id| leaders.contains(&id)))
        .min_by_key(|r| r.bandwidth())
        .and_then(|r| r.first_identifier())
        .map(str::to_string)
}

fn align_start(rendition: &mut Rendition, winner: &str) -> SumireResult<()> {
    while rendition.first_identifier() != Some(winner) {
        match rendition.drop_first() {
            Some(segment) => log::debug!(
                "Bitrate {}: dropping leading segment {}",
                rendition.bandwidth(),
                segment.file_name
            ),
            None => {
                return Err(SumireError::AlignmentExhausted {
                    bandwidth: rendition.bandwidth(),
                    wanted: winner.to_string(),
                })
            }
        }
    }
    Ok(())
}
