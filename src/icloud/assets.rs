use std::collections::HashMap;

use super::responses::{AssetLocation, Derivative, StreamPhoto};

/// Photo GUID → location of that photo's best derivative.
pub type CandidateSet = HashMap<String, AssetLocation>;

/// The largest-area derivative of a photo. Ties keep the first one seen;
/// zero-area derivatives never win.
pub fn best_derivative(photo: &StreamPhoto) -> Option<Derivative<'_>> {
    let mut max_area = 0;
    let mut best = None;
    for derivative in photo.derivatives() {
        let area = derivative.area();
        if area > max_area {
            max_area = area;
            best = Some(derivative);
        }
    }
    best
}

/// Keep only the highest-resolution derivative of each photo, mapped to its
/// download location. Photos without derivatives, or whose best derivative
/// has no entry in `asset_urls`, are dropped.
pub fn filter_best_assets(
    photos: &[StreamPhoto],
    asset_urls: &HashMap<String, AssetLocation>,
) -> CandidateSet {
    let mut candidates = CandidateSet::with_capacity(photos.len());
    for photo in photos {
        let Some(best) = best_derivative(photo) else {
            tracing::debug!(guid = %photo.photo_guid, "Photo has no usable derivatives");
            continue;
        };
        let Some(location) = best.checksum().and_then(|c| asset_urls.get(c)) else {
            tracing::debug!(guid = %photo.photo_guid, "No asset URL for best derivative");
            continue;
        };
        if location.download_url().is_none() {
            tracing::warn!(guid = %photo.photo_guid, "Asset location is incomplete, skipping");
            continue;
        }
        candidates.insert(photo.photo_guid.clone(), location.clone());
    }
    candidates
}

/// File name of the asset on Apple's CDN: the raw text between the last `/`
/// and the first `?`, with no decoding or normalization.
pub fn source_filename(download_url: &str) -> Option<String> {
    let path = download_url
        .split_once('?')
        .map_or(download_url, |(path, _)| path);
    let (_, name) = path.rsplit_once('/')?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
