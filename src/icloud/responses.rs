use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Response from `/sharedstreams/webstream`.
#[derive(Debug, Deserialize)]
pub struct WebStreamResponse {
    #[serde(default)]
    pub photos: Vec<StreamPhoto>,
}

/// Body of a 330 reply: the host that now serves this album.
#[derive(Debug, Deserialize)]
pub struct RedirectResponse {
    #[serde(rename = "X-Apple-MMe-Host", default)]
    pub host: Option<String>,
}

/// One photo in the stream. Derivatives are kept as dynamic JSON in server
/// order; their keys are resolution ids whose meaning Apple does not document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamPhoto {
    pub photo_guid: String,
    #[serde(default)]
    pub derivatives: Map<String, Value>,
}

impl StreamPhoto {
    pub fn derivatives(&self) -> impl Iterator<Item = Derivative<'_>> {
        self.derivatives.values().map(Derivative)
    }
}

/// A single resolution variant of a photo.
#[derive(Debug, Clone, Copy)]
pub struct Derivative<'a>(&'a Value);

impl<'a> Derivative<'a> {
    /// Width and height arrive as decimal strings; numbers are accepted too.
    /// Missing or unparsable dimensions count as zero.
    fn dimension(&self, key: &str) -> u64 {
        match &self.0[key] {
            Value::String(s) => s.trim().parse().unwrap_or(0),
            Value::Number(n) => n.as_u64().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn width(&self) -> u64 {
        self.dimension("width")
    }

    pub fn height(&self) -> u64 {
        self.dimension("height")
    }

    pub fn area(&self) -> u64 {
        self.width().saturating_mul(self.height())
    }

    pub fn checksum(&self) -> Option<&'a str> {
        let record: &'a Value = self.0;
        record["checksum"].as_str()
    }
}

/// Response from `/sharedstreams/webasseturls`.
#[derive(Debug, Default, Deserialize)]
pub struct AssetUrlsResponse {
    /// Keyed by derivative checksum.
    #[serde(default)]
    pub items: HashMap<String, AssetLocation>,
}

/// Where a derivative's bytes can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetLocation {
    #[serde(default)]
    pub url_location: Option<String>,
    #[serde(default)]
    pub url_path: Option<String>,
}

impl AssetLocation {
    #[cfg(test)]
    pub fn new(url_location: impl Into<String>, url_path: impl Into<String>) -> Self {
        Self {
            url_location: Some(url_location.into()),
            url_path: Some(url_path.into()),
        }
    }

    /// `https://{url_location}{url_path}`, or `None` when either half is missing.
    pub fn download_url(&self) -> Option<String> {
        match (self.url_location.as_deref(), self.url_path.as_deref()) {
            (Some(location), Some(path)) if !location.is_empty() && !path.is_empty() => {
                Some(format!("https://{location}{path}"))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webstream_response() {
        let json = r#"{
            "streamCtag": "FT;1;2",
            "userFirstName": "Jane",
            "photos": [
                {
                    "photoGuid": "G1",
                    "batchGuid": "B1",
                    "derivatives": {
                        "342": {"checksum": "c-small", "fileSize": "1000", "width": "342", "height": "256"},
                        "2049": {"checksum": "c-large", "fileSize": "9000", "width": "2049", "height": "1536"}
                    }
                },
                {"photoGuid": "G2"}
            ]
        }"#;
        let resp: WebStreamResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.photos.len(), 2);
        assert_eq!(resp.photos[0].photo_guid, "G1");
        let derivatives: Vec<_> = resp.photos[0].derivatives().collect();
        assert_eq!(derivatives.len(), 2);
        assert_eq!(derivatives[0].checksum(), Some("c-small"));
        assert_eq!(derivatives[1].width(), 2049);
        assert_eq!(derivatives[1].area(), 2049 * 1536);
        assert_eq!(resp.photos[1].derivatives().count(), 0);
    }

    #[test]
    fn test_webstream_response_empty() {
        let resp: WebStreamResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.photos.is_empty());
    }

    #[test]
    fn test_derivative_dimension_forms() {
        let v = serde_json::json!({"width": 10, "height": " 20 ", "checksum": "c"});
        let d = Derivative(&v);
        assert_eq!(d.width(), 10);
        assert_eq!(d.height(), 20);

        let v = serde_json::json!({"width": "wide"});
        let d = Derivative(&v);
        assert_eq!(d.area(), 0);
        assert_eq!(d.checksum(), None);
    }

    #[test]
    fn test_redirect_response() {
        let resp: RedirectResponse =
            serde_json::from_str(r#"{"X-Apple-MMe-Host": "p42-sharedstreams.icloud.com"}"#)
                .unwrap();
        assert_eq!(resp.host.as_deref(), Some("p42-sharedstreams.icloud.com"));

        let resp: RedirectResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.host.is_none());
    }

    #[test]
    fn test_asset_urls_response() {
        let json = r#"{
            "items": {
                "c-large": {"url_expiry": "2026-01-01T00:00:00Z", "url_location": "cvws.icloud-content.com", "url_path": "/B/abc/IMG_0001.JPG?o=xyz"}
            },
            "locations": {"cvws.icloud-content.com": {"scheme": "https"}}
        }"#;
        let resp: AssetUrlsResponse = serde_json::from_str(json).unwrap();
        let loc = &resp.items["c-large"];
        assert_eq!(
            loc.download_url().as_deref(),
            Some("https://cvws.icloud-content.com/B/abc/IMG_0001.JPG?o=xyz")
        );
    }

    #[test]
    fn test_incomplete_location_has_no_url() {
        let loc: AssetLocation = serde_json::from_str(r#"{"url_location": "h"}"#).unwrap();
        assert!(loc.download_url().is_none());
        let loc = AssetLocation::new("", "/p");
        assert!(loc.download_url().is_none());
    }
}
