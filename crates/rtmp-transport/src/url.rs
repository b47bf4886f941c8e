use url::Url;

use crate::error::TransportError;

/// A parsed `rtmp://host[:port]/app/stream_key` URL.
///
/// Grounded on the URL-joining logic in
/// `just-tom-test-rust-broadcaster/crates/broadcaster-engine/src/state.rs::init_rtmp`,
/// which splits the same way (app path vs. stream key) when assembling a
/// publish URL; here we parse rather than assemble, since the client is a
/// consumer of an existing URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtmpUrl {
    pub host: String,
    pub port: u16,
    pub app: String,
    pub stream_key: String,
}

impl RtmpUrl {
    pub fn parse(raw: &str) -> Result<Self, TransportError> {
        let parsed = Url::parse(raw).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        if parsed.scheme() != "rtmp" {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| TransportError::InvalidUrl("missing host".into()))?
            .to_string();
        let port = parsed.port().unwrap_or(1935);

        let mut segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        if segments.is_empty() {
            return Err(TransportError::InvalidUrl("missing app/stream path".into()));
        }

        let stream_key = segments
            .pop()
            .ok_or_else(|| TransportError::InvalidUrl("missing stream key".into()))?
            .to_string();
        let app = segments.join("/");

        if app.is_empty() {
            return Err(TransportError::InvalidUrl("missing app name".into()));
        }

        Ok(Self {
            host,
            port,
            app,
            stream_key,
        })
    }

    pub fn host_port(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let url = RtmpUrl::parse("rtmp://live.example.com/app/stream-key").unwrap();
        assert_eq!(url.host, "live.example.com");
        assert_eq!(url.port, 1935);
        assert_eq!(url.app, "app");
        assert_eq!(url.stream_key, "stream-key");
    }

    #[test]
    fn test_parse_custom_port() {
        let url = RtmpUrl::parse("rtmp://example.com:1936/live/abc123").unwrap();
        assert_eq!(url.port, 1936);
        assert_eq!(url.app, "live");
        assert_eq!(url.stream_key, "abc123");
    }

    #[test]
    fn test_parse_nested_app() {
        let url = RtmpUrl::parse("rtmp://example.com/app/sub/stream-key").unwrap();
        assert_eq!(url.app, "app/sub");
        assert_eq!(url.stream_key, "stream-key");
    }

    #[test]
    fn test_rejects_non_rtmp_scheme() {
        assert!(RtmpUrl::parse("http://example.com/app/key").is_err());
    }

    #[test]
    fn test_rejects_single_segment_path() {
        // one path segment becomes the stream key, leaving no app name.
        assert!(RtmpUrl::parse("rtmp://example.com/app").is_err());
    }
}
