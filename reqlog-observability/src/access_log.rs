use chrono::{DateTime, Utc};
use http::Request;
use http::header::USER_AGENT;
use reqlog_core::entry::LogEntry;

/// Agent recorded when a request carries no `User-Agent` header.
pub const UNKNOWN_AGENT: &str = "-";

/// Observable attributes of an inbound request, captured before the handler
/// runs so they can be logged once the response status is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub agent: String,
    pub method: String,
    pub resource: String,
    pub version: String,
}

impl RequestInfo {
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let agent = req
            .headers()
            .get(USER_AGENT)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_else(|| UNKNOWN_AGENT.to_string());

        let uri = req.uri();
        let resource = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        Self {
            agent,
            method: req.method().as_str().to_string(),
            resource,
            // `Version`'s Debug form is already "HTTP/1.1", "HTTP/2.0", ...
            version: format!("{:?}", req.version()),
        }
    }

    pub fn into_entry(self, status: u16, completed_at: DateTime<Utc>) -> LogEntry {
        LogEntry::new(
            self.agent,
            completed_at,
            self.method,
            self.resource,
            self.version,
            status,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use http::{HeaderValue, Method, Version};

    #[test]
    fn captures_agent_method_resource_version() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/logs?limit=5")
            .version(Version::HTTP_11)
            .header(USER_AGENT, "curl/8.4.0")
            .body(())
            .unwrap();
        let info = RequestInfo::from_request(&req);
        assert_eq!(
            info,
            RequestInfo {
                agent: "curl/8.4.0".into(),
                method: "POST".into(),
                resource: "/logs?limit=5".into(),
                version: "HTTP/1.1".into(),
            }
        );
    }

    #[test]
    fn missing_agent_uses_placeholder() {
        let req = Request::builder().uri("/").body(()).unwrap();
        assert_eq!(RequestInfo::from_request(&req).agent, UNKNOWN_AGENT);
    }

    #[test]
    fn non_utf8_agent_is_lossy() {
        let mut req = Request::builder().uri("/").body(()).unwrap();
        req.headers_mut()
            .insert(USER_AGENT, HeaderValue::from_bytes(b"bot\xff").unwrap());
        assert_eq!(RequestInfo::from_request(&req).agent, "bot\u{fffd}");
    }

    #[test]
    fn http2_version_string() {
        let req = Request::builder()
            .uri("/")
            .version(Version::HTTP_2)
            .body(())
            .unwrap();
        assert_eq!(RequestInfo::from_request(&req).version, "HTTP/2.0");
    }

    #[test]
    fn into_entry_stamps_status_and_time() {
        let req = Request::builder().uri("/nope").body(()).unwrap();
        let t = Utc.with_ymd_and_hms(2025, 3, 2, 1, 2, 3).unwrap();
        let entry = RequestInfo::from_request(&req).into_entry(404, t);
        assert_eq!(entry.status, 404);
        assert_eq!(entry.time, "2025-03-02T01:02:03.000Z");
        assert_eq!(entry.resource, "/nope");
        assert_eq!(entry.method, "GET");
    }
}
