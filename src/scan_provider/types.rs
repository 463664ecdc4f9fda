//! Wire types for the remote scan provider.
//!
//! The result schema is treated as opaque data the PDF renderer consumes
//! field by field. Every sub-object is optional-tolerant: a missing section
//! deserializes to its default instead of failing the whole report.

use serde::{Deserialize, Serialize};

/// Returned by a successful scan submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSubmission {
    /// Provider-side scan identifier, used to poll for the result.
    pub uuid: String,
    /// Where the result will become visible once the scan finishes.
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
}

/// Outcome of polling the provider for a finished result.
#[derive(Debug, Clone)]
pub enum ScanPoll {
    /// The scan is still running; not an error, just no change yet.
    Pending,
    Ready(Box<ScanReport>),
}

/// The provider's structured report for a finished scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanReport {
    pub data: NetworkData,
    pub lists: HostLists,
    pub meta: Meta,
    pub page: PageInfo,
    pub verdicts: Verdicts,
    pub stats: ScanStats,
    pub task: TaskInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkData {
    pub requests: Vec<RequestEntry>,
    pub cookies: Vec<CookieEntry>,
    pub console: Vec<ConsoleEntry>,
    pub links: Vec<LinkEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestEntry {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<u16>,
    pub method: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CookieEntry {
    pub name: String,
    pub domain: Option<String>,
    pub secure: Option<bool>,
    pub http_only: Option<bool>,
    pub same_site: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkEntry {
    pub href: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostLists {
    pub domains: Vec<String>,
    pub ips: Vec<String>,
    pub asns: Vec<String>,
    pub countries: Vec<String>,
    pub urls: Vec<String>,
    pub certificates: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Meta {
    pub processors: Processors,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Processors {
    pub wappa: Option<WappaProcessor>,
    pub phishing: Option<PhishingProcessor>,
    pub rank: Option<RankProcessor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WappaProcessor {
    pub data: Vec<Technology>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Technology {
    pub app: String,
    pub categories: Vec<TechnologyCategory>,
    pub confidence_total: Option<f64>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnologyCategory {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhishingProcessor {
    pub data: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RankProcessor {
    pub bucket: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageInfo {
    pub url: String,
    pub domain: String,
    pub country: String,
    pub ip: String,
    pub asn: String,
    pub status: String,
    pub title: Option<String>,
    pub server: Option<String>,
    pub security_details: Option<SecurityDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecurityDetails {
    pub protocol: Option<String>,
    pub issuer: Option<String>,
    pub valid_from: Option<String>,
    pub valid_to: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Verdicts {
    pub overall: OverallVerdict,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverallVerdict {
    pub malicious: bool,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanStats {
    #[serde(rename = "dataLength")]
    pub data_length: u64,
    #[serde(rename = "uniqIPs")]
    pub uniq_ips: u64,
    #[serde(rename = "uniqCountries")]
    pub uniq_countries: u64,
    #[serde(rename = "secureRequests")]
    pub secure_requests: Option<u64>,
    #[serde(rename = "IPv6Percentage")]
    pub ipv6_percentage: Option<f64>,
    #[serde(rename = "adBlocked")]
    pub ad_blocked: Option<u64>,
    pub malicious: Option<MaliciousStats>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaliciousStats {
    pub requests: Option<u64>,
    pub domains: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskInfo {
    pub uuid: String,
    pub url: String,
    pub time: String,
    pub visibility: String,
    pub method: Option<String>,
    pub user_agent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_tolerates_missing_sections() {
        let report: ScanReport = serde_json::from_str("{}").unwrap();
        assert!(report.data.requests.is_empty());
        assert!(!report.verdicts.overall.malicious);
        assert!(report.page.security_details.is_none());
    }

    #[test]
    fn test_report_parses_camel_case_fields() {
        let raw = r#"{
            "page": {
                "url": "https://example.com/",
                "domain": "example.com",
                "country": "US",
                "ip": "93.184.216.34",
                "asn": "AS15133",
                "status": "200",
                "securityDetails": { "protocol": "TLS 1.3", "issuer": "DigiCert" }
            },
            "verdicts": { "overall": { "malicious": true, "categories": ["phishing"], "tags": [] } },
            "stats": { "dataLength": 2048, "uniqIPs": 3, "uniqCountries": 2, "IPv6Percentage": 12.5 },
            "data": {
                "cookies": [ { "name": "sid", "httpOnly": true, "sameSite": "Lax" } ]
            },
            "meta": { "processors": { "wappa": { "data": [
                { "app": "nginx", "categories": [{"name": "Web servers"}], "confidenceTotal": 100 }
            ] } } },
            "task": { "uuid": "abc", "url": "https://example.com/", "time": "", "visibility": "unlisted" }
        }"#;
        let report: ScanReport = serde_json::from_str(raw).unwrap();
        assert_eq!(report.page.domain, "example.com");
        assert_eq!(
            report
                .page
                .security_details
                .as_ref()
                .unwrap()
                .protocol
                .as_deref(),
            Some("TLS 1.3")
        );
        assert!(report.verdicts.overall.malicious);
        assert_eq!(report.stats.data_length, 2048);
        assert_eq!(report.stats.ipv6_percentage, Some(12.5));
        assert_eq!(report.data.cookies[0].http_only, Some(true));
        assert_eq!(report.meta.processors.wappa.unwrap().data[0].app, "nginx");
    }
}
