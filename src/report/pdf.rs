//! PDF generation for scan reports.
//!
//! Draws the report section by section onto A4 pages with the built-in
//! Helvetica fonts, starting a new page whenever the current one runs out
//! of room. Sections whose data is absent from the report are skipped
//! entirely rather than rendered empty.

use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::error_handling::types::RenderError;
use crate::scan_provider::types::ScanReport;

// A4 in points
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN_X: f32 = 50.0;
const TOP_Y: f32 = PAGE_HEIGHT - 50.0;
const BOTTOM_Y: f32 = 100.0;

const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);
const GREY: (f32, f32, f32) = (0.4, 0.4, 0.4);
const RED: (f32, f32, f32) = (0.8, 0.0, 0.0);
const GREEN: (f32, f32, f32) = (0.0, 0.6, 0.0);
const ORANGE: (f32, f32, f32) = (0.8, 0.4, 0.0);
const BRAND: (f32, f32, f32) = (0.96, 0.51, 0.12);

/// Accumulates text operations page by page, breaking to a fresh page when
/// the cursor reaches the bottom margin.
struct Composer {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: f32,
}

impl Composer {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: TOP_Y,
        }
    }

    fn break_page(&mut self) {
        let ops = std::mem::take(&mut self.current);
        self.pages.push(ops);
        self.y = TOP_Y;
    }

    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < BOTTOM_Y {
            self.break_page();
        }
    }

    fn text_at(&mut self, x: f32, y: f32, text: &str, size: f32, bold: bool, color: (f32, f32, f32)) {
        let font = if bold { "F2" } else { "F1" };
        self.current.push(Operation::new("BT", vec![]));
        self.current
            .push(Operation::new("Tf", vec![font.into(), size.into()]));
        self.current.push(Operation::new(
            "rg",
            vec![color.0.into(), color.1.into(), color.2.into()],
        ));
        self.current
            .push(Operation::new("Td", vec![x.into(), y.into()]));
        self.current
            .push(Operation::new("Tj", vec![Object::string_literal(sanitize(text))]));
        self.current.push(Operation::new("ET", vec![]));
    }

    fn line(&mut self, text: &str, size: f32, bold: bool, color: (f32, f32, f32)) {
        if self.y < BOTTOM_Y {
            self.break_page();
        }
        self.text_at(MARGIN_X, self.y, text, size, bold, color);
        self.y -= size + 10.0;
    }

    fn heading(&mut self, text: &str) {
        self.ensure_room(60.0);
        self.line(text, 16.0, true, BLACK);
        self.y -= 5.0;
    }

    fn gap(&mut self, amount: f32) {
        self.y -= amount;
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.break_page();
        self.pages
    }
}

/// Base fonts carry a Latin-only encoding; anything outside it is replaced
/// so the text operator never emits bytes the font cannot show.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '?' })
        .collect()
}

/// Renders `report` as a PDF document. Pure: the report is only read.
pub fn render(report: &ScanReport, url: &str) -> Result<Vec<u8>, RenderError> {
    let mut c = Composer::new();

    // Header and scan metadata
    c.line("Vigie Security Report", 24.0, true, BRAND);
    c.gap(10.0);
    c.line(&format!("URL: {}", url), 12.0, false, BLACK);
    if !report.task.time.is_empty() {
        c.line(&format!("Scanned: {}", report.task.time), 10.0, false, GREY);
    }
    if !report.task.uuid.is_empty() {
        c.line(&format!("Scan ID: {}", report.task.uuid), 10.0, false, GREY);
    }
    if !report.task.visibility.is_empty() {
        c.line(
            &format!("Visibility: {}", report.task.visibility),
            10.0,
            false,
            GREY,
        );
    }
    c.gap(20.0);

    // Security verdict
    let verdict = &report.verdicts.overall;
    c.heading("Security Verdict");
    if verdict.malicious {
        c.line("MALICIOUS", 14.0, true, RED);
    } else {
        c.line("SAFE", 14.0, true, GREEN);
    }
    if !verdict.categories.is_empty() {
        c.line(
            &format!("Categories: {}", verdict.categories.join(", ")),
            10.0,
            false,
            BLACK,
        );
    }
    if !verdict.tags.is_empty() {
        c.line(&format!("Tags: {}", verdict.tags.join(", ")), 10.0, false, BLACK);
    }
    c.gap(20.0);

    // Page information
    let page = &report.page;
    if !page.domain.is_empty() || !page.ip.is_empty() {
        c.heading("Page Information");
        c.line(&format!("Domain: {}", page.domain), 11.0, false, BLACK);
        c.line(&format!("IP Address: {}", page.ip), 11.0, false, BLACK);
        c.line(&format!("Country: {}", page.country), 11.0, false, BLACK);
        c.line(&format!("ASN: {}", page.asn), 11.0, false, BLACK);
        c.line(&format!("HTTP Status: {}", page.status), 11.0, false, BLACK);
        if let Some(title) = &page.title {
            c.line(&format!("Page Title: {}", title), 11.0, false, BLACK);
        }
        c.gap(20.0);
    }

    // Technologies (top 10)
    if let Some(wappa) = &report.meta.processors.wappa {
        if !wappa.data.is_empty() {
            c.heading("Technologies Detected");
            for tech in wappa.data.iter().take(10) {
                let categories = tech
                    .categories
                    .iter()
                    .map(|cat| cat.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                c.line(&format!("- {} ({})", tech.app, categories), 10.0, false, BLACK);
            }
            c.gap(20.0);
        }
    }

    // Network statistics
    let stats = &report.stats;
    c.heading("Network Statistics");
    c.line(
        &format!("Total Requests: {}", report.data.requests.len()),
        11.0,
        false,
        BLACK,
    );
    c.line(&format!("Unique IPs: {}", stats.uniq_ips), 11.0, false, BLACK);
    c.line(
        &format!("Unique Countries: {}", stats.uniq_countries),
        11.0,
        false,
        BLACK,
    );
    c.line(
        &format!("Data Transferred: {:.2} KB", stats.data_length as f64 / 1024.0),
        11.0,
        false,
        BLACK,
    );
    if !report.data.cookies.is_empty() {
        c.line(
            &format!("Cookies Found: {}", report.data.cookies.len()),
            11.0,
            false,
            BLACK,
        );
    }
    if !report.data.links.is_empty() {
        c.line(
            &format!("Links Found: {}", report.data.links.len()),
            11.0,
            false,
            BLACK,
        );
    }
    if !report.data.console.is_empty() {
        c.line(
            &format!("Console Messages: {}", report.data.console.len()),
            11.0,
            false,
            BLACK,
        );
    }
    c.gap(20.0);

    // Domains contacted (top 15)
    if !report.lists.domains.is_empty() {
        c.heading("Domains Contacted");
        for domain in report.lists.domains.iter().take(15) {
            c.line(&format!("- {}", domain), 10.0, false, BLACK);
        }
        c.gap(20.0);
    }

    // Request analysis
    if !report.data.requests.is_empty() {
        c.ensure_room(200.0);
        c.heading("Request Analysis");
        let failed = report
            .data
            .requests
            .iter()
            .filter(|r| r.status.map(|s| s >= 400).unwrap_or(false))
            .count();
        c.line(
            &format!("Total Requests: {}", report.data.requests.len()),
            11.0,
            false,
            BLACK,
        );
        if failed > 0 {
            c.line(&format!("Failed Requests: {}", failed), 11.0, false, ORANGE);
        }
        let mut kinds: Vec<(String, usize)> = Vec::new();
        for request in &report.data.requests {
            let kind = request.kind.clone().unwrap_or_else(|| "other".to_string());
            match kinds.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, count)) => *count += 1,
                None => kinds.push((kind, 1)),
            }
        }
        for (kind, count) in kinds.iter().take(5) {
            c.line(&format!("  {}: {}", kind, count), 10.0, false, BLACK);
        }
        c.gap(20.0);
    }

    // Cookie security
    if !report.data.cookies.is_empty() {
        c.ensure_room(150.0);
        c.heading("Cookie Security");
        let secure = report
            .data
            .cookies
            .iter()
            .filter(|cookie| cookie.secure.unwrap_or(false))
            .count();
        let http_only = report
            .data
            .cookies
            .iter()
            .filter(|cookie| cookie.http_only.unwrap_or(false))
            .count();
        let third_party = report
            .data
            .cookies
            .iter()
            .filter(|cookie| {
                cookie
                    .domain
                    .as_ref()
                    .map(|d| !page.domain.is_empty() && !d.contains(&page.domain))
                    .unwrap_or(false)
            })
            .count();
        c.line(
            &format!("Total Cookies: {}", report.data.cookies.len()),
            11.0,
            false,
            BLACK,
        );
        c.line(&format!("Secure Cookies: {}", secure), 11.0, false, BLACK);
        c.line(&format!("HttpOnly Cookies: {}", http_only), 11.0, false, BLACK);
        if third_party > 0 {
            c.line(
                &format!("Third-Party Cookies: {}", third_party),
                11.0,
                false,
                ORANGE,
            );
        }
        c.gap(20.0);
    }

    // Console errors and warnings
    if !report.data.console.is_empty() {
        c.ensure_room(150.0);
        c.heading("Console Messages");
        let errors = report.data.console.iter().filter(|m| m.kind == "error").count();
        let warnings = report
            .data
            .console
            .iter()
            .filter(|m| m.kind == "warning")
            .count();
        c.line(
            &format!("Total Messages: {}", report.data.console.len()),
            11.0,
            false,
            BLACK,
        );
        if errors > 0 {
            c.line(&format!("Errors: {}", errors), 11.0, false, RED);
        }
        if warnings > 0 {
            c.line(&format!("Warnings: {}", warnings), 11.0, false, ORANGE);
        }
        c.gap(20.0);
    }

    // TLS certificate
    if let Some(details) = &page.security_details {
        c.ensure_room(150.0);
        c.heading("SSL/TLS Certificate");
        if let Some(protocol) = &details.protocol {
            c.line(&format!("Protocol: {}", protocol), 11.0, false, BLACK);
        }
        if let Some(issuer) = &details.issuer {
            c.line(&format!("Issuer: {}", issuer), 11.0, false, BLACK);
        }
        if let (Some(from), Some(to)) = (&details.valid_from, &details.valid_to) {
            c.line(&format!("Valid: {} to {}", from, to), 10.0, false, BLACK);
        }
        c.gap(20.0);
    }

    // Phishing indicators
    if let Some(phishing) = &report.meta.processors.phishing {
        if !phishing.data.is_empty() {
            c.ensure_room(150.0);
            c.heading("Phishing Indicators");
            for indicator in &phishing.data {
                c.line(&format!("WARNING: {}", indicator), 10.0, false, RED);
            }
            c.gap(20.0);
        }
    }

    // Malicious content counters
    if let Some(malicious) = &stats.malicious {
        if malicious.requests.unwrap_or(0) > 0 || malicious.domains.unwrap_or(0) > 0 {
            c.ensure_room(150.0);
            c.heading("Malicious Content Detected");
            if let Some(requests) = malicious.requests {
                c.line(&format!("Malicious Requests: {}", requests), 11.0, false, RED);
            }
            if let Some(domains) = malicious.domains {
                c.line(&format!("Malicious Domains: {}", domains), 11.0, false, RED);
            }
            c.gap(20.0);
        }
    }

    // Summary
    if c.y > 150.0 {
        c.gap(10.0);
        c.line("Security Summary", 16.0, true, BLACK);
        c.gap(5.0);
        if verdict.malicious {
            c.line("Threat Level: HIGH RISK", 12.0, true, RED);
        } else {
            c.line("Threat Level: LOW RISK", 12.0, true, GREEN);
        }
        if !report.lists.ips.is_empty() {
            c.line(
                &format!("Total IPs Contacted: {}", report.lists.ips.len()),
                10.0,
                false,
                BLACK,
            );
        }
        if !report.lists.asns.is_empty() {
            c.line(
                &format!("ASNs Involved: {}", report.lists.asns.len()),
                10.0,
                false,
                BLACK,
            );
        }
        if !report.lists.countries.is_empty() {
            c.line(
                &format!("Countries: {}", report.lists.countries.join(", ")),
                10.0,
                false,
                BLACK,
            );
        }
    }

    // Footer on the last page
    c.text_at(MARGIN_X, 50.0, "Generated by Vigie", 8.0, false, (0.5, 0.5, 0.5));
    c.text_at(
        PAGE_WIDTH - 250.0,
        50.0,
        &format!("Report Date: {}", Utc::now().to_rfc3339()),
        8.0,
        false,
        (0.5, 0.5, 0.5),
    );

    assemble(c.finish())
}

/// Builds the document skeleton around the composed page contents.
fn assemble(page_ops: Vec<Vec<Operation>>) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(page_ops.len());
    let count = page_ops.len() as i64;
    for operations in page_ops {
        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan_provider::types::{
        ConsoleEntry, CookieEntry, RequestEntry, ScanReport, SecurityDetails,
    };

    fn full_report() -> ScanReport {
        let mut report = ScanReport::default();
        report.page.domain = "example.com".to_string();
        report.page.ip = "93.184.216.34".to_string();
        report.page.country = "US".to_string();
        report.page.asn = "AS15133".to_string();
        report.page.status = "200".to_string();
        report.page.title = Some("Example Domain".to_string());
        report.page.security_details = Some(SecurityDetails {
            protocol: Some("TLS 1.3".to_string()),
            issuer: Some("DigiCert".to_string()),
            valid_from: Some("2026-01-01".to_string()),
            valid_to: Some("2027-01-01".to_string()),
        });
        report.verdicts.overall.malicious = true;
        report.verdicts.overall.categories = vec!["phishing".to_string()];
        report.stats.uniq_ips = 3;
        report.stats.uniq_countries = 2;
        report.stats.data_length = 4096;
        report.lists.domains = (0..30).map(|i| format!("host{}.example.com", i)).collect();
        report.data.requests = (0..20)
            .map(|i| RequestEntry {
                url: format!("https://example.com/{}", i),
                kind: Some(if i % 2 == 0 { "script" } else { "image" }.to_string()),
                status: Some(if i == 3 { 404 } else { 200 }),
                method: Some("GET".to_string()),
            })
            .collect();
        report.data.cookies = vec![CookieEntry {
            name: "sid".to_string(),
            domain: Some("tracker.example.net".to_string()),
            secure: Some(true),
            http_only: Some(false),
            same_site: None,
        }];
        report.data.console = vec![ConsoleEntry {
            kind: "error".to_string(),
            message: "boom".to_string(),
        }];
        report.task.uuid = "abc-123".to_string();
        report.task.visibility = "unlisted".to_string();
        report
    }

    #[test]
    fn test_render_produces_pdf_bytes() {
        let bytes = render(&full_report(), "https://example.com").unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn test_render_tolerates_empty_report() {
        let bytes = render(&ScanReport::default(), "https://example.com").unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_render_is_pure() {
        let report = full_report();
        let before = serde_json::to_string(&report).unwrap();
        let _ = render(&report, "https://example.com").unwrap();
        assert_eq!(serde_json::to_string(&report).unwrap(), before);
    }

    #[test]
    fn test_sanitize_replaces_non_latin() {
        assert_eq!(sanitize("plain text"), "plain text");
        assert_eq!(sanitize("smile \u{1F600}"), "smile ?");
    }
}
