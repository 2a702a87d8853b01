use regex::Regex;
use reqwest::Client;
use scraper::Html;
use tracing::{debug, info};
use url::Url;

use crate::core::error::{Result, ResumakeError};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Below this many characters the page is treated as not fetched (bot wall,
/// empty shell, redirect stub).
const MIN_PAGE_TEXT_CHARS: usize = 200;

/// Fetches a job posting and reduces it to readable plain text.
///
/// Headless-browser rendering and bot evasion are out of scope; a page that
/// only renders client-side will fail the minimum-text check and abort the
/// run.
pub async fn fetch_job_posting(job_url: &str, timeout_secs: u64) -> Result<String> {
    let parsed = Url::parse(job_url)
        .map_err(|e| ResumakeError::Scrape(format!("invalid job URL '{job_url}': {e}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ResumakeError::Scrape(format!(
            "unsupported URL scheme '{}'",
            parsed.scheme()
        )));
    }

    info!("Fetching job posting: {}", parsed);
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .expect("Failed to create HTTP client");

    let html = client
        .get(parsed)
        .send()
        .await?
        .error_for_status()
        .map_err(ResumakeError::Http)?
        .text()
        .await?;

    let text = extract_page_text(&html);
    debug!("Extracted {} chars of page text", text.len());
    if text.chars().count() < MIN_PAGE_TEXT_CHARS {
        return Err(ResumakeError::Scrape(format!(
            "page text too short ({} chars), posting likely requires a rendered browser",
            text.chars().count()
        )));
    }
    Ok(text)
}

/// Extracts the readable text of an HTML document: script/style/noscript
/// content removed, entities decoded, whitespace collapsed.
pub fn extract_page_text(html: &str) -> String {
    let blocked = Regex::new(r"(?is)<(script|style|noscript)\b.*?</(script|style|noscript)>")
        .expect("valid regex");
    let cleaned = blocked.replace_all(html, " ");

    let document = Html::parse_document(&cleaned);
    let raw: String = document
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");

    let whitespace = Regex::new(r"\s+").expect("valid regex");
    whitespace.replace_all(raw.trim(), " ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_strips_scripts_and_styles() {
        let html = r#"<html><head><style>body { color: red; }</style></head>
            <body><h1>Data Engineer</h1>
            <script>var tracking = "noise";</script>
            <p>Build   ETL
            pipelines.</p></body></html>"#;
        let text = extract_page_text(html);
        assert_eq!(text, "Data Engineer Build ETL pipelines.");
        assert!(!text.contains("tracking"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn test_extract_decodes_entities() {
        let text = extract_page_text("<p>C&amp;I engineering &gt; ops</p>");
        assert_eq!(text, "C&I engineering > ops");
    }

    #[tokio::test]
    async fn test_invalid_url_is_a_scrape_error() {
        let result = fetch_job_posting("not a url", 5).await;
        assert!(matches!(result, Err(ResumakeError::Scrape(_))));
    }

    #[tokio::test]
    async fn test_non_http_scheme_rejected() {
        let result = fetch_job_posting("ftp://example.com/job", 5).await;
        assert!(matches!(result, Err(ResumakeError::Scrape(_))));
    }
}
