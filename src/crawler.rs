use std::collections::{HashMap, VecDeque};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::db::PageRow;

static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

pub fn build_client(settings: &Settings) -> Result<Client> {
    Client::builder()
        .user_agent(settings.user_agent.clone())
        .timeout(Duration::from_secs(settings.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

/// Fetch a single page and return its body.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    info!("Fetching {}...", url);
    let body = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
        .with_context(|| format!("Failed to read body of {}", url))?;
    Ok(body)
}

/// Hrefs of all anchors whose href contains one of `keywords`.
pub fn extract_links_with_keywords(html: &str, keywords: &[String]) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| keywords.iter().any(|k| href.contains(k.as_str())))
        .map(str::to_string)
        .collect()
}

/// Resolve `link` against the page it appeared on, without its fragment.
/// Non-http(s) links (mailto:, javascript:) resolve to `None`.
pub fn resolve_link(base: &Url, link: &str) -> Option<Url> {
    let mut url = base.join(link.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Sequential frontier walk over one site.
///
/// One request at a time, no retries. Pages on other hosts are recorded in
/// the link graph but never fetched.
pub struct Crawler {
    start: Url,
    client: Client,
    graph: HashMap<String, Vec<String>>,
    frontier: VecDeque<Url>,
}

impl Crawler {
    pub fn new(start: &str, client: Client) -> Result<Self> {
        let start = Url::parse(start).with_context(|| format!("Invalid start URL {}", start))?;
        let mut frontier = VecDeque::new();
        frontier.push_back(start.clone());
        Ok(Crawler {
            start,
            client,
            graph: HashMap::new(),
            frontier,
        })
    }

    pub fn origin(&self) -> String {
        self.start.origin().ascii_serialization()
    }

    pub fn start(&self) -> &Url {
        &self.start
    }

    /// Queue extra URLs behind what is already in the frontier.
    pub fn seed<I: IntoIterator<Item = Url>>(&mut self, urls: I) {
        self.frontier.extend(urls);
    }

    /// URL → outgoing followed links, for every URL seen so far.
    pub fn graph(&self) -> &HashMap<String, Vec<String>> {
        &self.graph
    }

    fn is_same_site(&self, url: &Url) -> bool {
        url.host_str() == self.start.host_str()
    }

    /// Crawl until the frontier is empty or `max_pages` pages were fetched.
    pub async fn crawl(&mut self, keywords: &[String], max_pages: usize) -> Result<Vec<PageRow>> {
        let pb = ProgressBar::new(max_pages as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );

        let mut pages = Vec::new();
        while pages.len() < max_pages {
            let Some(url) = self.frontier.pop_front() else {
                break;
            };
            let key = url.to_string();
            if self.graph.contains_key(&key) {
                continue;
            }
            if !self.is_same_site(&url) {
                info!("Skipping external {}...", url);
                self.graph.insert(key, Vec::new());
                continue;
            }
            self.graph.insert(key.clone(), Vec::new());

            pb.set_message(url.path().to_string());
            let row = fetch_row(&self.client, &url).await;
            if let Some(html) = &row.html {
                let edges = self.follow_links(&url, html, keywords);
                self.graph.insert(key, edges);
            }
            pages.push(row);
            pb.inc(1);
        }

        pb.finish_and_clear();
        let errors = pages.iter().filter(|p| p.error.is_some()).count();
        info!(
            "Crawled {} pages ({} errors, {} still queued)",
            pages.len(),
            errors,
            self.frontier.len()
        );
        Ok(pages)
    }

    fn follow_links(&mut self, page: &Url, html: &str, keywords: &[String]) -> Vec<String> {
        let mut edges = Vec::new();
        for link in extract_links_with_keywords(html, keywords) {
            let Some(resolved) = resolve_link(page, &link) else {
                debug!("Unresolvable link {:?} on {}", link, page);
                continue;
            };
            info!("Link found: {}", resolved);
            let target = resolved.to_string();
            if !self.graph.contains_key(&target) && !self.frontier.contains(&resolved) {
                self.frontier.push_back(resolved);
            }
            edges.push(target);
        }
        edges
    }
}

async fn fetch_row(client: &Client, url: &Url) -> PageRow {
    let start = Instant::now();
    let response = client.get(url.clone()).send().await;
    let (html, status, error) = match response {
        Ok(resp) => {
            let status = resp.status();
            if !status.is_success() {
                (None, Some(status.as_u16()), Some(format!("HTTP {}", status)))
            } else {
                match resp.text().await {
                    Ok(body) => (Some(body), Some(status.as_u16()), None),
                    Err(e) => (None, Some(status.as_u16()), Some(e.to_string())),
                }
            }
        }
        Err(e) => (None, e.status().map(|s| s.as_u16()), Some(e.to_string())),
    };
    if let Some(e) = &error {
        warn!("Fetch failed for {}: {}", url, e);
    }
    PageRow {
        url: url.to_string(),
        html,
        status,
        error,
        latency_ms: Some(start.elapsed().as_millis() as i64),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn links_filtered_by_keyword() {
        let html = r#"
            <a href="/legal/terms">Terms</a>
            <a href="/blog/post">Blog</a>
            <a href="https://other.test/privacy-policy">Privacy</a>
            <a name="anchor">no href</a>
        "#;
        let links = extract_links_with_keywords(html, &keywords(&["terms", "privacy"]));
        assert_eq!(links, vec!["/legal/terms", "https://other.test/privacy-policy"]);
    }

    #[test]
    fn resolves_relative_and_absolute() {
        let base = Url::parse("https://example.com/legal/index.html").unwrap();
        assert_eq!(
            resolve_link(&base, "/terms").unwrap().as_str(),
            "https://example.com/terms"
        );
        assert_eq!(
            resolve_link(&base, "privacy.html#cookies").unwrap().as_str(),
            "https://example.com/legal/privacy.html"
        );
        assert_eq!(
            resolve_link(&base, "https://cdn.example.org/tos").unwrap().as_str(),
            "https://cdn.example.org/tos"
        );
        assert_eq!(resolve_link(&base, "mailto:legal@example.com"), None);
    }

    #[test]
    fn frontier_and_graph() {
        let mut crawler =
            Crawler::new("https://example.com/", Client::new()).unwrap();
        assert_eq!(crawler.origin(), "https://example.com");

        let page = Url::parse("https://example.com/").unwrap();
        let html = r#"<a href="/terms">a</a><a href="/terms#top">b</a><a href="https://x.test/terms">c</a>"#;
        let edges = crawler.follow_links(&page, html, &keywords(&["terms"]));

        assert_eq!(edges.len(), 3);
        let queued: Vec<_> = crawler.frontier.iter().map(|u| u.as_str()).collect();
        assert_eq!(
            queued,
            vec![
                "https://example.com/",
                "https://example.com/terms",
                "https://x.test/terms"
            ]
        );
        assert!(!crawler.is_same_site(&Url::parse("https://x.test/terms").unwrap()));
    }
}
