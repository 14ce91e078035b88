use anyhow::{Context, Result};
use reqwest::{Client, Url};
use tracing::{info, warn};

/// `<loc>` entries of a sitemap document.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SitemapEntries {
    /// `<urlset><url><loc>` page URLs.
    pub pages: Vec<String>,
    /// `<sitemapindex><sitemap><loc>` nested sitemaps.
    pub sitemaps: Vec<String>,
}

/// Fetch `<origin>/sitemap.xml` (plus any sitemaps it indexes, one level deep)
/// and return the same-host page URLs that contain one of `keywords`.
pub async fn fetch_policy_urls(
    client: &Client,
    origin: &Url,
    keywords: &[String],
) -> Result<Vec<Url>> {
    let root = origin.join("/sitemap.xml")?;
    let entries = fetch_sitemap(client, &root).await?;
    let mut pages = entries.pages;

    for nested in &entries.sitemaps {
        let Ok(url) = Url::parse(nested) else {
            warn!("Invalid nested sitemap URL {}", nested);
            continue;
        };
        match fetch_sitemap(client, &url).await {
            Ok(more) => pages.extend(more.pages),
            Err(e) => warn!("Skipping sitemap {}: {}", url, e),
        }
    }
    info!("Total URLs in sitemap: {}", pages.len());

    let filtered = filter_urls(origin, pages, keywords);
    info!("Policy pages after filtering: {}", filtered.len());
    Ok(filtered)
}

async fn fetch_sitemap(client: &Client, url: &Url) -> Result<SitemapEntries> {
    info!("Fetching sitemap: {}", url);
    let xml = client
        .get(url.clone())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
        .with_context(|| format!("Failed to fetch sitemap {}", url))?;
    parse_sitemap(&xml)
}

fn filter_urls(origin: &Url, urls: Vec<String>, keywords: &[String]) -> Vec<Url> {
    urls.into_iter()
        .filter(|u| keywords.iter().any(|k| u.contains(k.as_str())))
        .filter_map(|u| Url::parse(u.trim()).ok())
        .filter(|u| u.host_str() == origin.host_str())
        .collect()
}

/// Parse a urlset or sitemapindex document.
pub fn parse_sitemap(xml: &str) -> Result<SitemapEntries> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut entries = SitemapEntries::default();
    let mut in_url = false;
    let mut in_sitemap = false;
    let mut in_loc = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"url" => in_url = true,
                b"sitemap" => in_sitemap = true,
                b"loc" if in_url || in_sitemap => in_loc = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(e)) if in_loc => {
                let loc = e.unescape()?.trim().to_string();
                if in_sitemap {
                    entries.sitemaps.push(loc);
                } else {
                    entries.pages.push(loc);
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"loc" => in_loc = false,
                b"url" => in_url = false,
                b"sitemap" => in_sitemap = false,
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(entries)
}
