//! Sitemap generation.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/news</loc>
//!     <lastmod>2025-01-01</lastmod>
//!     <changefreq>daily</changefreq>
//!     <priority>0.9</priority>
//!   </url>
//! </urlset>
//! ```

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::paths::PathEnumerator;

/// XML namespace for sitemap
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

pub const SITEMAP_FILE: &str = "sitemap.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFreq {
    Daily,
    Weekly,
    Monthly,
}

impl ChangeFreq {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFreq::Daily => "daily",
            ChangeFreq::Weekly => "weekly",
            ChangeFreq::Monthly => "monthly",
        }
    }
}

/// Change frequency and priority for a site path.
pub fn classify(path: &str) -> (ChangeFreq, &'static str) {
    if path.is_empty() || path == "/" {
        return (ChangeFreq::Daily, "1.0");
    }
    if path == "/news" {
        return (ChangeFreq::Daily, "0.9");
    }
    if let Some(rest) = path.strip_prefix("/news/") {
        if !rest.is_empty() && !rest.contains('/') && rest != "archive" {
            return (ChangeFreq::Weekly, "0.8");
        }
    }
    if path.strip_prefix("/events/").is_some_and(|rest| !rest.is_empty()) {
        return (ChangeFreq::Weekly, "0.7");
    }
    (ChangeFreq::Monthly, "0.6")
}

/// Single URL entry in the sitemap
struct UrlEntry {
    loc: String,
    lastmod: NaiveDate,
    changefreq: ChangeFreq,
    priority: &'static str,
}

pub struct Sitemap {
    urls: Vec<UrlEntry>,
}

impl Sitemap {
    /// One entry per path, in input order. Paths are relative to `base_url`.
    pub fn from_paths<I, S>(base_url: &str, paths: I, lastmod: NaiveDate) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let base = base_url.trim_end_matches('/');
        let urls = paths
            .into_iter()
            .map(|path| {
                let path = path.as_ref();
                let (changefreq, priority) = classify(path);
                UrlEntry {
                    loc: format!("{}{}", base, path),
                    lastmod,
                    changefreq,
                    priority,
                }
            })
            .collect();
        Self { urls }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn into_xml(self) -> String {
        let mut xml = String::with_capacity(256 + self.urls.len() * 160);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
        xml.push('\n');

        for entry in self.urls {
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
            xml.push_str(&format!(
                "    <lastmod>{}</lastmod>\n",
                entry.lastmod.format("%Y-%m-%d")
            ));
            xml.push_str(&format!(
                "    <changefreq>{}</changefreq>\n",
                entry.changefreq.as_str()
            ));
            xml.push_str(&format!("    <priority>{}</priority>\n", entry.priority));
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }

    pub async fn write(self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let count = self.len();
        tokio::fs::write(path, self.into_xml())
            .await
            .with_context(|| format!("failed to write sitemap to {}", path.display()))?;
        info!(path = %path.display(), urls = count, "sitemap written");
        Ok(())
    }
}

/// Fetch the dynamic URLs and write `<output_dir>/sitemap.xml`.
pub async fn build_sitemap(cfg: &Config, paths: &PathEnumerator) -> Result<PathBuf> {
    let dynamic = paths.all_dynamic_urls().await;
    let all = cfg.site.static_pages.iter().chain(dynamic.iter());
    let sitemap = Sitemap::from_paths(&cfg.site.base_url, all, Utc::now().date_naive());
    let out = Path::new(&cfg.site.output_dir).join(SITEMAP_FILE);
    sitemap.write(&out).await?;
    Ok(out)
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
