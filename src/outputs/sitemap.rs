//! `sitemap.xml` generation.
//!
//! The sitemap lists the homepage, the about page and one page per published
//! sitting day, derived from the `YYYYMMDD.json` names in `index.json`.

use crate::outputs::indexes::read_news_index;
use crate::utils::expand_compact_date;
use chrono::NaiveDate;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::error::Error;
use std::io::Cursor;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: NaiveDate,
    pub changefreq: &'static str,
    pub priority: &'static str,
}

/// Sitemap entries for `base_url` given the index file names.
///
/// Names that are not `YYYYMMDD.json` are skipped.
pub fn sitemap_entries(base_url: &str, index: &[String], today: NaiveDate) -> Vec<SitemapEntry> {
    let base = base_url.trim_end_matches('/');
    let mut entries = vec![
        SitemapEntry {
            loc: base.to_string(),
            lastmod: today,
            changefreq: "daily",
            priority: "1.0",
        },
        SitemapEntry {
            loc: format!("{base}/about"),
            lastmod: today,
            changefreq: "monthly",
            priority: "0.8",
        },
    ];

    entries.extend(index.iter().filter_map(|name| {
        let date = expand_compact_date(name.strip_suffix(".json")?)?;
        Some(SitemapEntry {
            loc: format!("{base}/{date}"),
            lastmod: date,
            changefreq: "weekly",
            priority: "0.9",
        })
    }));
    entries
}

/// Render entries as a sitemap document.
pub fn render_sitemap(entries: &[SitemapEntry]) -> Result<String, Box<dyn Error>> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new("urlset").with_attributes([("xmlns", SITEMAP_NS)]),
    ))?;

    for entry in entries {
        let lastmod = entry.lastmod.to_string();
        writer.write_event(Event::Start(BytesStart::new("url")))?;
        for (tag, value) in [
            ("loc", entry.loc.as_str()),
            ("lastmod", lastmod.as_str()),
            ("changefreq", entry.changefreq),
            ("priority", entry.priority),
        ] {
            writer.write_event(Event::Start(BytesStart::new(tag)))?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            writer.write_event(Event::End(BytesEnd::new(tag)))?;
        }
        writer.write_event(Event::End(BytesEnd::new("url")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("urlset")))?;
    let mut xml = String::from_utf8(writer.into_inner().into_inner())?;
    xml.push('\n');
    Ok(xml)
}

/// Write the sitemap for the days listed in `{output_dir}/index.json` to `path`.
///
/// Returns the number of URLs written.
#[instrument(level = "info", skip_all, fields(%output_dir, %path, %base_url))]
pub async fn generate_sitemap(
    output_dir: &str,
    base_url: &str,
    path: &str,
    today: NaiveDate,
) -> Result<usize, Box<dyn Error>> {
    let index = read_news_index(output_dir).await?;
    let entries = sitemap_entries(base_url, &index, today);
    let xml = render_sitemap(&entries)?;

    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, xml).await?;
    info!(urls = entries.len(), "Wrote sitemap");
    Ok(entries.len())
}
