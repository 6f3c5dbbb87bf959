//! Change-gated feed writing and durable feed storage
//!
//! The feed lives on disk as two artifacts that are rewritten together on
//! every append: a versioned JSON store (loaded and appended to without
//! re-parsing XML) and the rendered RSS 2.0 document readers consume. Any
//! I/O failure is fatal to the write attempt and surfaced; a missed feed
//! entry is user-visible data loss.

use crate::config::FeedConfig;
use crate::duration_fmt::format_duration_or_sentinel;
use crate::error::{BedwatchError, Result};
use crate::logging::get_logger;
use crate::status::{StatusSnapshot, status_label};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk format version of the feed store
pub const FEED_STORE_VERSION: u32 = 1;

/// One published status-change entry, append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Entry title
    pub title: String,

    /// Entry description
    pub description: String,

    /// Entry link
    pub link: String,

    /// Publication timestamp
    pub published_at: DateTime<Utc>,

    /// Unique identifier
    pub guid: String,
}

/// Ordered entry list plus feed-level metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedStore {
    /// Store format version, checked on load
    pub version: u32,

    /// Feed title
    pub title: String,

    /// Feed link
    pub link: String,

    /// Feed description
    pub description: String,

    /// Feed language code
    pub language: String,

    /// Entries in append order (oldest first)
    pub entries: Vec<FeedEntry>,
}

impl FeedStore {
    /// Create an empty store from feed metadata
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            version: FEED_STORE_VERSION,
            title: config.title.clone(),
            link: config.link.clone(),
            description: config.description.clone(),
            language: config.language.clone(),
            entries: Vec::new(),
        }
    }

    /// Render the RSS 2.0 document, newest entry first
    pub fn render_rss(&self) -> String {
        let mut out = String::with_capacity(512 + self.entries.len() * 256);
        out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        out.push_str("<rss version=\"2.0\">\n  <channel>\n");
        out.push_str(&format!("    <title>{}</title>\n", xml_escape(&self.title)));
        out.push_str(&format!("    <link>{}</link>\n", xml_escape(&self.link)));
        out.push_str(&format!(
            "    <description>{}</description>\n",
            xml_escape(&self.description)
        ));
        out.push_str(&format!(
            "    <language>{}</language>\n",
            xml_escape(&self.language)
        ));

        for entry in self.entries.iter().rev() {
            out.push_str("    <item>\n");
            out.push_str(&format!(
                "      <title>{}</title>\n",
                xml_escape(&entry.title)
            ));
            out.push_str(&format!(
                "      <description>{}</description>\n",
                xml_escape(&entry.description)
            ));
            out.push_str(&format!("      <link>{}</link>\n", xml_escape(&entry.link)));
            out.push_str(&format!(
                "      <pubDate>{}</pubDate>\n",
                entry.published_at.to_rfc2822()
            ));
            out.push_str(&format!(
                "      <guid isPermaLink=\"false\">{}</guid>\n",
                xml_escape(&entry.guid)
            ));
            out.push_str("    </item>\n");
        }

        out.push_str("  </channel>\n</rss>\n");
        out
    }
}

fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Appends status-change entries to the persisted feed pair
pub struct FeedPublisher {
    config: FeedConfig,
    store_path: PathBuf,
    xml_path: PathBuf,
    logger: crate::logging::StructuredLogger,
}

impl FeedPublisher {
    /// Create a publisher from feed configuration
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            store_path: PathBuf::from(&config.store_path),
            xml_path: PathBuf::from(&config.xml_path),
            config: config.clone(),
            logger: get_logger("feed"),
        }
    }

    /// Load the durable store, or initialize a fresh one if absent
    pub fn load_or_init(&self) -> Result<FeedStore> {
        if !self.store_path.exists() {
            self.logger
                .info("No feed store found, initializing a new feed");
            return Ok(FeedStore::new(&self.config));
        }

        let contents = std::fs::read_to_string(&self.store_path)
            .map_err(|e| BedwatchError::feed(format!("failed to read feed store: {}", e)))?;
        let store: FeedStore = serde_json::from_str(&contents)
            .map_err(|e| BedwatchError::feed(format!("corrupt feed store: {}", e)))?;

        if store.version != FEED_STORE_VERSION {
            return Err(BedwatchError::feed(format!(
                "unsupported feed store version {} (expected {})",
                store.version, FEED_STORE_VERSION
            )));
        }

        Ok(store)
    }

    /// Append an entry for the snapshot's status and persist both artifacts
    pub fn publish(&self, snapshot: &StatusSnapshot) -> Result<FeedEntry> {
        let label = status_label(snapshot);
        let title = format!("{} is {}", self.config.subject, label);
        let description = format!(
            "{} is currently {}. They've been in bed for {}.",
            self.config.subject,
            label,
            format_duration_or_sentinel(snapshot.time_in_bed)
        );

        let entry = FeedEntry {
            title,
            description,
            link: self.config.link.clone(),
            published_at: Utc::now(),
            guid: uuid::Uuid::new_v4().to_string(),
        };

        let mut store = self.load_or_init()?;
        store.entries.push(entry.clone());
        self.persist(&store)?;

        self.logger
            .info(&format!("Published feed entry: {}", entry.title));
        Ok(entry)
    }

    /// Write both artifacts from the in-memory store
    fn persist(&self, store: &FeedStore) -> Result<()> {
        ensure_parent_dir(&self.store_path)?;
        ensure_parent_dir(&self.xml_path)?;

        let json = serde_json::to_string_pretty(store)
            .map_err(|e| BedwatchError::feed(format!("failed to encode feed store: {}", e)))?;
        std::fs::write(&self.store_path, json)
            .map_err(|e| BedwatchError::feed(format!("failed to write feed store: {}", e)))?;

        std::fs::write(&self.xml_path, store.render_rss())
            .map_err(|e| BedwatchError::feed(format!("failed to write feed document: {}", e)))?;

        Ok(())
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| BedwatchError::feed(format!("failed to create {:?}: {}", parent, e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_escape() {
        assert_eq!(
            xml_escape("a & b < c > \"d\" 'e'"),
            "a &amp; b &lt; c &gt; &quot;d&quot; &apos;e&apos;"
        );
        assert_eq!(xml_escape("plain"), "plain");
    }

    #[test]
    fn test_render_rss_reverse_chronological() {
        let mut store = FeedStore::new(&FeedConfig::default());
        for n in 1..=2 {
            store.entries.push(FeedEntry {
                title: format!("entry {}", n),
                description: format!("description {}", n),
                link: store.link.clone(),
                published_at: Utc::now(),
                guid: format!("guid-{}", n),
            });
        }
        let xml = store.render_rss();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<rss version=\"2.0\">"));
        assert!(xml.contains("<language>en</language>"));
        let first = xml.find("entry 2").unwrap();
        let second = xml.find("entry 1").unwrap();
        assert!(first < second, "newest entry must come first");
    }
}
