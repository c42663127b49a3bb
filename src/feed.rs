//! Support for creating the RSS 2.0 feed from the public articles.

use crate::page::PageArticle;
use crate::render::prefix_local_media;
use crate::url::to_link;
use chrono::{DateTime, TimeZone, Utc};
use rss::extension::atom::{AtomExtension, Link};
use rss::extension::dublincore::DublinCoreExtension;
use rss::{ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

/// The output location of the feed.
pub const FEED_FILE: &str = "feed.xml";

const LANGUAGE: &str = "en-US";
const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

// Articles carry no time of day; every item is stamped with this hour.
const PUBLICATION_HOUR: u32 = 10;

const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";
const DUBLIN_CORE_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// Bundled channel metadata.
pub struct FeedConfig<'a> {
    pub title: &'a str,
    pub description: &'a str,

    /// Absolute and ending with `/`.
    pub site_root: &'a Url,
}

/// Builds the feed document from `pages`, which must be the public articles
/// in chronological order. Only the last `max_items` of them are included,
/// in the same order.
pub fn build_feed(
    config: &FeedConfig,
    pages: &[&PageArticle],
    max_items: usize,
    now: DateTime<Utc>,
) -> Result<String> {
    let start = pages.len().saturating_sub(max_items);
    let items = pages[start..]
        .iter()
        .map(|page| feed_item(config, page))
        .collect::<Result<Vec<Item>>>()?;

    let self_link = join(config.site_root, FEED_FILE)?;
    let mut atom_link = Link::default();
    atom_link.set_href(self_link.as_str());
    atom_link.set_rel("self");
    atom_link.set_mime_type(Some("application/rss+xml".to_owned()));

    let channel = ChannelBuilder::default()
        .title(config.title)
        .link(config.site_root.as_str())
        .description(config.description)
        .language(LANGUAGE.to_owned())
        .last_build_date(now.format(DATE_FORMAT).to_string())
        .namespaces(namespaces())
        .atom_ext(AtomExtension {
            links: vec![atom_link],
        })
        .items(items)
        .build();
    Ok(channel.to_string())
}

fn namespaces() -> BTreeMap<String, String> {
    let mut namespaces = BTreeMap::new();
    namespaces.insert("content".to_owned(), CONTENT_NAMESPACE.to_owned());
    namespaces.insert("dc".to_owned(), DUBLIN_CORE_NAMESPACE.to_owned());
    namespaces.insert("atom".to_owned(), ATOM_NAMESPACE.to_owned());
    namespaces
}

fn feed_item(config: &FeedConfig, page: &PageArticle) -> Result<Item> {
    let article = page.article;
    let link = join(config.site_root, &to_link(&page.page.location))?;
    // Local media were rewritten relative to the article's directory.
    let parent = link.join("./").map_err(|err| Error::Url {
        link: link.to_string(),
        err,
    })?;

    let pub_date = article
        .date()
        .and_then(|date| date.and_hms_opt(PUBLICATION_HOUR, 0, 0))
        .map(|time| Utc.from_utc_datetime(&time).format(DATE_FORMAT).to_string());

    let mut dublin_core = DublinCoreExtension::default();
    dublin_core.set_creators(vec![article.author().to_owned()]);

    Ok(ItemBuilder::default()
        .title(article.title().to_owned())
        .link(link.to_string())
        .pub_date(pub_date)
        .description(page.summary.clone())
        .guid(
            GuidBuilder::default()
                .permalink(true)
                .value(link.to_string())
                .build(),
        )
        .dublin_core_ext(dublin_core)
        .content(prefix_local_media(&page.content, parent.as_str()))
        .build())
}

fn join(base: &Url, link: &str) -> Result<Url> {
    base.join(link).map_err(|err| Error::Url {
        link: link.to_owned(),
        err,
    })
}

/// The result of building a feed.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building feeds.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when an article link cannot be resolved against the site
    /// root.
    #[error("resolving feed link `{link}`: {err}")]
    Url { link: String, err: url::ParseError },
}
