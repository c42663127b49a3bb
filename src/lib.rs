//! The library code for the `quire` static blog generator. The architecture
//! can be generally broken down into two distinct steps:
//!
//! 1. Loading articles from markdown source files on disk ([`crate::article`])
//! 2. Converting the articles into output files on disk ([`crate::build`])
//!
//! Of the two, the second step is the more involved. It is itself composed of
//! three distinct sub-steps:
//!
//! 1. Rendering every article into a page, a teaser and an index snippet
//!    ([`crate::render`])
//! 2. Building the listing pages, the RSS feed and the sitemap
//!    ([`crate::index`], [`crate::feed`], [`crate::sitemap`])
//! 3. Writing every page to disk, skipping files whose content did not change
//!    ([`crate::write`])
//!
//! The second sub-step groups the public articles by category and, optionally,
//! by publication year. Every listing is a header and a footer around the
//! snippets of its articles, newest first.
//!
//! Once generated, the output tree can be mirrored to a publishing
//! destination ([`crate::upload`]).

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod article;
pub mod build;
pub mod category;
pub mod config;
pub mod feed;
pub mod htmlrenderer;
pub mod index;
pub mod markdown;
pub mod page;
pub mod render;
pub mod sitemap;
pub mod summary;
pub mod template;
pub mod upload;
pub mod url;
pub mod util;
pub mod write;
