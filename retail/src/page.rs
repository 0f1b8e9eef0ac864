//! Page fetcher capability.
//!
//! The fetcher is a stateful, exclusively owned resource (a browser session
//! navigates; an HTTP client keeps cookies). It is therefore taken by
//! `&mut` and passed explicitly to whoever scrapes, one page at a time.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::FetchError;

/// How to find an element on a product page.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Locator {
    Id(&'static str),
    Class(&'static str),
    Tag(&'static str),
    Css(&'static str),
    /// First `tag` element whose own text contains `needle`.
    OwnText {
        tag: &'static str,
        needle: &'static str,
    },
}

impl Locator {
    /// CSS selector that narrows the candidates for this locator.
    pub fn css(&self) -> String {
        match self {
            Locator::Id(id) => format!("#{id}"),
            Locator::Class(class) => format!(".{class}"),
            Locator::Tag(tag) | Locator::OwnText { tag, .. } => (*tag).to_string(),
            Locator::Css(css) => (*css).to_string(),
        }
    }
}

/// Snapshot of a located element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    text: String,
    attributes: HashMap<String, String>,
}

impl Element {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Visible text, whitespace-collapsed.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// A fetched product page.
#[async_trait]
pub trait Page: Send + Sync {
    fn url(&self) -> &str;

    /// Resolves once the element is present. Implementations backed by a live
    /// browser may wait; callers bound every call with a timeout.
    async fn find(&self, locator: &Locator) -> Option<Element>;
}

#[async_trait]
pub trait PageFetcher: Send {
    async fn fetch(&mut self, url: &str) -> Result<Box<dyn Page>, FetchError>;
}
