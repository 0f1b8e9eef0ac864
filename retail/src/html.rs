//! Static HTML page backed by the `scraper` crate.
//!
//! The document is parsed once per fetch. With scraper's `atomic` feature
//! `Html` is `Send` but not `Sync`, so it sits behind a mutex that is only
//! held for the synchronous selector walk.

use async_trait::async_trait;
use parking_lot::Mutex;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::page::{Element, Locator, Page};

pub struct HtmlPage {
    url: String,
    doc: Mutex<Html>,
}

impl HtmlPage {
    pub fn new(url: impl Into<String>, body: impl AsRef<str>) -> Self {
        Self {
            url: url.into(),
            doc: Mutex::new(Html::parse_document(body.as_ref())),
        }
    }

    fn select_first(&self, locator: &Locator) -> Option<Element> {
        let css = locator.css();
        let selector = match Selector::parse(&css) {
            Ok(s) => s,
            Err(e) => {
                warn!(selector = %css, error = ?e, "invalid selector");
                return None;
            }
        };

        let doc = self.doc.lock();
        let found = match locator {
            Locator::OwnText { needle, .. } => doc
                .select(&selector)
                .find(|el| own_text(el).contains(needle)),
            _ => doc.select(&selector).next(),
        };

        found.map(to_element)
    }
}

#[async_trait]
impl Page for HtmlPage {
    fn url(&self) -> &str {
        &self.url
    }

    async fn find(&self, locator: &Locator) -> Option<Element> {
        self.select_first(locator)
    }
}

fn own_text(el: &ElementRef<'_>) -> String {
    el.children()
        .filter_map(|child| child.value().as_text())
        .map(|t| &**t)
        .collect()
}

fn to_element(el: ElementRef<'_>) -> Element {
    let raw: String = el.text().collect();
    let visible = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut element = Element::new(visible).with_attribute("textContent", raw);
    for (name, value) in el.value().attrs() {
        element = element.with_attribute(name, value);
    }
    element
}
