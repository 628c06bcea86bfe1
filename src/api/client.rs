use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;
use regex::Regex;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use super::models::SurfaceOptions;
use super::PageSurface;

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid page URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("no page has been loaded")]
    NotLoaded,

    #[error("page has no title")]
    NoTitle,
}

pub type Result<T> = std::result::Result<T, SurfaceError>;

/// Page surface backed by plain HTTP: navigation fetches the page and the
/// title is read from its `<title>` element.
#[derive(Clone)]
pub struct PageClient {
    client: Client,
    current: Arc<Mutex<Option<url::Url>>>,
}

impl PageClient {
    pub fn new(options: SurfaceOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(options.user_agent)
            .timeout(options.request_timeout)
            .build()?;

        Ok(Self {
            client,
            current: Arc::new(Mutex::new(None)),
        })
    }

    pub fn current_url(&self) -> Option<url::Url> {
        self.current.lock().ok().and_then(|guard| guard.clone())
    }

    async fn fetch(client: &Client, url: url::Url) -> Result<String> {
        let html = client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(html)
    }

    async fn navigate(self, raw: String) -> Result<()> {
        let url = url::Url::parse(&raw)?;
        Self::fetch(&self.client, url.clone()).await?;
        debug!(url = %url, "page loaded");
        if let Ok(mut current) = self.current.lock() {
            *current = Some(url);
        }
        Ok(())
    }

    /// Re-fetches the current page: the title is whatever the server
    /// rendered, never a script-updated one.
    async fn read_title(self) -> Result<String> {
        let url = self.current_url().ok_or(SurfaceError::NotLoaded)?;
        let html = Self::fetch(&self.client, url).await?;
        extract_title(&html).ok_or(SurfaceError::NoTitle)
    }
}

impl PageSurface for PageClient {
    fn load(&self, url: String) -> BoxFuture<'static, Result<()>> {
        self.clone().navigate(url).boxed()
    }

    fn evaluate_title(&self) -> BoxFuture<'static, Result<String>> {
        self.clone().read_title().boxed()
    }
}

/// Text of the first `<title>` element, whitespace collapsed and the common
/// entities decoded.
pub fn extract_title(html: &str) -> Option<String> {
    let re = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok()?;
    let raw = re.captures(html)?.get(1)?.as_str();
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    Some(decode_entities(&collapsed))
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
