use crate::core::{MenuItem, MenuSource};
use crate::utils::error::{Result, WatchError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::instrument;

pub const DEFAULT_MENU_URL: &str = "https://wrzeszcz.1588.pl/takeaway/online-menu/";

#[derive(Debug, Deserialize)]
struct NextData {
    props: NextProps,
}

#[derive(Debug, Deserialize)]
struct NextProps {
    app: AppProps,
}

#[derive(Debug, Deserialize)]
struct AppProps {
    menu: Vec<MenuItem>,
}

/// Menu read from the restaurant's takeaway page.
pub struct MenuPageSource {
    client: Client,
    url: String,
}

impl MenuPageSource {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl MenuSource for MenuPageSource {
    #[instrument(name = "fetch", skip(self), fields(url = %self.url))]
    async fn fetch_menu(&self) -> Result<Vec<MenuItem>> {
        tracing::debug!("Making request to: {}", self.url);
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            tracing::error!(severity = "critical", "Bad URL: '{}'", self.url);
            WatchError::HttpError(e)
        })?;

        tracing::debug!("Menu response status: {}", response.status());
        if !response.status().is_success() {
            return Err(WatchError::FetchStatusError {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }

        let html = response.text().await?;
        extract_menu(&html)
    }
}

/// Pull `props.app.menu` out of the page's `__NEXT_DATA__` script block.
pub fn extract_menu(html: &str) -> Result<Vec<MenuItem>> {
    static NEXT_DATA: OnceLock<Selector> = OnceLock::new();
    let selector = NEXT_DATA.get_or_init(|| {
        Selector::parse("script#__NEXT_DATA__").expect("static selector should parse")
    });

    let document = Html::parse_document(html);
    let script = document
        .select(selector)
        .next()
        .ok_or_else(|| WatchError::menu_parse("page has no __NEXT_DATA__ script"))?;

    let raw: String = script.text().collect();
    let data: NextData = serde_json::from_str(&raw)
        .map_err(|e| WatchError::menu_parse(format!("unexpected __NEXT_DATA__ shape: {}", e)))?;

    Ok(data.props.app.menu)
}

pub fn make_client() -> Result<Client> {
    let client = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
