//! Thin wrapper around a `fantoccini` WebDriver client with stealth helpers.

use anyhow::{Context, Result};
use cruise_common::{DriverSettings, StealthLevel};
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::collections::HashMap;
use tracing::info;
use url::Url;
use webdriver::capabilities::Capabilities;

use super::host::WebDriverHost;
use super::stealth::{build_stealth_arguments, StealthScripts};

pub struct CruiseDriver {
    client: Client,
    stealth: StealthLevel,
}

impl CruiseDriver {
    /// Connect to a running WebDriver service (Chromedriver by default) with
    /// arguments derived from the stealth level.
    pub async fn connect(settings: &DriverSettings, stealth: StealthLevel) -> Result<Self> {
        let mut caps = Capabilities::new();
        let mut chrome_opts = HashMap::new();

        let mut args = build_stealth_arguments(stealth);
        if settings.headless {
            args.push("--headless".to_string());
            args.push("--disable-gpu".to_string());
        }
        chrome_opts.insert("args".to_string(), json!(args));
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&settings.webdriver_url)
            .await
            .with_context(|| format!("connecting to WebDriver at {}", settings.webdriver_url))?;

        info!(endpoint = %settings.webdriver_url, ?stealth, "browser session opened");
        Ok(Self { client, stealth })
    }

    /// Navigate to `url` and apply the stealth patches for this session.
    pub async fn goto(&self, url: &str) -> Result<()> {
        let url = Url::parse(url).with_context(|| format!("invalid target url: {url}"))?;
        self.client.goto(url.as_str()).await?;
        self.apply_stealth().await?;
        Ok(())
    }

    /// Re-apply the stealth patches in the current top-level document.
    pub async fn apply_stealth(&self) -> Result<()> {
        for script in StealthScripts::for_level(self.stealth) {
            self.client.execute(script, vec![]).await?;
        }
        Ok(())
    }

    /// Hand the session over to the engine as a [`cruise_dom::ContentHost`].
    pub fn into_host(self) -> WebDriverHost {
        WebDriverHost::new(self.client)
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}
