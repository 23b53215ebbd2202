use reqwest::{Client, Url};
use tracing::debug;

use crate::data_providers::data_provider::DataProvider;
use crate::error::DataProviderError;
use crate::properties::Properties;
use crate::settings::ClientSettings;

/// Fetches the configuration file over HTTP and extracts single keys from it.
///
/// One GET is issued per lookup:
/// `http://{serverAddr}/api/config/file?app={app}&env={env}&version={version}&key={configFile}`.
/// The body is property-file text. Non-2xx answers count as transport failures.
pub struct HttpDataProvider {
    client: Client,
    url: Url,
}

impl HttpDataProvider {
    pub fn new(client: Client, settings: &ClientSettings) -> Result<Self, DataProviderError> {
        Ok(HttpDataProvider {
            client,
            url: file_url(settings)?,
        })
    }

    /// Build a client with the connect and read timeouts from `settings`.
    /// The read timeout bounds the whole request, body included.
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, DataProviderError> {
        let client = Client::builder()
            .connect_timeout(settings.http_connect_timeout())
            .timeout(settings.http_read_timeout())
            .build()?;
        Self::new(client, settings)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Download and parse the whole configuration file.
    pub async fn fetch_file(&self) -> Result<Properties, DataProviderError> {
        let response = self.client.get(self.url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DataProviderError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        Ok(Properties::parse(&body))
    }
}

impl DataProvider for HttpDataProvider {
    async fn load_value(&self, key: &str) -> Result<Option<String>, DataProviderError> {
        debug!(key, url = %self.url, "fetching remote config");
        let value = self.fetch_file().await?.remove(key);
        debug!(key, found = value.is_some(), "remote config fetched");
        Ok(value)
    }
}

fn file_url(settings: &ClientSettings) -> Result<Url, DataProviderError> {
    let base = format!("http://{}/api/config/file", settings.server_addr);
    Url::parse_with_params(
        &base,
        &[
            ("app", settings.app.as_str()),
            ("env", settings.env.as_str()),
            ("version", settings.version.as_str()),
            ("key", settings.config_file.as_str()),
        ],
    )
    .map_err(|err| DataProviderError::InvalidUrl(format!("{base}: {err}")))
}
