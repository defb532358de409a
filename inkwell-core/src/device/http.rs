//! HTTP implementation of [`DeviceClient`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::client::DeviceClient;
use super::error::DeviceClientError;
use super::types::{DeviceRecord, DeviceUpdate, ModelRecord, NewScreen, ScreenRecord};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`HttpDeviceClient`]
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL, e.g. `https://display.example.com`
    pub base_url: String,
    /// Bearer token
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

/// REST client for the device registry
pub struct HttpDeviceClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

/// Registries either wrap payloads in `{"data": ...}` or return them bare
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(inner) => inner,
        }
    }
}

#[derive(Serialize)]
struct PlaylistItem<'a> {
    screen_id: &'a str,
}

impl HttpDeviceClient {
    /// Build a client; the timeout applies to every request
    pub fn new(config: HttpClientConfig) -> Result<Self, DeviceClientError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        kind: &'static str,
        id: &str,
    ) -> Result<Response, DeviceClientError> {
        let response = self
            .authorized(request.header(reqwest::header::ACCEPT, "application/json"))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DeviceClientError::NotFound {
                kind,
                id: id.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeviceClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DeviceClientError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice::<Envelope<T>>(&bytes)
            .map(Envelope::into_inner)
            .map_err(|e| DeviceClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DeviceClient for HttpDeviceClient {
    async fn get_device(&self, id: &str) -> Result<DeviceRecord, DeviceClientError> {
        let request = self.client.get(self.url(&format!("devices/{id}")));
        Self::decode(self.send(request, "device", id).await?).await
    }

    async fn update_device(
        &self,
        id: &str,
        update: DeviceUpdate,
    ) -> Result<(), DeviceClientError> {
        let request = self
            .client
            .patch(self.url(&format!("devices/{id}")))
            .json(&update);
        self.send(request, "device", id).await?;
        Ok(())
    }

    async fn get_model(&self, id: &str) -> Result<ModelRecord, DeviceClientError> {
        let request = self.client.get(self.url(&format!("models/{id}")));
        Self::decode(self.send(request, "model", id).await?).await
    }

    async fn get_screens(&self) -> Result<Vec<ScreenRecord>, DeviceClientError> {
        let request = self.client.get(self.url("screens"));
        Self::decode(self.send(request, "screen", "*").await?).await
    }

    async fn add_screen(&self, screen: NewScreen) -> Result<String, DeviceClientError> {
        let name = screen.name.clone();
        let request = self.client.post(self.url("screens")).json(&screen);
        let created: ScreenRecord = Self::decode(self.send(request, "screen", &name).await?).await?;
        Ok(created.id)
    }

    async fn remove_screen(&self, id: &str) -> Result<(), DeviceClientError> {
        let request = self.client.delete(self.url(&format!("screens/{id}")));
        self.send(request, "screen", id).await?;
        Ok(())
    }

    async fn add_screen_to_playlist(
        &self,
        playlist_id: &str,
        screen_id: &str,
    ) -> Result<(), DeviceClientError> {
        let request = self
            .client
            .post(self.url(&format!("playlists/{playlist_id}/items")))
            .json(&PlaylistItem { screen_id });
        self.send(request, "playlist", playlist_id).await?;
        Ok(())
    }
}
