//! reqwest client for the backend REST API

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::models::{
    ErrorBody, OverlayListResponse, OverlayResponse, StartRequest, StartResponse,
    StatusResponse, StreamInfo, StreamListResponse, WireOverlay,
};
use super::{OverlayBackend, StreamBackend};
use crate::constants::routes;
use crate::error::RemoteError;
use crate::types::Overlay;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    /// `api_base` is the root every route hangs off, e.g. `http://localhost:5000/api`
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let mut base = Url::parse(api_base)
            .map_err(|e| RemoteError::InvalidEndpoint(format!("{api_base}: {e}")))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(RemoteError::InvalidEndpoint(format!(
                "{api_base}: expected an http(s) URL"
            )));
        }
        // Url::join drops the last path segment unless it ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, route: &str) -> Result<Url, RemoteError> {
        self.base
            .join(route)
            .map_err(|e| RemoteError::InvalidEndpoint(format!("{route}: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, route: &str) -> Result<T, RemoteError> {
        let url = self.endpoint(route)?;
        debug!(url = %url, "GET");
        let response = self.client.get(url).send().await.map_err(transport)?;
        read_json(response).await
    }
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Unavailable(err.to_string())
}

/// Map non-2xx answers to [`RemoteError::Rejected`] with the backend's own message
async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.error,
        Err(_) if text.trim().is_empty() => status.to_string(),
        Err(_) => text.trim().to_string(),
    };
    warn!(status = status.as_u16(), message = %message, "Backend rejected request");
    Err(RemoteError::Rejected {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    check_status(response)
        .await?
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Unavailable(format!("unreadable response: {e}")))
}

#[async_trait]
impl StreamBackend for HttpBackend {
    async fn list_streams(&self) -> Result<Vec<StreamInfo>, RemoteError> {
        let body: StreamListResponse = self.get(routes::STREAMS).await?;
        Ok(body.streams)
    }

    async fn start_stream(&self, source_url: &str) -> Result<String, RemoteError> {
        let url = self.endpoint(routes::STREAM_START)?;
        let response = self
            .client
            .post(url)
            .json(&StartRequest {
                rtsp_url: source_url,
            })
            .send()
            .await
            .map_err(transport)?;
        let body: StartResponse = read_json(response).await?;
        if let Some(message) = &body.message {
            debug!(stream_id = %body.stream_id, message = %message, "Backend accepted start");
        }
        Ok(body.stream_id)
    }

    async fn stream_status(&self, stream_id: &str) -> Result<bool, RemoteError> {
        let body: StatusResponse = self.get(&routes::stream_status(stream_id)).await?;
        Ok(body.playlist_ready)
    }

    async fn stop_stream(&self, stream_id: &str) -> Result<(), RemoteError> {
        let url = self.endpoint(&routes::stream_stop(stream_id))?;
        let response = self.client.post(url).send().await.map_err(transport)?;
        check_status(response).await?;
        Ok(())
    }

    fn manifest_url(&self, stream_id: &str) -> String {
        let route = routes::stream_playlist(stream_id);
        match self.base.join(&route) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{route}", self.base),
        }
    }
}

#[async_trait]
impl OverlayBackend for HttpBackend {
    async fn list_overlays(&self) -> Result<Vec<Overlay>, RemoteError> {
        let body: OverlayListResponse = self.get(routes::OVERLAYS).await?;
        Ok(body
            .overlays
            .into_iter()
            .filter_map(WireOverlay::into_overlay)
            .collect())
    }

    async fn create_overlay(&self, overlay: &Overlay) -> Result<String, RemoteError> {
        let url = self.endpoint(routes::OVERLAYS)?;
        let response = self
            .client
            .post(url)
            .json(&WireOverlay::from_overlay(overlay, None))
            .send()
            .await
            .map_err(transport)?;
        let body: OverlayResponse = read_json(response).await?;
        body.overlay
            .and_then(|stored| stored.id)
            .ok_or_else(|| RemoteError::Unavailable("create response carried no overlay id".to_string()))
    }

    async fn update_overlay(
        &self,
        remote_key: &str,
        overlay: &Overlay,
    ) -> Result<Option<Overlay>, RemoteError> {
        let url = self.endpoint(&routes::overlay(remote_key))?;
        let response = self
            .client
            .put(url)
            .json(&WireOverlay::from_overlay(overlay, None))
            .send()
            .await
            .map_err(transport)?;
        let body: OverlayResponse = read_json(response).await?;
        Ok(body.overlay.and_then(WireOverlay::into_overlay))
    }

    async fn delete_overlay(&self, remote_key: &str) -> Result<(), RemoteError> {
        let url = self.endpoint(&routes::overlay(remote_key))?;
        let response = self.client.delete(url).send().await.map_err(transport)?;
        check_status(response).await?;
        Ok(())
    }
}
