use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use syncd_core::{DriveItem, ListItemFields, SourceClient, SyncError};
use tracing::warn;

/// Live `SourceClient` backed by the Source's REST API. The exact wire
/// dialect (Graph-style paging, auth headers, resource URLs) is an external
/// collaborator per spec §1/§6 — this adapter covers just the four
/// operations C6 needs, translating the Source's own "resync required"
/// signal into `SyncError::CursorExpired`.
pub struct HttpSourceClient {
    http: Client,
    base_url: String,
    bearer_token: String,
}

impl HttpSourceClient {
    pub fn new(base_url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client builder should not fail with default TLS config");
        Self {
            http,
            base_url: base_url.into(),
            bearer_token: bearer_token.into(),
        }
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.bearer_token)
    }
}

#[derive(Debug, Deserialize)]
struct DeltaResponse {
    #[serde(rename = "@odata.deltaLink")]
    delta_link: Option<String>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
    value: Vec<DeltaEntry>,
}

#[derive(Debug, Deserialize)]
struct DeltaEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ListItemResponse {
    fields: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct DriveItemResponse {
    id: String,
    name: String,
    #[serde(rename = "parentReference")]
    parent_reference: ParentReference,
}

#[derive(Debug, Deserialize)]
struct ParentReference {
    path: String,
    #[serde(rename = "driveId")]
    drive_id: String,
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    async fn pull_items_delta(
        &self,
        site_id: &str,
        list_id: &str,
        cursor: &str,
    ) -> Result<(String, Vec<String>), SyncError> {
        let url = if cursor.is_empty() {
            format!("{}/sites/{site_id}/lists/{list_id}/items/delta", self.base_url)
        } else {
            cursor.to_string()
        };

        let resp = self
            .authed(self.http.get(&url))
            .send()
            .await
            .map_err(|e| SyncError::SourceUnavailable(e.to_string()))?;

        if resp.status() == StatusCode::GONE {
            return Err(SyncError::CursorExpired);
        }
        if !resp.status().is_success() {
            return Err(SyncError::SourceUnavailable(format!(
                "delta pull failed with status {}",
                resp.status()
            )));
        }

        let body: DeltaResponse = resp
            .json()
            .await
            .map_err(|e| SyncError::SourceUnavailable(format!("decoding delta response: {e}")))?;

        let ids = body.value.into_iter().map(|e| e.id).collect();
        let new_cursor = body
            .delta_link
            .or(body.next_link)
            .unwrap_or_default();
        Ok((new_cursor, ids))
    }

    async fn pull_items_modified_since(
        &self,
        site_id: &str,
        list_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>, SyncError> {
        let url = format!("{}/sites/{site_id}/lists/{list_id}/items", self.base_url);
        let resp = self
            .authed(
                self.http
                    .get(&url)
                    .query(&[("$filter", format!("lastModifiedDateTime ge {}", since.to_rfc3339()))]),
            )
            .send()
            .await
            .map_err(|e| SyncError::SourceUnavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SyncError::SourceUnavailable(format!(
                "windowed pull failed with status {}",
                resp.status()
            )));
        }

        let body: DeltaResponse = resp
            .json()
            .await
            .map_err(|e| SyncError::SourceUnavailable(format!("decoding windowed response: {e}")))?;
        Ok(body.value.into_iter().map(|e| e.id).collect())
    }

    async fn get_list_item(
        &self,
        site_id: &str,
        list_id: &str,
        item_id: &str,
    ) -> Result<ListItemFields, SyncError> {
        let url = format!("{}/sites/{site_id}/lists/{list_id}/items/{item_id}", self.base_url);
        let body: ListItemResponse = self
            .authed(self.http.get(&url))
            .send()
            .await
            .map_err(|e| SyncError::SourceUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| SyncError::SourceUnavailable(format!("decoding list item: {e}")))?;

        let process_flag = body
            .fields
            .get("ProcessFlag")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(ListItemFields { process_flag })
    }

    async fn get_drive_item(
        &self,
        site_id: &str,
        list_id: &str,
        item_id: &str,
    ) -> Result<DriveItem, SyncError> {
        let url = format!(
            "{}/sites/{site_id}/lists/{list_id}/items/{item_id}/driveItem",
            self.base_url
        );
        let body: DriveItemResponse = self
            .authed(self.http.get(&url))
            .send()
            .await
            .map_err(|e| SyncError::SourceUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| SyncError::SourceUnavailable(format!("decoding drive item: {e}")))?;

        Ok(DriveItem {
            id: body.id,
            name: body.name,
            parent_path: body.parent_reference.path,
            drive_id: body.parent_reference.drive_id,
        })
    }

    async fn download(&self, drive_id: &str, item_id: &str) -> Result<Vec<u8>, SyncError> {
        let url = format!("{}/drives/{drive_id}/items/{item_id}/content", self.base_url);
        let resp = self
            .authed(self.http.get(&url))
            .send()
            .await
            .map_err(|e| SyncError::SourceUnavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SyncError::SourceUnavailable(format!(
                "download failed with status {}",
                resp.status()
            )));
        }

        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| SyncError::SourceUnavailable(format!("reading download body: {e}")))
    }

    async fn probe(&self) -> Result<(), SyncError> {
        let url = format!("{}/ping", self.base_url);
        match self.authed(self.http.get(&url)).send().await {
            Ok(resp) if resp.status().is_success() || resp.status() == StatusCode::NOT_FOUND => Ok(()),
            Ok(resp) => Err(SyncError::SourceUnavailable(format!(
                "probe returned status {}",
                resp.status()
            ))),
            Err(e) => {
                warn!(error = %e, "source connectivity probe failed");
                Err(SyncError::SourceUnavailable(e.to_string()))
            }
        }
    }
}

