use crate::error::MisskeyError;
use crate::instance::Instance;
use crate::models::DriveFile;
use crate::models::FileOrigin;
use crate::models::Meta;
use bytes::Bytes;
use imgsafe_http_client::HttpTransport;
use imgsafe_http_client::Request;
use imgsafe_http_client::Response;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::json;
use tracing::debug;

const LIST_FILES_PATH: &str = "api/admin/drive/files";
const SHOW_FILE_PATH: &str = "api/admin/drive/show-file";
const UPDATE_FILE_PATH: &str = "api/drive/files/update";
const META_PATH: &str = "api/meta";

pub struct MisskeyClient<T: HttpTransport> {
    transport: T,
    instance: Instance,
}

impl<T: HttpTransport> MisskeyClient<T> {
    pub fn new(transport: T, instance: Instance) -> Self {
        Self {
            transport,
            instance,
        }
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Lists locally uploaded files created after `since_id`.
    ///
    /// Misskey returns the oldest `limit` files after the cursor in
    /// ascending id order. Callers should not rely on the page order.
    pub async fn list_files(
        &self,
        limit: u32,
        since_id: Option<&str>,
    ) -> Result<Vec<DriveFile>, MisskeyError> {
        let mut params = json!({
            "limit": limit,
            "origin": FileOrigin::Local,
        });
        if let Some(since_id) = since_id.filter(|id| !id.is_empty()) {
            params["sinceId"] = Value::String(since_id.to_string());
        }

        let resp = self.call(LIST_FILES_PATH, params).await?;
        let files: Vec<DriveFile> = decode(LIST_FILES_PATH, &resp)?;
        debug!(count = files.len(), since_id, "listed drive files");
        Ok(files)
    }

    pub async fn show_file(&self, file_id: &str) -> Result<DriveFile, MisskeyError> {
        let resp = self
            .call(SHOW_FILE_PATH, json!({ "fileId": file_id }))
            .await?;
        decode(SHOW_FILE_PATH, &resp)
    }

    /// Sets the sensitive flag. Misskey answers with the updated file or an
    /// empty 204; either counts as success.
    pub async fn update_sensitive(
        &self,
        file_id: &str,
        is_sensitive: bool,
    ) -> Result<(), MisskeyError> {
        self.call(
            UPDATE_FILE_PATH,
            json!({ "fileId": file_id, "isSensitive": is_sensitive }),
        )
        .await?;
        debug!(file_id, is_sensitive, "updated sensitive flag");
        Ok(())
    }

    pub async fn meta(&self) -> Result<Meta, MisskeyError> {
        let resp = self.call(META_PATH, json!({ "detail": false })).await?;
        decode(META_PATH, &resp)
    }

    /// Fetches raw bytes from a file URL. These URLs may point at an object
    /// store rather than the API host, so no token is attached.
    pub async fn download(&self, url: &str) -> Result<Bytes, MisskeyError> {
        let resp = self.transport.execute(Request::get(url)).await?;
        debug!(bytes = resp.body.len(), "downloaded drive file");
        Ok(resp.body)
    }

    async fn call(&self, path: &str, params: Value) -> Result<Response, MisskeyError> {
        let req = self.instance.build_request(path, params);
        Ok(self.transport.execute(req).await?)
    }
}

fn decode<R: DeserializeOwned>(
    endpoint: &'static str,
    resp: &Response,
) -> Result<R, MisskeyError> {
    resp.decode_json().map_err(|source| MisskeyError::Decode {
        endpoint,
        source,
        body: resp.body_lossy(),
    })
}
