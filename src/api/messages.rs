// Image message upload

use log::info;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};

#[derive(Deserialize)]
struct UploadBody {
    #[serde(default)]
    success: bool,
}

/// Best-effort MIME type from a file extension.
pub fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

impl ApiClient {
    /// Multipart `POST /api/messages/image` with `image` and `recipient_id`.
    /// The server must answer `{"success": true}`.
    pub async fn upload_image(&self, recipient_id: &str, file_name: &str, bytes: Vec<u8>) -> ClientResult<()> {
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(image_mime(Path::new(file_name)))?;
        let form = Form::new()
            .part("image", part)
            .text("recipient_id", recipient_id.to_string());

        let url = self.endpoint("/api/messages/image")?;
        let resp = self.http.post(url).multipart(form).send().await?;
        let body: UploadBody = Self::check(resp).await?.json().await?;
        if !body.success {
            return Err(ClientError::UnexpectedResponse("upload not acknowledged".to_string()));
        }
        info!("Uploaded image {} ({} bytes) for {}", file_name, size, recipient_id);
        Ok(())
    }
}
