//! Google Drive API service (v3)

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::{json, Value};

use crate::envelope::{wrap, Envelope};
use crate::error::Result;
use crate::google::api::GoogleApi;
use crate::google::types::*;

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Google-native documents have no bytes of their own and must be exported
const GOOGLE_APPS_PREFIX: &str = "application/vnd.google-apps.";

const FILE_FIELDS: &str = "id, name, mimeType, size, createdTime";

pub struct DriveService {
    api: GoogleApi,
}

impl DriveService {
    pub fn new(api: GoogleApi) -> Self {
        Self { api }
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.api.endpoints().drive)
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/{}", self.files_url(), urlencoding::encode(file_id))
    }

    fn upload_url(&self) -> String {
        format!("{}/files", self.api.endpoints().drive_upload)
    }

    /// Search with Drive query syntax
    pub async fn search_drive_files(&self, query: &str, max_results: u32) -> Envelope<SearchFilesResult> {
        let request = self.api.request(Method::GET, &self.files_url()).query(&[
            ("q", query.to_string()),
            ("pageSize", max_results.to_string()),
            (
                "fields",
                "files(id, name, mimeType, size, createdTime, modifiedTime)".to_string(),
            ),
        ]);
        let result = self
            .api
            .json::<FileList>(request)
            .await
            .map(|list| SearchFilesResult { files: list.files });
        wrap(result, "Drive search failed")
    }

    /// Text content of a file, when it has any
    pub async fn get_file_content(&self, file_id: &str) -> Envelope<FileContentResult> {
        wrap(self.try_get_file_content(file_id).await, "Failed to get file content")
    }

    async fn try_get_file_content(&self, file_id: &str) -> Result<FileContentResult> {
        let request = self
            .api
            .request(Method::GET, &self.file_url(file_id))
            .query(&[("fields", "id, name, mimeType, size")]);
        let file: FileMetadata = self.api.json(request).await?;

        if !is_text_like(&file.mime_type) {
            return Ok(FileContentResult {
                file,
                content: None,
                message: Some("File content not readable (binary or unsupported type)".to_string()),
            });
        }

        let request = if file.mime_type.starts_with(GOOGLE_APPS_PREFIX) {
            let url = format!("{}/export", self.file_url(file_id));
            self.api
                .request(Method::GET, &url)
                .query(&[("mimeType", "text/plain")])
        } else {
            self.api
                .request(Method::GET, &self.file_url(file_id))
                .query(&[("alt", "media")])
        };
        let content = self.api.text(request).await?;

        Ok(FileContentResult {
            file,
            content: Some(content),
            message: None,
        })
    }

    /// Create a file with content in one multipart upload
    pub async fn create_file(
        &self,
        name: &str,
        content: &str,
        mime_type: &str,
        parent_id: Option<&str>,
    ) -> Envelope<FileResult> {
        let mut metadata = json!({ "name": name });
        if let Some(parent_id) = parent_id {
            metadata["parents"] = json!([parent_id]);
        }

        let boundary = format!("workspace_mcp_{}", chrono::Utc::now().timestamp_millis());
        let body = multipart_related(&boundary, &metadata, mime_type, content);

        let request = self
            .api
            .request(Method::POST, &self.upload_url())
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body);

        let result = self
            .api
            .json::<Value>(request)
            .await
            .map(|file| file_result(file, "File created successfully"));
        wrap(result, "Failed to create file")
    }

    /// Replace a file's content
    pub async fn update_file(&self, file_id: &str, content: &str, mime_type: &str) -> Envelope<FileResult> {
        let url = format!("{}/{}", self.upload_url(), urlencoding::encode(file_id));
        let request = self
            .api
            .request(Method::PATCH, &url)
            .query(&[
                ("uploadType", "media"),
                ("fields", "id, name, mimeType, size, modifiedTime"),
            ])
            .header(CONTENT_TYPE, mime_type)
            .body(content.to_string());

        let result = self
            .api
            .json::<Value>(request)
            .await
            .map(|file| file_result(file, "File updated successfully"));
        wrap(result, "Failed to update file")
    }

    pub async fn delete_file(&self, file_id: &str) -> Envelope<DeleteFileResult> {
        let result = self
            .api
            .send(self.api.request(Method::DELETE, &self.file_url(file_id)))
            .await
            .map(|()| DeleteFileResult {
                file_id: file_id.to_string(),
                message: "File deleted successfully".to_string(),
            });
        wrap(result, "Failed to delete file")
    }

    pub async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Envelope<FolderResult> {
        let mut metadata = json!({ "name": name, "mimeType": FOLDER_MIME_TYPE });
        if let Some(parent_id) = parent_id {
            metadata["parents"] = json!([parent_id]);
        }

        let request = self
            .api
            .request(Method::POST, &self.files_url())
            .query(&[("fields", "id, name, mimeType, createdTime")])
            .json(&metadata);

        let result = self
            .api
            .json::<Value>(request)
            .await
            .map(|folder| FolderResult {
                folder,
                message: "Folder created successfully".to_string(),
            });
        wrap(result, "Failed to create folder")
    }

    pub async fn copy_file(&self, file_id: &str, name: &str, parent_id: Option<&str>) -> Envelope<FileResult> {
        let mut metadata = json!({ "name": name });
        if let Some(parent_id) = parent_id {
            metadata["parents"] = json!([parent_id]);
        }

        let url = format!("{}/copy", self.file_url(file_id));
        let request = self
            .api
            .request(Method::POST, &url)
            .query(&[("fields", FILE_FIELDS)])
            .json(&metadata);

        let result = self
            .api
            .json::<Value>(request)
            .await
            .map(|file| file_result(file, "File copied successfully"));
        wrap(result, "Failed to copy file")
    }

    /// Add `new_parent_id` as a parent, optionally detaching `remove_parents`
    pub async fn move_file(
        &self,
        file_id: &str,
        new_parent_id: &str,
        remove_parents: Option<&str>,
    ) -> Envelope<FileResult> {
        let mut query = vec![("addParents", new_parent_id), ("fields", "id, name, parents")];
        if let Some(remove_parents) = remove_parents {
            query.push(("removeParents", remove_parents));
        }

        let request = self
            .api
            .request(Method::PATCH, &self.file_url(file_id))
            .query(&query)
            .json(&json!({}));

        let result = self
            .api
            .json::<Value>(request)
            .await
            .map(|file| file_result(file, "File moved successfully"));
        wrap(result, "Failed to move file")
    }

    pub async fn share_file(
        &self,
        file_id: &str,
        email: &str,
        role: &str,
        permission_type: &str,
    ) -> Envelope<ShareFileResult> {
        let url = format!("{}/permissions", self.file_url(file_id));
        let request = self.api.request(Method::POST, &url).json(&json!({
            "role": role,
            "type": permission_type,
            "emailAddress": email,
        }));

        let result = self
            .api
            .json::<Value>(request)
            .await
            .map(|permission| ShareFileResult {
                permission,
                message: format!("File shared with {}", email),
            });
        wrap(result, "Failed to share file")
    }

    pub async fn get_file_permissions(&self, file_id: &str) -> Envelope<PermissionsResult> {
        let url = format!("{}/permissions", self.file_url(file_id));
        let request = self
            .api
            .request(Method::GET, &url)
            .query(&[("fields", "permissions(id, emailAddress, role, type)")]);

        let result = self
            .api
            .json::<PermissionList>(request)
            .await
            .map(|list| PermissionsResult {
                permissions: list.permissions,
            });
        wrap(result, "Failed to get file permissions")
    }
}

fn is_text_like(mime_type: &str) -> bool {
    mime_type.contains("text") || mime_type.contains("document")
}

fn file_result(file: Value, message: &str) -> FileResult {
    FileResult {
        file,
        message: message.to_string(),
    }
}

/// `multipart/related` body: JSON metadata part, then the media part
fn multipart_related(boundary: &str, metadata: &Value, mime_type: &str, content: &str) -> String {
    format!(
        "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n--{b}\r\nContent-Type: {mime}\r\n\r\n{content}\r\n--{b}--\r\n",
        b = boundary,
        meta = metadata,
        mime = mime_type,
        content = content,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_like_mime_types() {
        assert!(is_text_like("text/plain"));
        assert!(is_text_like("application/vnd.google-apps.document"));
        assert!(is_text_like(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        ));
        assert!(!is_text_like("image/png"));
        assert!(!is_text_like("application/vnd.google-apps.spreadsheet"));
    }

    #[test]
    fn test_multipart_related_layout() {
        let body = multipart_related("XYZ", &json!({"name": "a.txt"}), "text/plain", "hello");
        let parts: Vec<&str> = body.split("--XYZ").collect();

        assert_eq!(parts.len(), 4);
        assert!(parts[1].contains(r#"{"name":"a.txt"}"#));
        assert!(parts[2].starts_with("\r\nContent-Type: text/plain\r\n\r\nhello"));
        assert_eq!(parts[3], "--\r\n");
    }
}
