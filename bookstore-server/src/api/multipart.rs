//! Multipart form reading shared by the product and profile endpoints

use std::collections::HashMap;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use http::StatusCode;
use shared::error::{AppError, ErrorCode};

use crate::storage::UploadFile;

/// Text fields and files of one form
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub texts: HashMap<String, String>,
    pub files: HashMap<String, Vec<UploadFile>>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts.get(name).map(String::as_str)
    }

    /// Remove and return the files sent under `name`
    pub fn take_files(&mut self, name: &str) -> Vec<UploadFile> {
        self.files.remove(name).unwrap_or_default()
    }

    /// Remove and return the single file sent under `name`
    pub fn take_file(&mut self, name: &str) -> Option<UploadFile> {
        self.take_files(name).into_iter().next()
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::with_message(ErrorCode::FileTooLarge, "Request body too large");
    }
    AppError::with_message(ErrorCode::InvalidRequest, format!("Multipart error: {e}"))
}

/// Read every field. `file_limits` caps the number of files per field name;
/// file fields not listed are rejected.
pub async fn read_form(
    mut multipart: Multipart,
    file_limits: &[(&str, usize)],
) -> Result<MultipartForm, AppError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let Some(&(_, max)) = file_limits.iter().find(|(n, _)| *n == name) else {
                    return Err(AppError::with_message(
                        ErrorCode::InvalidRequest,
                        format!("Unexpected file field: {name}"),
                    ));
                };
                let data = field.bytes().await.map_err(multipart_error)?;
                // Browsers send an empty part for an untouched file input
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                let files = form.files.entry(name.clone()).or_default();
                if files.len() >= max {
                    return Err(AppError::with_message(
                        ErrorCode::TooManyFiles,
                        format!("Too many files for {name} (max {max})"),
                    ));
                }
                files.push(UploadFile {
                    file_name,
                    data: data.to_vec(),
                });
            }
            None => {
                let value = field.text().await.map_err(multipart_error)?;
                form.texts.insert(name, value);
            }
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::{FromRequest, Request};

    const BOUNDARY: &str = "XBOUNDARYX";

    fn body(parts: &[(&str, Option<&str>, &str)]) -> String {
        let mut out = String::new();
        for (name, file_name, content) in parts {
            out.push_str(&format!("--{BOUNDARY}\r\n"));
            match file_name {
                Some(f) => out.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )),
                None => out.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            out.push_str(content);
            out.push_str("\r\n");
        }
        out.push_str(&format!("--{BOUNDARY}--\r\n"));
        out
    }

    async fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Multipart {
        let request = Request::builder()
            .method("POST")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body(parts)))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_reads_texts_and_files() {
        let mp = multipart(&[
            ("data", None, "{\"name\":\"x\"}"),
            ("coverImageUrl", Some("cover.png"), "PNGDATA"),
            ("productImages", Some("a.png"), "A"),
            ("productImages", Some("b.png"), "B"),
        ])
        .await;
        let mut form = read_form(mp, &[("coverImageUrl", 1), ("productImages", 10)])
            .await
            .unwrap();

        assert_eq!(form.text("data"), Some("{\"name\":\"x\"}"));
        let cover = form.take_file("coverImageUrl").unwrap();
        assert_eq!(cover.file_name, "cover.png");
        assert_eq!(cover.data, b"PNGDATA");
        let gallery = form.take_files("productImages");
        assert_eq!(gallery.len(), 2);
        assert!(form.take_file("coverImageUrl").is_none());
    }

    #[tokio::test]
    async fn test_enforces_file_count() {
        let mp = multipart(&[
            ("coverImageUrl", Some("a.png"), "A"),
            ("coverImageUrl", Some("b.png"), "B"),
        ])
        .await;
        let err = read_form(mp, &[("coverImageUrl", 1)]).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TooManyFiles);
    }

    #[tokio::test]
    async fn test_rejects_unknown_file_field() {
        let mp = multipart(&[("resume", Some("cv.pdf"), "PDF")]).await;
        let err = read_form(mp, &[("avatar", 1)]).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn test_skips_empty_file_inputs() {
        let mp = multipart(&[("avatar", Some(""), "")]).await;
        let form = read_form(mp, &[("avatar", 1)]).await.unwrap();
        assert!(form.files.is_empty());
    }
}
