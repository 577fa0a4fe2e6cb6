//! Replayable request descriptions
//!
//! A request may be sent twice (once more after a token refresh), so bodies
//! are kept as data and only turned into a transport body at dispatch time.

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

use super::ClientError;

/// Extra per-call settings accepted by every request helper
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header, replacing any previous value with the same name
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// One field of a multipart upload
#[derive(Debug, Clone)]
pub enum UploadPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: Option<String>,
        bytes: Bytes,
    },
}

/// Multipart form that can be rebuilt for every dispatch
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    parts: Vec<UploadPart>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(UploadPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Add a file field
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<&str>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(UploadPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime: mime.map(str::to_string),
            bytes: bytes.into(),
        });
        self
    }

    pub fn parts(&self) -> &[UploadPart] {
        &self.parts
    }

    pub(crate) fn to_form(&self) -> Result<Form, ClientError> {
        let mut form = Form::new();
        for part in &self.parts {
            form = match part {
                UploadPart::Text { name, value } => form.text(name.clone(), value.clone()),
                UploadPart::File {
                    name,
                    file_name,
                    mime,
                    bytes,
                } => {
                    let mut file = Part::bytes(bytes.to_vec()).file_name(file_name.clone());
                    if let Some(mime) = mime {
                        file = file.mime_str(mime)?;
                    }
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

/// Request body kinds
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(UploadForm),
}

/// A pending outgoing request
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path relative to the client's base URL, e.g. `/api/orders`
    pub path: String,
    pub options: RequestOptions,
    pub body: RequestBody,
    /// Set once the request has been replayed after a refresh
    pub retried: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            options: RequestOptions::default(),
            body: RequestBody::Empty,
            retried: false,
        }
    }

    /// Attach a JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, payload: &T) -> Result<Self, ClientError> {
        self.body = RequestBody::Json(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Attach a multipart body
    pub fn multipart(mut self, form: UploadForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_defaults() {
        let descriptor = RequestDescriptor::new(Method::GET, "/api/orders");
        assert_eq!(descriptor.path, "/api/orders");
        assert!(!descriptor.retried);
        assert!(matches!(descriptor.body, RequestBody::Empty));
    }

    #[test]
    fn test_json_body_is_captured_as_value() {
        let descriptor = RequestDescriptor::new(Method::POST, "/api/cart")
            .json(&json!({"sku": "A-1", "qty": 2}))
            .unwrap();
        match descriptor.body {
            RequestBody::Json(value) => assert_eq!(value["qty"], 2),
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_upload_form_rebuilds() {
        let form = UploadForm::new()
            .text("alt", "front")
            .file("images", "shoe.png", Some("image/png"), vec![1_u8, 2, 3]);
        assert_eq!(form.parts().len(), 2);
        assert!(form.to_form().is_ok());
        assert!(form.to_form().is_ok());

        let bad = UploadForm::new().file("images", "x", Some("not a mime"), vec![0_u8]);
        assert!(bad.to_form().is_err());
    }
}
