//! Prediction service client.
//!
//! The service takes one multipart upload per call at
//! `POST {base-url}/predictVideo` or `POST {base-url}/predictImage`, with the
//! raw file in a field named `video` or `image`, and replies with a JSON
//! object whose `result` field carries the verdict.
//!
//! # Example
//!
//! ```no_run
//! use deepcheck::{ClientOptions, MediaKind, PredictionClient, PredictionRequest, Predictor};
//!
//! # async fn example() -> Result<(), deepcheck::DeepcheckError> {
//! let client = PredictionClient::new(&ClientOptions::default())?;
//! let bytes = std::fs::read("face.jpg")?;
//! let request = PredictionRequest::new(MediaKind::Image, "face.jpg", bytes);
//! let verdict = client.predict(request).await?;
//! println!("{verdict}");
//! # Ok(())
//! # }
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    future::Future,
    sync::Arc,
};

use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Serialize;
use serde_json::Value;

use crate::{configuration::ClientOptions, error::DeepcheckError, media::MediaKind};

/// Verdict returned by the prediction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PredictionResult {
    /// The face looks authentic.
    Real,
    /// The face looks manipulated.
    Fake,
    /// The service found no face to judge.
    NoFaceDetected,
}

impl PredictionResult {
    /// Map a decoded response body.
    ///
    /// `result == 0` is [`Real`](PredictionResult::Real), `result == 1` is
    /// [`Fake`](PredictionResult::Fake); any other value, a non-numeric
    /// value, or no `result` field at all is
    /// [`NoFaceDetected`](PredictionResult::NoFaceDetected).
    pub fn from_response(body: &Value) -> Self {
        match body.get("result").and_then(Value::as_f64) {
            Some(code) if code == 0.0 => PredictionResult::Real,
            Some(code) if code == 1.0 => PredictionResult::Fake,
            _ => PredictionResult::NoFaceDetected,
        }
    }

    /// Parse and map a raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`DeepcheckError::InvalidResponse`] if the body is not JSON.
    pub fn from_body(body: &str) -> Result<Self, DeepcheckError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|error| DeepcheckError::InvalidResponse(format!("{error}: {body}")))?;
        Ok(Self::from_response(&value))
    }

    /// Human-readable verdict.
    pub fn label(self) -> &'static str {
        match self {
            PredictionResult::Real => "Real",
            PredictionResult::Fake => "Fake",
            PredictionResult::NoFaceDetected => "No Face Detected",
        }
    }
}

impl Display for PredictionResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.label())
    }
}

/// One upload to the prediction service.
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    /// Selects the endpoint and the multipart field name.
    pub kind: MediaKind,
    /// File name sent with the multipart part.
    pub file_name: String,
    /// Raw file contents.
    pub bytes: Arc<[u8]>,
}

impl PredictionRequest {
    /// Build a request from owned parts.
    pub fn new(kind: MediaKind, file_name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            kind,
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Anything that can turn an upload into a verdict.
pub trait Predictor: Send + Sync {
    /// Upload `request` once and map the reply. No retries.
    fn predict(
        &self,
        request: PredictionRequest,
    ) -> impl Future<Output = Result<PredictionResult, DeepcheckError>> + Send;
}

/// HTTP client for the prediction service.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    base_url: String,
    http: Client,
}

impl PredictionClient {
    /// Create a client for the service described by `options`.
    ///
    /// # Errors
    ///
    /// Returns [`DeepcheckError::PredictionTransport`] if the HTTP client
    /// cannot be built (for example, no TLS backend).
    pub fn new(options: &ClientOptions) -> Result<Self, DeepcheckError> {
        let http = Client::builder().timeout(options.timeout()).build()?;

        Ok(Self {
            base_url: options.base_url().to_string(),
            http,
        })
    }

    /// Full URL of the endpoint for `kind`.
    pub fn endpoint_url(&self, kind: MediaKind) -> String {
        format!("{}/{}", self.base_url, kind.endpoint())
    }

    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Predictor for PredictionClient {
    async fn predict(&self, request: PredictionRequest) -> Result<PredictionResult, DeepcheckError> {
        let url = self.endpoint_url(request.kind);
        log::debug!(
            "Uploading {} ({} bytes) to {url}",
            request.file_name,
            request.bytes.len()
        );

        let part = Part::bytes(request.bytes.to_vec()).file_name(request.file_name);
        let form = Form::new().part(request.kind.field_name(), part);

        let response = self.http.post(&url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DeepcheckError::UnexpectedStatus { status, body });
        }

        PredictionResult::from_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn result_codes_map_to_verdicts() {
        assert_eq!(PredictionResult::from_response(&json!({ "result": 0 })), PredictionResult::Real);
        assert_eq!(PredictionResult::from_response(&json!({ "result": 1 })), PredictionResult::Fake);
        assert_eq!(
            PredictionResult::from_response(&json!({ "result": 2 })),
            PredictionResult::NoFaceDetected
        );
        assert_eq!(PredictionResult::from_response(&json!({})), PredictionResult::NoFaceDetected);
    }

    #[test]
    fn non_numeric_codes_mean_no_face() {
        assert_eq!(
            PredictionResult::from_response(&json!({ "result": "1" })),
            PredictionResult::NoFaceDetected
        );
        assert_eq!(
            PredictionResult::from_response(&json!({ "result": null })),
            PredictionResult::NoFaceDetected
        );
        assert_eq!(PredictionResult::from_response(&json!([1])), PredictionResult::NoFaceDetected);
    }

    #[test]
    fn malformed_body_is_invalid_response() {
        assert!(matches!(
            PredictionResult::from_body("<html>"),
            Err(DeepcheckError::InvalidResponse(_))
        ));
        assert_eq!(
            PredictionResult::from_body(r#"{"result": 1.0, "confidence": 0.93}"#).unwrap(),
            PredictionResult::Fake
        );
    }

    #[test]
    fn endpoint_follows_kind() {
        let client = PredictionClient::new(&ClientOptions::new("http://localhost:8000/")).unwrap();
        assert_eq!(client.endpoint_url(MediaKind::Video), "http://localhost:8000/predictVideo");
        assert_eq!(client.endpoint_url(MediaKind::Image), "http://localhost:8000/predictImage");
    }
}
