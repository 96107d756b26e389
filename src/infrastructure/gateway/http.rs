//! HTTP backend gateway adapter

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ports::{BackendGateway, GatewayError};
use crate::domain::capture::CapturedImage;
use crate::domain::matching::{EmailPreview, ExtractionResult, ResultStatus, Subscriber};

const PROCESS_IMAGE_PATH: &str = "/process-image";
const MANUAL_ENTRY_PATH: &str = "/manual-entry";
const PREVIEW_EMAIL_PATH: &str = "/preview-email";
const SEND_EMAIL_PATH: &str = "/send-email";

// Request bodies

#[derive(Debug, Serialize)]
struct ImageRequest {
    image: String,
}

#[derive(Debug, Serialize)]
struct ManualEntryRequest<'a> {
    address: &'a str,
}

#[derive(Debug, Serialize)]
struct PreviewRequest<'a> {
    subscriber: &'a Subscriber,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    subscriber: &'a Subscriber,
    extracted_address: &'a str,
}

// Response bodies

/// Shared shape of recognition and dispatch responses.
///
/// Failures come back as HTTP 4xx/5xx with only `error` set.
#[derive(Debug, Deserialize)]
struct ResultBody {
    status: Option<ResultStatus>,
    extracted_address: Option<String>,
    provided_address: Option<String>,
    subscriber: Option<Subscriber>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PreviewBody {
    email_html: Option<String>,
    error: Option<String>,
}

impl ResultBody {
    fn into_result(self) -> Result<ExtractionResult, GatewayError> {
        let status = match (self.status, &self.error) {
            (Some(status), _) => status,
            (None, Some(_)) => ResultStatus::Error,
            (None, None) => {
                return Err(GatewayError::ParseError(
                    "response has neither status nor error".to_string(),
                ))
            }
        };

        Ok(ExtractionResult {
            status,
            extracted_address: self.extracted_address,
            provided_address: self.provided_address,
            subscriber: self.subscriber,
            error: self.error,
        })
    }
}

impl PreviewBody {
    fn into_preview(self) -> Result<EmailPreview, GatewayError> {
        match (self.email_html, self.error) {
            (Some(html), _) => Ok(EmailPreview::new(html)),
            (None, Some(error)) => Err(GatewayError::ServerError(error)),
            (None, None) => Err(GatewayError::ParseError(
                "response has no email_html".to_string(),
            )),
        }
    }
}

/// Gateway speaking JSON over HTTP to the recognition backend
pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    /// Create a gateway for the backend at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a gateway with a preconfigured client
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body and decode the reply.
    ///
    /// The body is decoded whatever the HTTP status, since error replies
    /// carry their message in JSON.
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!(%url, "POST");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;
        debug!(%url, %status, bytes = text.len(), "response received");

        serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                GatewayError::ParseError(e.to_string())
            } else {
                GatewayError::ServerError(format!("HTTP {}: {}", status, text.trim()))
            }
        })
    }
}

#[async_trait]
impl BackendGateway for HttpGateway {
    async fn recognize_image(
        &self,
        image: &CapturedImage,
    ) -> Result<ExtractionResult, GatewayError> {
        let body = ImageRequest {
            image: image.to_data_url(),
        };
        self.post::<_, ResultBody>(PROCESS_IMAGE_PATH, &body)
            .await?
            .into_result()
    }

    async fn recognize_text(&self, address: &str) -> Result<ExtractionResult, GatewayError> {
        self.post::<_, ResultBody>(MANUAL_ENTRY_PATH, &ManualEntryRequest { address })
            .await?
            .into_result()
    }

    async fn preview_email(&self, subscriber: &Subscriber) -> Result<EmailPreview, GatewayError> {
        self.post::<_, PreviewBody>(PREVIEW_EMAIL_PATH, &PreviewRequest { subscriber })
            .await?
            .into_preview()
    }

    async fn send_email(
        &self,
        subscriber: &Subscriber,
        extracted_address: &str,
    ) -> Result<ExtractionResult, GatewayError> {
        let body = SendRequest {
            subscriber,
            extracted_address,
        };
        self.post::<_, ResultBody>(SEND_EMAIL_PATH, &body)
            .await?
            .into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<ExtractionResult, GatewayError> {
        serde_json::from_str::<ResultBody>(json).unwrap().into_result()
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let gateway = HttpGateway::new("http://localhost:5000/");
        assert_eq!(gateway.base_url(), "http://localhost:5000");
        assert_eq!(
            gateway.endpoint(PROCESS_IMAGE_PATH),
            "http://localhost:5000/process-image"
        );
    }

    #[test]
    fn match_found_body() {
        let result = parse(
            r#"{"status":"match_found","extracted_address":"123 Main St",
                "subscriber":{"name":"Alice","email":"a@x.com","address":"123 Main St","id":7},
                "message":"ignored"}"#,
        )
        .unwrap();

        assert_eq!(result.status, ResultStatus::MatchFound);
        assert_eq!(result.extracted_address.as_deref(), Some("123 Main St"));
        assert_eq!(result.subscriber.unwrap().name.as_deref(), Some("Alice"));
    }

    #[test]
    fn error_without_status_maps_to_error() {
        let result = parse(r#"{"error":"Could not fetch subscriber data"}"#).unwrap();
        assert_eq!(result.status, ResultStatus::Error);
        assert_eq!(result.error.as_deref(), Some("Could not fetch subscriber data"));
    }

    #[test]
    fn null_fields_are_absent() {
        let result = parse(r#"{"status":"not_found","extracted_address":null}"#).unwrap();
        assert_eq!(result.status, ResultStatus::NotFound);
        assert!(result.extracted_address.is_none());
    }

    #[test]
    fn empty_body_is_parse_error() {
        assert!(matches!(parse("{}"), Err(GatewayError::ParseError(_))));
    }

    #[test]
    fn preview_body() {
        let body: PreviewBody =
            serde_json::from_str(r#"{"status":"success","email_html":"<p>Hi</p>"}"#).unwrap();
        assert_eq!(body.into_preview().unwrap().html(), "<p>Hi</p>");

        let body: PreviewBody = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert!(matches!(body.into_preview(), Err(GatewayError::ServerError(_))));
    }

    #[test]
    fn send_request_shape() {
        let subscriber = Subscriber {
            name: Some("Alice".to_string()),
            email: None,
            address: None,
        };
        let body = serde_json::to_value(SendRequest {
            subscriber: &subscriber,
            extracted_address: "123 Main St",
        })
        .unwrap();

        assert_eq!(body["subscriber"]["name"], "Alice");
        assert_eq!(body["extracted_address"], "123 Main St");
    }
}
