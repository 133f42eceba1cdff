use async_trait::async_trait;

use super::{TransferError, UploadTransport};
use crate::domain::settings::UploaderSettings;

/// Pinata 互換エンドポイントへの multipart アップロード
pub struct PinataTransport {
    client: reqwest::Client,
    endpoint: String,
    network: String,
}

impl PinataTransport {
    pub fn new(settings: &UploaderSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(settings.request_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: settings.endpoint_url.clone(),
            network: settings.network.clone(),
        }
    }
}

#[async_trait]
impl UploadTransport for PinataTransport {
    async fn upload(
        &self,
        file_name: &str,
        data: Vec<u8>,
        credential: &str,
    ) -> Result<serde_json::Value, TransferError> {
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(data).file_name(file_name.to_string()),
            )
            .text("network", self.network.clone());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(credential)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransferError::Timeout
                } else {
                    TransferError::Network(format!("HTTP request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            // 例: "500 Internal Server Error"
            return Err(TransferError::Rejected(response.status().to_string()));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| TransferError::InvalidResponse(format!("Response parse error: {e}")))
    }

    fn name(&self) -> &str {
        "pinata"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> UploaderSettings {
        UploaderSettings {
            endpoint_url: format!("{}/v3/files", server.uri()),
            request_timeout_secs: 5,
            ..UploaderSettings::default()
        }
    }

    #[tokio::test]
    async fn test_upload_success_returns_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/files"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "cid": "abc" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = PinataTransport::new(&settings_for(&server));
        let result = transport
            .upload("hello.txt", b"hello".to_vec(), "tok-123")
            .await
            .unwrap();
        assert_eq!(result["cid"], "abc");
    }

    #[tokio::test]
    async fn test_upload_rejected_keeps_status_line() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/files"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let transport = PinataTransport::new(&settings_for(&server));
        let err = transport
            .upload("hello.txt", b"hello".to_vec(), "tok-123")
            .await
            .unwrap_err();

        match err {
            TransferError::Rejected(status) => assert!(status.contains("500")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/files"))
            .and(header_regex("content-type", "^multipart/form-data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let transport = PinataTransport::new(&settings_for(&server));
        // multipart の content-type で届かない場合は 404 相当で失敗する
        let result = transport.upload("a.bin", vec![0u8; 16], "tok").await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_transport_name() {
        let transport = PinataTransport::new(&UploaderSettings::default());
        assert_eq!(transport.name(), "pinata");
    }
}
