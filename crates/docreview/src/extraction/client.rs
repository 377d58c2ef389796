//! Structured extraction collaborator: prompt plus schema in, JSON object out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::schema::FieldSchema;
use super::ExtractionError;

/// Turns a prompt and a field schema into a JSON object.
///
/// Implementations only transport; schema checking and timeouts are applied
/// by [`BoundedExtractor`].
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    async fn request(&self, prompt: &str, schema: &FieldSchema) -> Result<Value, ExtractionError>;
}

#[derive(Serialize)]
struct GatewayRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    schema: Value,
}

/// HTTP client for a vendor-neutral extraction gateway.
pub struct HttpExtractionClient {
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl HttpExtractionClient {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::HttpClient(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl StructuredExtractor for HttpExtractionClient {
    async fn request(&self, prompt: &str, schema: &FieldSchema) -> Result<Value, ExtractionError> {
        let body = GatewayRequest {
            model: &self.model,
            prompt,
            schema: schema.to_json_schema(),
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                ExtractionError::Connection(self.endpoint.clone())
            } else if e.is_timeout() {
                ExtractionError::HttpClient(format!("Request to {} timed out", self.endpoint))
            } else {
                ExtractionError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Gateway {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| ExtractionError::Malformed(e.to_string()))?;

        if !value.is_object() {
            return Err(ExtractionError::Malformed(
                "gateway reply is not a JSON object".to_string(),
            ));
        }

        tracing::debug!(schema = schema.name, "Extraction gateway replied");
        Ok(value)
    }
}

/// Wraps any collaborator with a per-call timeout, schema validation and
/// typed decoding.
#[derive(Clone)]
pub struct BoundedExtractor {
    inner: Arc<dyn StructuredExtractor>,
    timeout: Duration,
}

impl BoundedExtractor {
    pub fn new(inner: Arc<dyn StructuredExtractor>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn send(&self, prompt: &str, schema: &FieldSchema) -> Result<Value, ExtractionError> {
        tokio::time::timeout(self.timeout, self.inner.request(prompt, schema))
            .await
            .map_err(|_| ExtractionError::Timeout(self.timeout))?
    }

    /// Sends the request and returns the reply once it matches the schema.
    pub async fn request(
        &self,
        prompt: &str,
        schema: &FieldSchema,
    ) -> Result<Value, ExtractionError> {
        let value = self.send(prompt, schema).await?;
        schema.validate(&value)?;
        Ok(value)
    }

    pub async fn typed<T: DeserializeOwned>(
        &self,
        prompt: &str,
        schema: &FieldSchema,
    ) -> Result<T, ExtractionError> {
        self.typed_with(prompt, schema, |_| {}).await
    }

    /// Like [`typed`](Self::typed), but lets `amend` fill in or override
    /// fields of the raw reply before it is validated.
    pub async fn typed_with<T, F>(
        &self,
        prompt: &str,
        schema: &FieldSchema,
        amend: F,
    ) -> Result<T, ExtractionError>
    where
        T: DeserializeOwned,
        F: FnOnce(&mut Value) + Send,
    {
        let mut value = self.send(prompt, schema).await?;
        amend(&mut value);
        schema.validate(&value)?;
        serde_json::from_value(value).map_err(|e| ExtractionError::SchemaMismatch {
            schema: schema.name.to_string(),
            errors: e.to_string(),
        })
    }
}
