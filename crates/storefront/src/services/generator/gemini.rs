//! Generative Language API client for seed products.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use souk_core::Product;
use tracing::{instrument, warn};

use crate::config::GeminiConfig;

use super::ProductGenerator;
use super::error::{ApiErrorResponse, GeneratorError};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Generative Language API client.
///
/// Asks the model for a JSON array of products matching a response schema,
/// then keeps the records that pass product validation.
#[derive(Clone)]
pub struct GeminiGenerator {
    inner: Arc<GeminiGeneratorInner>,
}

struct GeminiGeneratorInner {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiGenerator")
            .field("model", &self.inner.model)
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GeminiGenerator {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &GeminiConfig) -> Result<Self, GeneratorError> {
        Self::with_base_url(config, GEMINI_API_BASE)
    }

    /// Create a client against a different API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_base_url(config: &GeminiConfig, base_url: &str) -> Result<Self, GeneratorError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(GeminiGeneratorInner {
                client,
                api_key: config.api_key.clone(),
                model: config.model.clone(),
                base_url: base_url.trim_end_matches('/').to_owned(),
            }),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.inner.base_url, self.inner.model
        )
    }

    /// Handle an error status code.
    async fn handle_error_status(
        &self,
        status: StatusCode,
        response: reqwest::Response,
    ) -> GeneratorError {
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return GeneratorError::RateLimited(retry_after);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return GeneratorError::Unauthorized("API key rejected".to_string());
        }

        match response.text().await {
            Ok(body) => match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_error) => GeneratorError::Api {
                    status: api_error.error.status,
                    message: api_error.error.message,
                },
                Err(_) => GeneratorError::Api {
                    status: status.to_string(),
                    message: body,
                },
            },
            Err(e) => GeneratorError::Http(e),
        }
    }
}

impl ProductGenerator for GeminiGenerator {
    #[instrument(skip(self), fields(model = %self.inner.model))]
    async fn generate(&self, count: usize) -> Result<Vec<Product>, GeneratorError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt(count),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: product_schema(),
            },
        };

        let response = self
            .inner
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.inner.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.handle_error_status(status, response).await);
        }

        let body = response.text().await?;
        let mut products = parse_generated(&body)?;
        products.truncate(count);
        Ok(products)
    }
}

fn prompt(count: usize) -> String {
    format!(
        "Generate a list of {count} creative and modern clothing items for an e-commerce \
         store. Include items for men, women, and kids. Some items should have a discounted \
         price, given as originalPrice above price. Include a short, compelling product \
         description for each. Prices are in Egyptian pounds."
    )
}

/// JSON schema the model's output must follow.
fn product_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "STRING", "description": "A unique identifier, e.g. 'prod-1'" },
                "name": { "type": "STRING" },
                "category": { "type": "STRING", "enum": ["men", "women", "kids"] },
                "price": { "type": "NUMBER", "description": "The final price." },
                "originalPrice": {
                    "type": "NUMBER",
                    "description": "The original price before discount (optional)."
                },
                "rating": { "type": "NUMBER", "description": "A rating from 1 to 5." },
                "imageUrl": {
                    "type": "STRING",
                    "description": "A placeholder image URL from picsum.photos, e.g. https://picsum.photos/600/900"
                },
                "description": { "type": "STRING" }
            },
            "required": ["id", "name", "category", "price", "rating", "imageUrl", "description"]
        }
    })
}

/// Extract products from a `generateContent` response body.
///
/// Records that fail product validation are dropped with a warning.
fn parse_generated(body: &str) -> Result<Vec<Product>, GeneratorError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| GeneratorError::Parse(format!("Failed to parse response: {e}")))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    let records: Vec<Value> = serde_json::from_str(text.trim())
        .map_err(|e| GeneratorError::Parse(format!("Model output is not a JSON array: {e}")))?;

    let products: Vec<Product> = records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<Product>(record) {
            Ok(product) if is_storable_id(product.id.as_str()) => Some(product),
            Ok(product) => {
                warn!(id = %product.id, "dropping generated product with unusable id");
                None
            }
            Err(e) => {
                warn!(error = %e, "dropping invalid generated product");
                None
            }
        })
        .collect();

    if products.is_empty() {
        return Err(GeneratorError::Empty);
    }
    Ok(products)
}

/// Ids become document names and URL path segments: no blanks, separators
/// or relative segments.
fn is_storable_id(id: &str) -> bool {
    !id.trim().is_empty()
        && id != "."
        && id != ".."
        && !id
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '\\' | '?' | '#'))
}
