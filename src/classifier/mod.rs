//! HTTP client for the hosted classification service.

mod response;

pub use response::{classify_reply, SubmissionError, GENERIC_FAILURE};

use crate::model::{ClientConfig, PredictRequest};
use anyhow::{Context, Result};
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;

/// Loosely typed reply body. The service mixes verdict fields and error fields, and
/// any of them may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyBody {
    #[serde(rename = "isSpam", default)]
    pub is_spam: Option<bool>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub indicators: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Status and decoded body of a predict call. `body` is `None` when the payload was
/// not the expected JSON shape.
#[derive(Debug, Clone)]
pub struct RawReply {
    pub status: StatusCode,
    pub body: Option<ReplyBody>,
}

#[derive(Debug, Clone)]
pub struct ClassifierClient {
    http: reqwest::Client,
    base_url: String,
}

impl ClassifierClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn predict_url(&self) -> String {
        format!("{}/predict", self.base_url)
    }

    /// POST the message to `/predict`. Only transport failures are errors here;
    /// every HTTP status is returned for classification.
    pub async fn predict(
        &self,
        req: &PredictRequest,
        token: Option<&str>,
    ) -> std::result::Result<RawReply, reqwest::Error> {
        let bearer = format!("Bearer {}", token.unwrap_or_default());
        // Tokens with control characters can't go in a header; send the bare scheme instead.
        let auth = HeaderValue::from_str(&bearer)
            .unwrap_or_else(|_| HeaderValue::from_static("Bearer "));

        tracing::debug!(
            url = %self.predict_url(),
            channel = %req.channel,
            chars = req.message.chars().count(),
            has_token = token.is_some(),
            "dispatching predict request"
        );

        let resp = self
            .http
            .post(self.predict_url())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, auth)
            .json(req)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        let body = match serde_json::from_slice::<ReplyBody>(&bytes) {
            Ok(b) => Some(b),
            Err(e) => {
                tracing::warn!(%status, error = %e, "predict reply body is not the expected JSON");
                None
            }
        };
        tracing::debug!(%status, "predict reply received");
        Ok(RawReply { status, body })
    }
}
