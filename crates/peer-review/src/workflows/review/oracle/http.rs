use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::{CandidateContext, ManuscriptContext, Oracle, OracleError, OracleVerdict};
use crate::config::OracleConfig;

/// Oracle reached over HTTP: POSTs `{candidate, manuscript}` and expects an `OracleVerdict`.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct EvaluationRequest<'a> {
    candidate: &'a CandidateContext,
    manuscript: &'a ManuscriptContext,
}

impl HttpOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| OracleError::Unavailable(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn evaluate(
        &self,
        candidate: &CandidateContext,
        manuscript: &ManuscriptContext,
    ) -> Result<OracleVerdict, OracleError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&EvaluationRequest {
                candidate,
                manuscript,
            });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                OracleError::Unavailable(format!("request timed out: {err}"))
            } else {
                OracleError::Unavailable(format!("request failed: {err}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| OracleError::Unavailable(format!("failed to read response: {err}")))?;

        if !status.is_success() {
            return Err(OracleError::Unavailable(format!("status {status}: {body}")));
        }

        let verdict: OracleVerdict = serde_json::from_str(&body)
            .map_err(|err| OracleError::Malformed(format!("unparsable body: {err}")))?;
        verdict.validate()?;

        debug!(
            reviewer = %candidate.identity,
            manuscript_id = %manuscript.id,
            score = verdict.overall_score,
            tier = verdict.recommendation.label(),
            "oracle verdict received"
        );
        Ok(verdict)
    }
}
