//! Client for the solver HTTP API.
//!
//! Three calls: `POST /quote` prices a swap and returns the quote uuid,
//! `POST /execute` tells the solver an intent carrying that uuid was
//! submitted, and `GET /status` reads the state of the resulting task.
//!
//! The client performs no retries. A structured error body is surfaced as
//! [`IntentError::Quote`] carrying the solver's code; other failures map to
//! [`IntentError::Http`], whose [`IntentError::is_retryable`] tells callers
//! whether trying again makes sense.

use intents_types::{
	ExecutionRequest, ExecutionResponse, IntentError, IntentStatus, IntentStatusCode, Quote,
	QuoteRequest, SolverEndpoint, SolverErrorCode, SolverErrorResponse, StatusResponse,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings for the solver API.
#[derive(Debug, Clone)]
pub struct SolverApiConfig {
	/// Base URL, e.g. `https://staging-solver.iconblockchain.xyz`.
	pub endpoint: String,
	pub timeout: Duration,
	/// Extra headers sent with every request.
	pub headers: HashMap<String, String>,
}

impl SolverApiConfig {
	pub fn new(endpoint: impl Into<String>) -> Self {
		Self {
			endpoint: endpoint.into(),
			timeout: Duration::from_secs(30),
			headers: HashMap::new(),
		}
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}
}

#[derive(Debug, Clone)]
pub struct SolverApiClient {
	http: reqwest::Client,
	endpoint: String,
	headers: HashMap<String, String>,
}

impl SolverApiClient {
	pub fn new(config: SolverApiConfig) -> Result<Self, IntentError> {
		let endpoint = config.endpoint.trim_end_matches('/').to_string();
		if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
			return Err(IntentError::InvalidConfiguration(format!(
				"solver endpoint must be an http(s) URL: {}",
				config.endpoint
			)));
		}
		let http = reqwest::Client::builder()
			.timeout(config.timeout)
			.build()
			.map_err(|e| IntentError::InvalidConfiguration(format!("HTTP client: {}", e)))?;
		Ok(Self {
			http,
			endpoint,
			headers: config.headers,
		})
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	/// Requests a quote for swapping `request.amount` of the source token.
	pub async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote, IntentError> {
		let builder = self.http.post(self.url("quote")).json(request);
		let quote: Quote = self.send(builder, SolverEndpoint::Quote).await?;
		info!(
			uuid = %quote.uuid,
			quoted_amount = %quote.quoted_amount,
			"Received quote"
		);
		Ok(quote)
	}

	/// Notifies the solver of a submitted intent and returns the task id.
	pub async fn notify_execution(
		&self,
		intent_tx_hash: &str,
		quote_uuid: &str,
	) -> Result<String, IntentError> {
		let body = ExecutionRequest {
			intent_tx_hash: intent_tx_hash.to_string(),
			quote_uuid: quote_uuid.to_string(),
		};
		let builder = self.http.post(self.url("execute")).json(&body);
		let response: ExecutionResponse = self.send(builder, SolverEndpoint::Execute).await?;
		info!(
			task_id = %response.task_id,
			answer = %response.answer,
			"Solver accepted execution"
		);
		Ok(response.task_id)
	}

	/// Single status read of a solver task.
	pub async fn get_status(&self, task_id: &str) -> Result<IntentStatus, IntentError> {
		let builder = self
			.http
			.get(self.url("status"))
			.query(&[("task_id", task_id)]);
		let response: StatusResponse = self.send(builder, SolverEndpoint::Status).await?;
		let status = into_status(response)?;
		debug!(task_id, %status, "Fetched intent status");
		Ok(status)
	}

	fn url(&self, path: &str) -> String {
		format!("{}/{}", self.endpoint, path)
	}

	async fn send<T: DeserializeOwned>(
		&self,
		mut builder: reqwest::RequestBuilder,
		endpoint: SolverEndpoint,
	) -> Result<T, IntentError> {
		for (key, value) in &self.headers {
			builder = builder.header(key, value);
		}
		let response = builder.send().await.map_err(|e| IntentError::Http {
			status: None,
			message: e.to_string(),
		})?;
		let status = response.status();
		let body = response.text().await.map_err(|e| IntentError::Http {
			status: Some(status.as_u16()),
			message: e.to_string(),
		})?;

		if let Ok(error) = serde_json::from_str::<SolverErrorResponse>(&body) {
			let code = SolverErrorCode::from_wire(error.detail.code, endpoint);
			debug!(http_status = status.as_u16(), %code, "Solver returned error");
			return Err(IntentError::Quote {
				code,
				message: error.detail.message,
			});
		}
		if !status.is_success() {
			return Err(IntentError::Http {
				status: Some(status.as_u16()),
				message: body,
			});
		}
		serde_json::from_str(&body).map_err(|e| IntentError::Http {
			status: Some(status.as_u16()),
			message: format!("unexpected response body: {}", e),
		})
	}
}

fn into_status(response: StatusResponse) -> Result<IntentStatus, IntentError> {
	let code = IntentStatusCode::from_code(response.status)
		.ok_or_else(|| IntentError::Unknown(format!("unknown intent status code {}", response.status)))?;
	Ok(match code {
		IntentStatusCode::NotFound => IntentStatus::NotFound,
		IntentStatusCode::NotStarted => IntentStatus::NotStarted,
		IntentStatusCode::StartedNotFinished => IntentStatus::StartedNotFinished,
		IntentStatusCode::Failed => IntentStatus::Failed,
		IntentStatusCode::Solved => match response.tx_hash.filter(|h| !h.is_empty()) {
			Some(tx_hash) => IntentStatus::Solved { tx_hash },
			None => {
				return Err(IntentError::Unknown(
					"solved status without settlement tx_hash".to_string(),
				))
			}
		},
	})
}
