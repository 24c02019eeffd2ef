pub mod chat;
pub mod discovery;
pub mod embedding;
pub mod extract;
pub mod robots;

use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::{
	Client,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

/// Bearer auth is only sent when a key is configured.
pub fn auth_headers(
	api_key: Option<&str>,
	default_headers: &Map<String, Value>,
) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	if let Some(api_key) = api_key.filter(|key| !key.trim().is_empty()) {
		headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(eyre::eyre!("Default header values must be strings."));
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

/// Client for outbound crawling: bounded timeout and an identifying user agent.
pub fn crawl_client(user_agent: &str, timeout_ms: u64) -> Result<Client> {
	Ok(Client::builder().user_agent(user_agent).timeout(Duration::from_millis(timeout_ms)).build()?)
}
