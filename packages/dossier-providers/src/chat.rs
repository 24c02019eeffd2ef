use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

pub async fn complete(
	cfg: &dossier_config::ChatProviderConfig,
	system_prompt: &str,
	user_prompt: &str,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"stream": false,
		"messages": [
			{ "role": "system", "content": system_prompt },
			{ "role": "user", "content": user_prompt },
		],
	});
	let res = client
		.post(&url)
		.headers(crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let text = res.error_for_status()?.text().await?;

	parse_chat_body(&text)
}

/// One JSON object, or NDJSON fragments when the backend streams anyway.
fn parse_chat_body(body: &str) -> Result<String> {
	match serde_json::from_str::<Value>(body) {
		Ok(json) => message_content(&json)
			.map(|content| content.trim().to_string())
			.ok_or_else(|| eyre::eyre!("Chat response is missing message content.")),
		Err(_) => {
			let content = stitch_ndjson(body);

			if content.is_empty() {
				return Err(eyre::eyre!("Chat response is neither JSON nor NDJSON."));
			}

			Ok(content)
		},
	}
}

fn message_content(json: &Value) -> Option<&str> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|choices| choices.first())
		.and_then(|choice| choice.get("message"))
		.or_else(|| json.get("message"))
		.and_then(|message| message.get("content"))
		.and_then(|content| content.as_str())
}

fn stitch_ndjson(body: &str) -> String {
	let mut out = String::new();

	for line in body.lines().map(str::trim).filter(|line| !line.is_empty()) {
		let Ok(json) = serde_json::from_str::<Value>(line) else {
			continue;
		};

		if let Some(part) = message_content(&json) {
			out.push_str(part);
		}
		if json.get("done").and_then(|v| v.as_bool()).unwrap_or(false) {
			break;
		}
	}

	out.trim().to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reads_openai_and_ollama_shapes() {
		let openai = r#"{"choices":[{"message":{"content":" {\"timeline\":[]} "}}]}"#;
		let ollama = r#"{"message":{"role":"assistant","content":"hello"},"done":true}"#;

		assert_eq!(parse_chat_body(openai).expect("parse failed"), "{\"timeline\":[]}");
		assert_eq!(parse_chat_body(ollama).expect("parse failed"), "hello");
	}

	#[test]
	fn stitches_ndjson_until_done() {
		let body = concat!(
			"{\"message\":{\"content\":\"{\\\"time\"},\"done\":false}\n",
			"not json\n",
			"{\"message\":{\"content\":\"line\\\":[]}\"},\"done\":true}\n",
			"{\"message\":{\"content\":\"ignored\"},\"done\":false}\n",
		);

		assert_eq!(parse_chat_body(body).expect("parse failed"), "{\"timeline\":[]}");
	}

	#[test]
	fn json_without_content_is_an_error() {
		assert!(parse_chat_body(r#"{"error":"model not found"}"#).is_err());
	}
}
