//! robots.txt lookups. Every lookup failure allows the fetch.

use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
};

use reqwest::Client;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
	allow: bool,
	pattern: String,
}

/// Rules that apply to one user agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
	rules: Vec<Rule>,
}
impl RobotsRules {
	pub fn allow_all() -> Self {
		Self::default()
	}

	/// Keeps the groups naming `user_agent`, or the `*` groups when none do.
	pub fn parse(body: &str, user_agent: &str) -> Self {
		let token = agent_token(user_agent);
		let mut specific = Vec::new();
		let mut wildcard = Vec::new();
		let mut agents: Vec<String> = Vec::new();
		let mut in_rules = false;

		for line in body.lines() {
			let line = line.split('#').next().unwrap_or_default().trim();
			let Some((field, value)) = line.split_once(':') else {
				continue;
			};
			let field = field.trim().to_ascii_lowercase();
			let value = value.trim();

			match field.as_str() {
				"user-agent" => {
					if in_rules {
						agents.clear();
						in_rules = false;
					}

					agents.push(value.to_ascii_lowercase());
				},
				"allow" | "disallow" => {
					in_rules = true;

					if value.is_empty() {
						continue;
					}

					let rule = Rule { allow: field == "allow", pattern: value.to_string() };

					if agents.iter().any(|agent| agent != "*" && token.contains(agent.as_str())) {
						specific.push(rule);
					} else if agents.iter().any(|agent| agent == "*") {
						wildcard.push(rule);
					}
				},
				_ => {},
			}
		}

		Self { rules: if specific.is_empty() { wildcard } else { specific } }
	}

	/// Longest matching pattern decides; `Allow` wins ties.
	pub fn is_allowed(&self, path: &str) -> bool {
		let mut best: Option<(usize, bool)> = None;

		for rule in &self.rules {
			if !pattern_matches(&rule.pattern, path) {
				continue;
			}

			let len = rule.pattern.len();

			best = match best {
				Some((best_len, best_allow))
					if best_len > len || (best_len == len && (best_allow || !rule.allow)) =>
					Some((best_len, best_allow)),
				_ => Some((len, rule.allow)),
			};
		}

		best.map(|(_, allow)| allow).unwrap_or(true)
	}
}

/// Fetches and caches robots.txt per origin.
pub struct RobotsPolicy {
	client: Client,
	cache: Mutex<HashMap<String, Arc<RobotsRules>>>,
}
impl RobotsPolicy {
	pub fn new(client: Client) -> Self {
		Self { client, cache: Mutex::new(HashMap::new()) }
	}

	pub async fn allowed(&self, url: &str, user_agent: &str) -> bool {
		let Ok(parsed) = Url::parse(url) else {
			return true;
		};
		let origin = parsed.origin().ascii_serialization();
		let cache_key = format!("{origin} {}", agent_token(user_agent));
		let cached = self.cache.lock().unwrap_or_else(|err| err.into_inner()).get(&cache_key).cloned();
		let rules = match cached {
			Some(rules) => rules,
			None => {
				let rules = Arc::new(self.fetch_rules(&origin, user_agent).await);

				self.cache
					.lock()
					.unwrap_or_else(|err| err.into_inner())
					.insert(cache_key, rules.clone());

				rules
			},
		};
		let mut path = parsed.path().to_string();

		if let Some(query) = parsed.query() {
			path.push('?');
			path.push_str(query);
		}

		rules.is_allowed(&path)
	}

	async fn fetch_rules(&self, origin: &str, user_agent: &str) -> RobotsRules {
		let robots_url = format!("{origin}/robots.txt");
		let response =
			match self.client.get(&robots_url).header(reqwest::header::USER_AGENT, user_agent).send().await {
				Ok(response) => response,
				Err(err) => {
					tracing::warn!(error = %err, robots_url = %robots_url, "robots.txt lookup failed; allowing.");

					return RobotsRules::allow_all();
				},
			};
		let status = response.status();

		if !status.is_success() {
			if status.is_server_error() {
				tracing::warn!(status = %status, robots_url = %robots_url, "robots.txt unavailable; allowing.");
			}

			return RobotsRules::allow_all();
		}

		match response.text().await {
			Ok(body) => RobotsRules::parse(&body, user_agent),
			Err(err) => {
				tracing::warn!(error = %err, robots_url = %robots_url, "robots.txt body unreadable; allowing.");

				RobotsRules::allow_all()
			},
		}
	}
}

fn agent_token(user_agent: &str) -> String {
	user_agent.split('/').next().unwrap_or_default().trim().to_ascii_lowercase()
}

/// `*` matches any run of characters; a trailing `$` anchors the end.
fn pattern_matches(pattern: &str, path: &str) -> bool {
	let (pattern, anchored) = match pattern.strip_suffix('$') {
		Some(stripped) => (stripped, true),
		None => (pattern, false),
	};
	let pieces: Vec<&str> = pattern.split('*').collect();
	let Some((first, rest)) = pieces.split_first() else {
		return true;
	};
	let Some(mut remaining) = path.strip_prefix(first) else {
		return false;
	};

	for (idx, piece) in rest.iter().enumerate() {
		let last = idx + 1 == rest.len();

		if last && anchored {
			return remaining.ends_with(piece);
		}

		match remaining.find(piece) {
			Some(pos) => remaining = &remaining[pos + piece.len()..],
			None => return false,
		}
	}

	!anchored || remaining.is_empty()
}
