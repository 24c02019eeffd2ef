use std::{collections::HashMap, future::IntoFuture};

use axum::{
	Json, Router,
	extract::Query,
	http::StatusCode,
	response::IntoResponse,
	routing::{get, post},
};
use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};
use tokio::{
	net::TcpListener,
	sync::oneshot::{self, Sender},
};

use dossier_config::{ChatProviderConfig, EmbeddingProviderConfig, SeededProvider};
use dossier_domain::discovery::Constraints;
use dossier_providers::{
	discovery::{sitemap::SitemapProvider, wordpress::WordpressProvider},
	robots::RobotsPolicy,
};

async fn start_server(app: Router) -> (String, Sender<()>) {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind mock server.");
	let addr = listener.local_addr().expect("Failed to read mock server address.");
	let (tx, rx) = oneshot::channel();
	let server = axum::serve(listener, app).with_graceful_shutdown(async move {
		let _ = rx.await;
	});

	tokio::spawn(async move {
		let _ = server.into_future().await;
	});

	(format!("http://{addr}"), tx)
}

fn client() -> reqwest::Client {
	dossier_providers::crawl_client("DossierBot", 5_000).expect("Failed to build client.")
}

#[test]
fn builds_bearer_auth_header_only_with_key() {
	let headers =
		dossier_providers::auth_headers(Some("secret"), &Map::new()).expect("Failed to build headers.");

	assert_eq!(headers.get(AUTHORIZATION).expect("Missing authorization header."), "Bearer secret");

	let headers =
		dossier_providers::auth_headers(None, &Map::new()).expect("Failed to build headers.");

	assert!(headers.get(AUTHORIZATION).is_none());
}

#[test]
fn rejects_non_string_default_headers() {
	let mut default_headers = Map::new();

	default_headers.insert("x-retries".to_string(), Value::from(3));

	assert!(dossier_providers::auth_headers(None, &default_headers).is_err());
}

#[tokio::test]
async fn robots_policy_reads_rules_and_fails_open() {
	let app = Router::new().route(
		"/robots.txt",
		get(|| async { "User-agent: *\nDisallow: /private\n" }),
	);
	let (base, shutdown) = start_server(app).await;
	let policy = RobotsPolicy::new(client());

	assert!(policy.allowed(&format!("{base}/public/page"), "DossierBot").await);
	assert!(!policy.allowed(&format!("{base}/private/notes.pdf"), "DossierBot").await);

	let _ = shutdown.send(());

	let (missing_base, shutdown) = start_server(Router::new()).await;

	assert!(policy.allowed(&format!("{missing_base}/private/x"), "DossierBot").await);
	assert!(policy.allowed("http://127.0.0.1:1/unreachable", "DossierBot").await);
	assert!(policy.allowed("not a url", "DossierBot").await);

	let _ = shutdown.send(());
}

#[tokio::test]
async fn wordpress_provider_searches_each_domain() {
	let app = Router::new().route(
		"/wp-json/wp/v2/search",
		get(|Query(params): Query<HashMap<String, String>>| async move {
			let search = params.get("search").cloned().unwrap_or_default();

			Json(serde_json::json!([
				{ "url": format!("https://wp.test/{}", search.replace(' ', "-")), "title": search },
			]))
		}),
	);
	let (base, shutdown) = start_server(app).await;
	let (missing, missing_shutdown) = start_server(Router::new()).await;
	let provider = WordpressProvider::new(
		&SeededProvider { enabled: true, domains: vec![missing, base], max_results: 5 },
		client(),
	);
	let items = provider
		.discover("Ada Lovelace", &Constraints::default())
		.await
		.expect("Discovery failed.");

	assert_eq!(items.len(), 1);
	assert_eq!(items[0].url, "https://wp.test/Ada-Lovelace");
	assert_eq!(items[0].title.as_deref(), Some("Ada Lovelace"));

	let _ = shutdown.send(());
	let _ = missing_shutdown.send(());
}

#[tokio::test]
async fn sitemap_provider_follows_index_one_level() {
	let pages = Router::new().route(
		"/people.xml",
		get(|| async {
			"<urlset><url><loc>https://site.test/ada_lovelace</loc><lastmod>2022</lastmod></url>\
			 <url><loc>https://site.test/someone-else</loc></url></urlset>"
		}),
	);
	let (pages_base, pages_shutdown) = start_server(pages).await;
	let index_body = format!(
		"<sitemapindex><sitemap><loc>{pages_base}/people.xml</loc></sitemap></sitemapindex>"
	);
	let seed = Router::new()
		.route("/sitemap.xml", get(|| async { StatusCode::NOT_FOUND }))
		.route("/sitemap_index.xml", get(move || async move { index_body }));
	let (seed_base, seed_shutdown) = start_server(seed).await;
	let provider = SitemapProvider::new(
		&SeededProvider { enabled: true, domains: vec![seed_base], max_results: 5 },
		client(),
	);
	let items =
		provider.discover("Ada Lovelace", &Constraints::default()).await.expect("Discovery failed.");

	assert_eq!(items.len(), 1);
	assert_eq!(items[0].url, "https://site.test/ada_lovelace");
	assert_eq!(items[0].published_at.as_deref(), Some("2022"));

	let _ = pages_shutdown.send(());
	let _ = seed_shutdown.send(());
}

#[tokio::test]
async fn embedding_and_chat_round_trip_through_mock_backend() {
	let app = Router::new()
		.route(
			"/v1/embeddings",
			post(|Json(body): Json<Value>| async move {
				let inputs = body.get("input").and_then(Value::as_array).cloned().unwrap_or_default();
				let data: Vec<_> = inputs
					.iter()
					.enumerate()
					.map(|(index, _)| serde_json::json!({ "index": index, "embedding": [0.5, 0.5, 0.5] }))
					.collect();

				Json(serde_json::json!({ "data": data }))
			}),
		)
		.route(
			"/api/chat",
			post(|| async {
				(
					[("content-type", "application/x-ndjson")],
					"{\"message\":{\"content\":\"{\\\"timeline\\\"\"},\"done\":false}\n\
					 {\"message\":{\"content\":\":[]}\"},\"done\":true}\n",
				)
					.into_response()
			}),
		);
	let (base, shutdown) = start_server(app).await;
	let embedding = EmbeddingProviderConfig {
		provider_id: "openai-compatible".to_string(),
		api_base: base.clone(),
		api_key: None,
		path: "/v1/embeddings".to_string(),
		model: "m".to_string(),
		dimensions: 3,
		timeout_ms: 5_000,
		default_headers: Map::new(),
	};
	let vectors = dossier_providers::embedding::embed(&embedding, &["a".to_string(), "b".to_string()])
		.await
		.expect("Embedding failed.");

	assert_eq!(vectors.len(), 2);

	let chat = ChatProviderConfig {
		provider_id: "ollama".to_string(),
		api_base: base,
		api_key: None,
		path: "/api/chat".to_string(),
		model: "m".to_string(),
		temperature: 0.2,
		timeout_ms: 5_000,
		default_headers: Map::new(),
	};
	let content = dossier_providers::chat::complete(&chat, "system", "user")
		.await
		.expect("Chat failed.");

	assert_eq!(content, "{\"timeline\":[]}");

	let _ = shutdown.send(());
}
