pub mod searxng;
pub mod sitemap;
pub mod wordpress;

/// Seed domains may be bare hosts or full origins.
pub(crate) fn domain_base(domain: &str) -> String {
	let domain = domain.trim().trim_end_matches('/');

	if domain.contains("://") { domain.to_string() } else { format!("https://{domain}") }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bare_domains_default_to_https() {
		assert_eq!(domain_base("example.org"), "https://example.org");
		assert_eq!(domain_base("http://127.0.0.1:9000/"), "http://127.0.0.1:9000");
	}
}
