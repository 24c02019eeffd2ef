//! Plain-text extraction. Extraction never fails: anything unreadable yields empty text.

use std::panic::{self, AssertUnwindSafe};

use scraper::{ElementRef, Html, Node, Selector};

use dossier_domain::content::ContentClass;

const SKIPPED_ELEMENTS: &[&str] = &[
	"script", "style", "noscript", "template", "svg", "canvas", "iframe", "nav", "header",
	"footer", "aside", "form", "button", "select",
];
const BLOCK_ELEMENTS: &[&str] = &[
	"p", "div", "section", "article", "main", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol",
	"dl", "dt", "dd", "table", "tr", "blockquote", "pre", "figure", "figcaption", "hr",
	"address", "details", "summary",
];
const CONTENT_ROOTS: &[&str] = &["main", "article", "[role=\"main\"]", "body"];

pub fn extract_text(bytes: &[u8], mime_type: &str) -> String {
	match ContentClass::from_mime(mime_type) {
		ContentClass::Html => html_to_text(&String::from_utf8_lossy(bytes)),
		ContentClass::Pdf => pdf_to_text(bytes),
		ContentClass::Binary => String::new(),
	}
}

pub fn html_to_text(html: &str) -> String {
	let document = Html::parse_document(html);
	let root = CONTENT_ROOTS
		.iter()
		.filter_map(|selector| Selector::parse(selector).ok())
		.find_map(|selector| document.select(&selector).next())
		.unwrap_or_else(|| document.root_element());
	let mut raw = String::new();

	collect_text(root, &mut raw);

	collapse_whitespace(&raw)
}

pub fn pdf_to_text(bytes: &[u8]) -> String {
	// The PDF parser panics on some malformed inputs.
	let result = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)));

	match result {
		Ok(Ok(text)) => collapse_whitespace(&text),
		Ok(Err(err)) => {
			tracing::warn!(error = %err, "PDF text extraction failed.");

			String::new()
		},
		Err(_) => {
			tracing::warn!("PDF text extraction panicked.");

			String::new()
		},
	}
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
	for child in element.children() {
		match child.value() {
			Node::Text(text) => out.push_str(text),
			Node::Element(el) => {
				let name = el.name();

				if SKIPPED_ELEMENTS.contains(&name) {
					continue;
				}
				if name == "br" {
					out.push('\n');

					continue;
				}

				let Some(child) = ElementRef::wrap(child) else {
					continue;
				};
				let block = BLOCK_ELEMENTS.contains(&name);

				if block {
					out.push('\n');
				}

				collect_text(child, out);

				if block {
					out.push('\n');
				} else if matches!(name, "td" | "th") {
					out.push(' ');
				}
			},
			_ => {},
		}
	}
}

/// Collapses runs of whitespace within lines and drops blank lines.
fn collapse_whitespace(raw: &str) -> String {
	raw.lines()
		.map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
		.filter(|line| !line.is_empty())
		.collect::<Vec<_>>()
		.join("\n")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn prefers_main_content_and_skips_chrome() {
		let html = r#"
			<html><head><title>t</title><style>p { color: red; }</style></head>
			<body>
				<nav>Home | About</nav>
				<main>
					<h1>Ada   Lovelace</h1>
					<p>Wrote the <em>first</em> program.</p>
					<script>track()</script>
				</main>
				<footer>Copyright</footer>
			</body></html>
		"#;

		assert_eq!(html_to_text(html), "Ada Lovelace\nWrote the first program.");
	}

	#[test]
	fn falls_back_to_body() {
		let html = "<html><body><header>Site</header><div>One</div><div>Two<br>Three</div></body></html>";

		assert_eq!(html_to_text(html), "One\nTwo\nThree");
	}

	#[test]
	fn binary_and_broken_pdf_yield_empty_text() {
		assert_eq!(extract_text(b"\x89PNG\r\n", "image/png"), "");
		assert_eq!(extract_text(b"%PDF-1.4 truncated", "application/pdf"), "");
	}

	#[test]
	fn text_plain_is_treated_as_markup() {
		assert_eq!(extract_text(b"plain   words\n\nhere", "text/plain"), "plain words\nhere");
	}
}
