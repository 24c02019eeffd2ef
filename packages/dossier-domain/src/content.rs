#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
	Pdf,
	Html,
	Binary,
}
impl ContentClass {
	pub fn extension(self) -> &'static str {
		match self {
			Self::Pdf => "pdf",
			Self::Html => "html",
			Self::Binary => "bin",
		}
	}

	/// MIME type recorded for the document when the response did not carry one.
	pub fn default_mime(self) -> &'static str {
		match self {
			Self::Pdf => "application/pdf",
			Self::Html => "text/html",
			Self::Binary => "application/octet-stream",
		}
	}

	pub fn from_mime(mime_type: &str) -> Self {
		let mime = media_type(mime_type);

		if mime.contains("pdf") {
			Self::Pdf
		} else if mime.contains("html") || mime.starts_with("text/") {
			Self::Html
		} else {
			Self::Binary
		}
	}
}

/// Lower-cased media type without parameters.
pub fn media_type(content_type: &str) -> String {
	content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

/// Headers decide first; the URL suffix only breaks the tie for PDFs and empty headers.
pub fn classify(content_type: &str, url: &str) -> ContentClass {
	let mime = media_type(content_type);
	let url_is_pdf = url_path(url).to_ascii_lowercase().ends_with(".pdf");

	if mime.contains("pdf") || url_is_pdf {
		return ContentClass::Pdf;
	}
	if mime.contains("html") || mime.starts_with("text/") || mime.is_empty() {
		return ContentClass::Html;
	}

	ContentClass::Binary
}

/// The MIME type stored on a document, consistent with its class.
pub fn document_mime(content_type: &str, class: ContentClass) -> String {
	let mime = media_type(content_type);

	if !mime.is_empty() && ContentClass::from_mime(&mime) == class {
		mime
	} else {
		class.default_mime().to_string()
	}
}

pub fn passes_content_gate(text: &str, min_chars: usize) -> bool {
	text.trim().chars().count() >= min_chars
}

/// Postgres `text` columns reject NUL, so external text loses it before it is stored.
pub fn strip_nul(text: &str) -> String {
	text.replace('\0', "")
}

fn url_path(url: &str) -> &str {
	url.split(['?', '#']).next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classifies_from_headers() {
		assert_eq!(classify("application/pdf", "https://a.test/x"), ContentClass::Pdf);
		assert_eq!(classify("text/html; charset=utf-8", "https://a.test/x"), ContentClass::Html);
		assert_eq!(classify("text/plain", "https://a.test/x"), ContentClass::Html);
		assert_eq!(classify("image/png", "https://a.test/x.png"), ContentClass::Binary);
	}

	#[test]
	fn url_suffix_is_a_fallback() {
		assert_eq!(classify("application/octet-stream", "https://a.test/r.pdf"), ContentClass::Pdf);
		assert_eq!(classify("", "https://a.test/r.pdf?x=1"), ContentClass::Pdf);
		assert_eq!(classify("", "https://a.test/page"), ContentClass::Html);
	}

	#[test]
	fn stored_mime_agrees_with_class() {
		let class = classify("application/octet-stream", "https://a.test/r.pdf");

		assert_eq!(document_mime("application/octet-stream", class), "application/pdf");
		assert_eq!(document_mime("text/html; charset=utf-8", ContentClass::Html), "text/html");
		assert_eq!(ContentClass::from_mime(&document_mime("", ContentClass::Html)), ContentClass::Html);
	}

	#[test]
	fn content_gate_uses_trimmed_length() {
		assert!(!passes_content_gate(&"a".repeat(150), 200));
		assert!(passes_content_gate(&"a".repeat(250), 200));
		assert!(!passes_content_gate(&format!("   {}   ", "a".repeat(199)), 200));
	}

	#[test]
	fn nul_is_removed_and_other_text_kept() {
		assert_eq!(strip_nul("Ada\0 Lovelace\0"), "Ada Lovelace");
		assert_eq!(strip_nul("Countess of Lovelace"), "Countess of Lovelace");
	}
}
