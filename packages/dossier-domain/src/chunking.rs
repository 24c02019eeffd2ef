/// Fixed-size, non-overlapping chunks measured in characters.
pub fn chunk_text(text: &str, chunk_chars: usize) -> Vec<String> {
	if chunk_chars == 0 || text.is_empty() {
		return Vec::new();
	}

	let chars: Vec<char> = text.chars().collect();

	chars.chunks(chunk_chars).map(|chunk| chunk.iter().collect()).collect()
}

pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
	match text.char_indices().nth(max_chars) {
		Some((idx, _)) => &text[..idx],
		None => text,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn chunks_cover_text_without_overlap() {
		let text = "x".repeat(3_200);
		let chunks = chunk_text(&text, 1_500);

		assert_eq!(chunks.iter().map(|chunk| chunk.len()).collect::<Vec<_>>(), vec![1_500, 1_500, 200]);
		assert_eq!(chunks.concat(), text);
	}

	#[test]
	fn truncation_respects_char_boundaries() {
		assert_eq!(truncate_chars("héllo", 2), "hé");
		assert_eq!(truncate_chars("abc", 10), "abc");
		assert!(chunk_text("", 10).is_empty());
	}
}
