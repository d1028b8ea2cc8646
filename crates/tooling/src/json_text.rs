use serde_json::Value;

/// Pulls a JSON document out of model output.
///
/// Accepts a fenced ```json block, text that is JSON as a whole, or the
/// widest `{...}` / `[...]` span embedded in prose.
pub fn extract_json(text: &str) -> Result<Value, String> {
    let trimmed = text.trim();

    let candidate = if let Some(start) = trimmed.find("```json") {
        let body = &trimmed[start + "```json".len()..];
        match body.find("```") {
            Some(end) => body[..end].trim(),
            None => body.trim(),
        }
    } else if trimmed.starts_with('{') || trimmed.starts_with('[') {
        trimmed
    } else {
        embedded_span(trimmed).ok_or_else(|| "no JSON found in response".to_string())?
    };

    serde_json::from_str(candidate).map_err(|e| e.to_string())
}

fn embedded_span(text: &str) -> Option<&str> {
    text.char_indices()
        .filter_map(|(start, c)| match c {
            '{' => Some((start, '}')),
            '[' => Some((start, ']')),
            _ => None,
        })
        .find_map(|(start, closer)| {
            text.rfind(closer)
                .filter(|&end| end > start)
                .map(|end| &text[start..=end])
        })
}

/// First `limit` characters of `text`, with "..." appended when cut.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let head: String = text.chars().take(limit).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
