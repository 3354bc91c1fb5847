const MAX_ERROR_MESSAGE_LEN: usize = 256;

pub(crate) fn truncate_message(body: &str) -> String {
    let compact = body.trim().replace('\n', " ");
    compact.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
}

/// Locates the JSON array inside a raw model reply: a markdown-fenced
/// block if present, otherwise the span from the first `[` to the last
/// `]`, with any surrounding prose discarded.
pub(crate) fn extract_json_array(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(fenced) = extract_markdown_fenced_block(trimmed) {
        let fenced = fenced.trim();
        if !fenced.is_empty() {
            return extract_array_span(fenced).or(Some(fenced));
        }
    }

    extract_array_span(trimmed)
}

fn extract_array_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (start <= end).then(|| &text[start..=end])
}

fn extract_markdown_fenced_block(text: &str) -> Option<&str> {
    let stripped = text.strip_prefix("```")?;
    let first_newline = stripped.find('\n')?;
    let (_, rest) = stripped.split_at(first_newline + 1);
    let end = rest.rfind("```")?;
    Some(&rest[..end])
}
