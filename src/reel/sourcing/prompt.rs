/// Deterministic search prompt for a segment.
///
/// Keeps the first `keywords` words of the text, stripped of surrounding
/// punctuation. When themes are configured, the theme picked by the segment
/// index is prefixed as `"<theme> related to <keywords>"`.
pub fn derive_prompt(text: &str, keywords: usize, themes: &[String], index: usize) -> String {
    let keywords = keywords.max(1);
    let words: Vec<&str> = text
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .take(keywords)
        .collect();
    let excerpt = words.join(" ");

    let themes: Vec<&str> = themes
        .iter()
        .map(|theme| theme.trim())
        .filter(|theme| !theme.is_empty())
        .collect();
    let theme = (!themes.is_empty()).then(|| themes[index % themes.len()]);

    match theme {
        Some(theme) if excerpt.is_empty() => theme.to_string(),
        Some(theme) => format!("{theme} related to {excerpt}"),
        None => excerpt,
    }
}
