//! Title → identifier normalisation.

/// Derives the identifier used as both the repository filename stem and the
/// cross-system join key. Follows the store's own slug rule.
///
/// Quotes are dropped, `&` and `@` become `and` and `at`, and non-ASCII
/// letters are transliterated. ASCII letters (lower-cased), digits and `_`
/// are kept. Every other run of characters collapses into a single `-`, and
/// leading/trailing `-` or `_` are trimmed.
///
/// - `"Node Exporter: Full"` → `"node-exporter-full"`
/// - `"  [TEST] Latency  "` → `"test-latency"`
/// - `"CPU_usage"` → `"cpu_usage"`
/// - `"Überblick Café"` → `"uberblick-cafe"`
pub fn slugify(input: &str) -> String {
    let mut substituted = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\'' | '"' | '\u{2019}' => {}
            '&' => substituted.push_str("and"),
            '@' => substituted.push_str("at"),
            _ => substituted.push(ch),
        }
    }

    let ascii = deunicode::deunicode(&substituted);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Returns the identifier encoded in a dashboard filename (`alpha.json` → `alpha`).
pub fn identifier_from_path(path: &str) -> Option<&str> {
    let file_name = path.rsplit('/').next()?;
    let stem = file_name.strip_suffix(".json")?;
    if stem.is_empty() {
        None
    } else {
        Some(stem)
    }
}
