/// Canonicalises a raw paper identifier into the form the upstream metadata
/// service expects (spec §4.1). Rules are applied in order; the first rule
/// that matches determines the output.
pub fn normalise_paper_id(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Some(colon) = trimmed.find(':') {
        if !trimmed.starts_with("10.") {
            let prefix = &trimmed[..colon];
            let remainder = &trimmed[colon + 1..];
            if prefix.eq_ignore_ascii_case("arxiv") {
                return format!("ARXIV:{}", strip_arxiv_version(remainder));
            }
            return trimmed.to_string();
        }
    }

    if is_semantic_scholar_hash(trimmed) {
        return trimmed.to_string();
    }

    if let Some(rest) = trimmed.strip_prefix("10.") {
        return format!("DOI:10.{rest}");
    }

    format!("ARXIV:{}", strip_arxiv_version(trimmed))
}

fn is_semantic_scholar_hash(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Drops a trailing `vN` version suffix (everything from the first lowercase
/// `v` onward), matching the upstream client's arXiv id normalisation.
fn strip_arxiv_version(s: &str) -> &str {
    match s.find('v') {
        Some(idx) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_arxiv_id_gets_prefixed() {
        assert_eq!(normalise_paper_id("2103.12345"), "ARXIV:2103.12345");
    }

    #[test]
    fn bare_arxiv_id_strips_version() {
        assert_eq!(normalise_paper_id("2103.12345v2"), "ARXIV:2103.12345");
    }

    #[test]
    fn explicit_arxiv_prefix_is_normalised_case_insensitively() {
        assert_eq!(normalise_paper_id("ARXIV:2103.12345v1"), "ARXIV:2103.12345");
        assert_eq!(normalise_paper_id("arxiv:2103.12345"), "ARXIV:2103.12345");
    }

    #[test]
    fn other_prefixes_pass_through_unchanged() {
        assert_eq!(normalise_paper_id("DOI:10.1145/3.4"), "DOI:10.1145/3.4");
        assert_eq!(normalise_paper_id("PMID:12345"), "PMID:12345");
    }

    #[test]
    fn bare_doi_gets_prefixed() {
        assert_eq!(
            normalise_paper_id("10.1145/3442188.3445922"),
            "DOI:10.1145/3442188.3445922"
        );
    }

    #[test]
    fn semantic_scholar_hash_passes_through() {
        let hash = "0".repeat(40);
        assert_eq!(normalise_paper_id(&hash), hash);
    }

    #[test]
    fn whitespace_is_stripped() {
        assert_eq!(normalise_paper_id("  2103.12345  "), "ARXIV:2103.12345");
    }
}
