//! Name normalization for fuzzy matching
//!
//! Bank statements report sender names uppercased, accent-mangled, and padded
//! with connectives ("MARIA DA SILVA COSTA"). Matching folds both sides to a
//! canonical form and compares significant tokens.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Portuguese connectives that carry no identity
static STOPWORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["de", "da", "do", "das", "dos", "e"].into_iter().collect());

/// Lowercases, folds accented characters, and strips everything that is not
/// a letter, digit, or space
pub fn normalize_name(input: &str) -> String {
    let folded: String = input
        .to_lowercase()
        .chars()
        .map(fold_accent)
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// Tokens that identify a person: normalized words minus connectives
pub fn significant_tokens(normalized: &str) -> Vec<&str> {
    normalized
        .split_whitespace()
        .filter(|t| t.len() >= 2 && !STOPWORDS.contains(t))
        .collect()
}

/// Fuzzy equality of two person names
///
/// Matches on normalized equality, full-string containment, or shared
/// significant tokens (two shared tokens, or one when either name has only a
/// single token to offer).
pub fn names_match(a: &str, b: &str) -> bool {
    let na = normalize_name(a);
    let nb = normalize_name(b);
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    if na == nb || na.contains(&nb) || nb.contains(&na) {
        return true;
    }

    let ta = significant_tokens(&na);
    let tb = significant_tokens(&nb);
    let common = ta.iter().filter(|t| tb.contains(t)).count();

    common >= 2 || (common == 1 && (ta.len() == 1 || tb.len() == 1))
}
