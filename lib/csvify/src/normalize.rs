//! Name normalization shared by query building and match comparison.
//!
//! Matching is normalized-string equality, not similarity scoring, so the
//! exact same function must be applied to both sides of every comparison.

use regex::Regex;
use std::sync::LazyLock;

/// First parenthesized or bracketed "feat."/"ft." annotation, e.g.
/// "(feat. Artist)" or "[ft Someone]". The marker is matched case-sensitively.
static FEAT_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\(\[]f(ea)?t[^\)\]]*[\)\]]").unwrap());

/// Any leftover bracket characters. Contents are kept, only the brackets go.
static BRACKETS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\(\[\)\]]").unwrap());

/// Strip the first feat annotation, drop remaining brackets, lowercase, trim.
/// `None` passes through so absent tags compare equal to absent tags.
pub fn normalize(name: Option<&str>) -> Option<String> {
    let name = name?;
    let without_feat = FEAT_ANNOTATION.replacen(name, 1, "");
    let without_brackets = BRACKETS.replace_all(&without_feat, "");
    Some(without_brackets.to_lowercase().trim().to_string())
}
