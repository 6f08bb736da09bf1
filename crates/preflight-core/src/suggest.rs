//! Fuzzy "did you mean" hints for mistyped check names

/// Maximum Levenshtein distance to consider for suggestions
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Find the closest candidate to `input`
///
/// A case-insensitive exact match wins over any edit-distance match.
pub fn closest_match<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    if let Some(exact) = candidates
        .iter()
        .copied()
        .find(|candidate| candidate.eq_ignore_ascii_case(input))
    {
        return Some(exact);
    }

    candidates
        .iter()
        .map(|&candidate| (candidate, strsim::levenshtein(input, candidate)))
        .filter(|&(_, distance)| distance > 0 && distance <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|&(_, distance)| distance)
        .map(|(candidate, _)| candidate)
}

/// Build the help text shown for an unknown check name
pub fn unknown_check_help(input: &str, candidates: &[&str]) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }

    let known = candidates.join(", ");
    match closest_match(input, candidates) {
        Some(suggestion) => Some(format!(
            "did you mean `{}`? Known checks: {}",
            suggestion, known
        )),
        None => Some(format!("known checks: {}", known)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_match_typo() {
        let candidates = ["CRDUpgradeSafety", "Other"];
        assert_eq!(
            closest_match("CRDUpgradeSafty", &candidates),
            Some("CRDUpgradeSafety")
        );
    }

    #[test]
    fn test_closest_match_case_insensitive() {
        let candidates = ["CRDUpgradeSafety"];
        assert_eq!(
            closest_match("crdupgradesafety", &candidates),
            Some("CRDUpgradeSafety")
        );
    }

    #[test]
    fn test_no_match_when_too_far() {
        assert_eq!(closest_match("completely", &["CRDUpgradeSafety"]), None);
    }

    #[test]
    fn test_help_lists_known_checks() {
        let help = unknown_check_help("nope", &["a", "b"]).unwrap();
        assert!(help.contains("a, b"));
        assert_eq!(unknown_check_help("nope", &[]), None);
    }
}
