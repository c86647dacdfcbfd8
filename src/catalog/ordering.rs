//! Version precedence for Python distributions
//!
//! Versions are ordered by PEP 440, so `2.0rc1 < 2.0 < 2.0.post1 < 2.1`.
//! Strings that are not valid PEP 440 versions are considered older than any
//! valid one and ordered lexicographically among themselves.

use std::cmp::Ordering;
use std::str::FromStr;

use pep508_rs::pep440_rs::Version;

/// Parse a version string, returning None when it is not valid PEP 440
pub fn parse_version(version: &str) -> Option<Version> {
    Version::from_str(version.trim()).ok()
}

/// Total order over version strings
///
/// Equal PEP 440 versions written differently ("1.0" and "1.0.0") are tie-broken
/// by their text so that sorting stays deterministic.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_version(a), parse_version(b)) {
        (Some(left), Some(right)) => left.cmp(&right).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Sort versions from newest to oldest
pub fn sort_newest_first(versions: &mut [String]) {
    versions.sort_by(|a, b| compare_versions(b, a));
}

/// Find the newest version from a list
pub fn find_newest(versions: &[String]) -> Option<String> {
    versions
        .iter()
        .max_by(|a, b| compare_versions(a, b))
        .cloned()
}

/// Whether a published version should be indexed
///
/// Final releases always qualify; pre-releases only when requested. Post,
/// dev and local releases and unparseable versions never do.
pub fn is_candidate(version: &str, include_prereleases: bool) -> bool {
    let Some(parsed) = parse_version(version) else {
        return false;
    };
    if parsed.is_post() || parsed.is_local() {
        return false;
    }
    if parsed.is_dev() {
        return false;
    }
    include_prereleases || !parsed.is_pre()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2.0", "1.0", Ordering::Greater)]
    #[case("1.10.0", "1.9.3", Ordering::Greater)]
    #[case("2.0rc1", "2.0", Ordering::Less)]
    #[case("2.0a1", "2.0b1", Ordering::Less)]
    #[case("2.0", "2.0.post1", Ordering::Less)]
    #[case("1.0", "1.0.0", Ordering::Less)] // equal precedence, text tie-break
    #[case("not-a-version", "0.0.1", Ordering::Less)]
    #[case("abc", "abd", Ordering::Less)]
    fn compare_versions_returns_expected(
        #[case] a: &str,
        #[case] b: &str,
        #[case] expected: Ordering,
    ) {
        assert_eq!(compare_versions(a, b), expected);
        assert_eq!(compare_versions(b, a), expected.reverse());
    }

    #[test]
    fn sort_newest_first_orders_by_precedence() {
        let mut versions: Vec<String> = ["1.0", "bogus", "2.0rc1", "1.10", "2.0", "1.9"]
            .into_iter()
            .map(String::from)
            .collect();

        sort_newest_first(&mut versions);

        assert_eq!(versions, vec!["2.0", "2.0rc1", "1.10", "1.9", "1.0", "bogus"]);
    }

    #[rstest]
    #[case(vec![], None)]
    #[case(vec!["1.0.0", "2.0.0", "1.5.0"], Some("2.0.0"))]
    #[case(vec!["3.0.0b1", "2.9.0"], Some("3.0.0b1"))]
    #[case(vec!["invalid", "1.0.0"], Some("1.0.0"))]
    fn find_newest_returns_expected(#[case] versions: Vec<&str>, #[case] expected: Option<&str>) {
        let versions: Vec<String> = versions.into_iter().map(String::from).collect();
        assert_eq!(find_newest(&versions), expected.map(String::from));
    }

    #[rstest]
    #[case("2.31.0", false, true)]
    #[case("5.0rc1", false, false)]
    #[case("5.0rc1", true, true)]
    #[case("1.0.post1", false, false)]
    #[case("1.0.dev3", true, false)]
    #[case("1.0+local", false, false)]
    #[case("garbage", true, false)]
    fn is_candidate_returns_expected(
        #[case] version: &str,
        #[case] include_prereleases: bool,
        #[case] expected: bool,
    ) {
        assert_eq!(is_candidate(version, include_prereleases), expected);
    }
}
