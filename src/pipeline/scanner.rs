//! Keyword scanning

/// Returns the keywords found in `body`, in the order they were configured
///
/// Matching is case-insensitive substring containment. The body is lowercased
/// once per call. A keyword listed twice is reported once.
///
/// # Example
///
/// ```
/// use paste_sift::pipeline::scan;
///
/// let keywords = vec!["crypto".to_string(), "bitcoin".to_string()];
/// assert_eq!(scan("check out this Bitcoin wallet", &keywords), vec!["bitcoin"]);
/// ```
pub fn scan(body: &str, keywords: &[String]) -> Vec<String> {
    let haystack = body.to_lowercase();
    let mut found: Vec<String> = Vec::new();
    for keyword in keywords {
        if found.contains(keyword) {
            continue;
        }
        if haystack.contains(&keyword.to_lowercase()) {
            found.push(keyword.clone());
        }
    }
    found
}
