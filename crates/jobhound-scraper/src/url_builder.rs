use crate::error::{Result, ScrapeError};
use url::form_urlencoded::byte_serialize;

fn encode(value: &str) -> String {
    byte_serialize(value.trim().as_bytes()).collect()
}

/// Fill `{keywords}` and `{location}` in the search URL template.
///
/// Filters are applied through the UI afterwards, never through the URL.
pub fn build_search_url(template: &str, keywords: &str, location: &str) -> Result<String> {
    if !template.contains("{keywords}") {
        return Err(ScrapeError::InvalidRequest(format!(
            "search URL template has no {{keywords}} placeholder: {template}"
        )));
    }

    let url = template
        .replace("{keywords}", &encode(keywords))
        .replace("{location}", &encode(location));

    url::Url::parse(&url)
        .map(|u| u.to_string())
        .map_err(|e| ScrapeError::InvalidRequest(format!("search URL {url} is invalid: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "https://jobs.example.com/jobs/search/?keywords={keywords}&location={location}";

    #[test]
    fn test_build_url_from_template() {
        let url = build_search_url(TEMPLATE, "rust engineer", "Berlin, Germany").unwrap();
        assert_eq!(
            url,
            "https://jobs.example.com/jobs/search/?keywords=rust+engineer&location=Berlin%2C+Germany"
        );
    }

    #[test]
    fn test_special_characters_are_encoded() {
        let url = build_search_url(TEMPLATE, "c++ & rust", "").unwrap();
        assert!(url.contains("keywords=c%2B%2B+%26+rust"));
        assert!(url.ends_with("location="));
    }

    #[test]
    fn test_invalid_templates() {
        assert!(matches!(
            build_search_url("https://jobs.example.com/search", "rust", ""),
            Err(ScrapeError::InvalidRequest(_))
        ));
        assert!(matches!(
            build_search_url("not a url {keywords}", "rust", ""),
            Err(ScrapeError::InvalidRequest(_))
        ));
    }
}
