//! Capability links.
//!
//! A capability link grants its bearer read-only access to one student's
//! page: `{origin}/student-info?id={id}&sig={signature}`. Links are built on
//! demand for a single share action and never cached.

use std::fmt;

use tracing::debug;

use crate::config::LinkConfig;
use crate::error::{Error, Result};
use crate::signature::Signer;

/// A signed link to one student's read-only page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityLink {
    /// Student the link grants access to.
    pub student_id: String,
    /// Hex signature binding the id to the shared secret.
    pub signature: String,
    /// Origin the path is resolved against.
    pub base_origin: String,
    path: String,
}

impl CapabilityLink {
    /// The origin-relative part: path and query string.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        format!(
            "{}?id={}&sig={}",
            self.path,
            urlencoding::encode(&self.student_id),
            urlencoding::encode(&self.signature)
        )
    }

    /// The absolute, shareable URL.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}{}", self.base_origin, self.path_and_query())
    }
}

impl fmt::Display for CapabilityLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// The `id` and `sig` parameters pulled back out of a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkParams {
    /// Path component of the link.
    pub path: String,
    /// Decoded `id` parameter.
    pub student_id: String,
    /// Decoded `sig` parameter.
    pub signature: String,
}

/// Parse a capability link (absolute URL or origin-relative path).
///
/// Returns `None` if either parameter is missing, empty or not valid
/// percent-encoded UTF-8.
#[must_use]
pub fn parse_link(link: &str) -> Option<LinkParams> {
    let link = link.trim();
    let link = link.split_once('#').map_or(link, |(before, _)| before);
    let (location, query) = link.split_once('?')?;

    let path = match location.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => location,
    };

    let mut student_id = None;
    let mut signature = None;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value).ok()?.into_owned();
        match key {
            "id" => student_id = Some(value),
            "sig" => signature = Some(value),
            _ => {}
        }
    }

    let student_id = student_id.filter(|s| !s.trim().is_empty())?;
    let signature = signature.filter(|s| !s.trim().is_empty())?;
    Some(LinkParams {
        path: path.to_string(),
        student_id,
        signature,
    })
}

/// Builds and checks capability links.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    signer: Signer,
    default_origin: String,
    path: String,
}

impl LinkBuilder {
    /// Create a builder from a signer and link settings.
    #[must_use]
    pub fn new(signer: Signer, config: &LinkConfig) -> Self {
        Self {
            signer,
            default_origin: trim_origin(&config.default_origin).to_string(),
            path: config.path.clone(),
        }
    }

    /// The signer behind this builder.
    #[must_use]
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Pick the origin for a link: the caller's ambient origin when it has
    /// one, otherwise the configured default.
    #[must_use]
    pub fn resolve_origin<'a>(&'a self, ambient: Option<&'a str>) -> &'a str {
        ambient
            .map(trim_origin)
            .filter(|origin| !origin.is_empty())
            .unwrap_or(self.default_origin.as_str())
    }

    /// Build a signed link for a student.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the id is empty after trimming.
    pub fn link(&self, student_id: &str, ambient_origin: Option<&str>) -> Result<CapabilityLink> {
        let student_id = student_id.trim();
        if student_id.is_empty() {
            return Err(Error::invalid_argument(
                "student id is required to build a link",
            ));
        }

        let link = CapabilityLink {
            student_id: student_id.to_string(),
            signature: self.signer.sign(student_id),
            base_origin: self.resolve_origin(ambient_origin).to_string(),
            path: self.path.clone(),
        };
        debug!(student_id, origin = %link.base_origin, "Built capability link");
        Ok(link)
    }

    /// Build the origin-relative path for a student.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the id is empty after trimming.
    pub fn build_path(&self, student_id: &str) -> Result<String> {
        Ok(self.link(student_id, None)?.path_and_query())
    }

    /// Build the absolute URL for a student.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the id is empty after trimming.
    pub fn build_url(&self, student_id: &str, ambient_origin: Option<&str>) -> Result<String> {
        Ok(self.link(student_id, ambient_origin)?.url())
    }

    /// Check a link and return the student id it grants access to.
    ///
    /// Rejects links to a different page, missing parameters and signatures
    /// that do not match the id.
    #[must_use]
    pub fn verify_link(&self, link: &str) -> Option<String> {
        let params = parse_link(link)?;
        if params.path != self.path {
            debug!(path = %params.path, "Link points at a different page");
            return None;
        }
        self.signer
            .verify(&params.student_id, &params.signature)
            .then(|| params.student_id.trim().to_string())
    }
}

fn trim_origin(origin: &str) -> &str {
    origin.trim().trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::SignatureScheme;

    fn builder() -> LinkBuilder {
        LinkBuilder::new(
            Signer::new("STD_", SignatureScheme::PrefixedSha256),
            &LinkConfig::default(),
        )
    }

    #[test]
    fn test_build_path() {
        let path = builder().build_path("42").unwrap();
        assert_eq!(
            path,
            "/student-info?id=42&sig=cd83ef5e4a648f884270840c1421b0f0f868aa31655d0b72a1c62708ad018ede"
        );
    }

    #[test]
    fn test_build_url_uses_default_origin() {
        let url = builder().build_url("42", None).unwrap();
        assert!(url.starts_with("http://localhost:3000/student-info?id=42&sig="));
    }

    #[test]
    fn test_build_url_prefers_ambient_origin() {
        let b = builder();
        let url = b.build_url("42", Some("https://school.example/")).unwrap();
        assert!(url.starts_with("https://school.example/student-info?id=42&sig="));

        // A blank ambient origin is no origin at all
        let url = b.build_url("42", Some("  ")).unwrap();
        assert!(url.starts_with("http://localhost:3000/"));
    }

    #[test]
    fn test_empty_id_is_rejected() {
        let b = builder();
        assert!(matches!(b.build_path(""), Err(Error::InvalidArgument(_))));
        assert!(matches!(b.build_url("   ", None), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_id_is_percent_encoded() {
        let link = builder().link("a b&c", None).unwrap();
        assert!(link.path_and_query().starts_with("/student-info?id=a%20b%26c&sig="));
    }

    #[test]
    fn test_link_display_matches_url() {
        let link = builder().link("7", Some("https://a.example")).unwrap();
        assert_eq!(link.to_string(), link.url());
        assert_eq!(link.base_origin, "https://a.example");
    }

    #[test]
    fn test_round_trip_path_verifies() {
        let b = builder();
        for id in ["1", "42", "a b&c", "طالب"] {
            let path = b.build_path(id).unwrap();
            let params = parse_link(&path).unwrap();
            assert_eq!(params.student_id, id);
            assert!(b.signer().verify(&params.student_id, &params.signature));
            assert_eq!(b.verify_link(&path).as_deref(), Some(id));
        }
    }

    #[test]
    fn test_round_trip_absolute_url_verifies() {
        let b = builder();
        let url = b.build_url("42", Some("https://school.example")).unwrap();
        assert_eq!(b.verify_link(&url).as_deref(), Some("42"));
    }

    #[test]
    fn test_verify_link_rejects_swapped_id() {
        let b = builder();
        let sig = b.signer().sign("42");
        assert!(b.verify_link(&format!("/student-info?id=43&sig={sig}")).is_none());
    }

    #[test]
    fn test_verify_link_rejects_other_page() {
        let b = builder();
        let sig = b.signer().sign("42");
        assert!(b.verify_link(&format!("/admin?id=42&sig={sig}")).is_none());
    }

    #[test]
    fn test_parse_link_missing_params() {
        assert!(parse_link("/student-info").is_none());
        assert!(parse_link("/student-info?id=42").is_none());
        assert!(parse_link("/student-info?sig=abc").is_none());
        assert!(parse_link("/student-info?id=&sig=abc").is_none());
        assert!(parse_link("/student-info?id=%FF&sig=abc").is_none());
    }

    #[test]
    fn test_parse_link_ignores_extra_params_and_fragment() {
        let params = parse_link("https://x.example/student-info?utm=1&id=9&sig=ab#top").unwrap();
        assert_eq!(params.path, "/student-info");
        assert_eq!(params.student_id, "9");
        assert_eq!(params.signature, "ab");
    }

    #[test]
    fn test_parse_link_origin_only() {
        let params = parse_link("https://x.example?id=9&sig=ab").unwrap();
        assert_eq!(params.path, "/");
    }
}
