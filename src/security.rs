//! # Security Header Policy
//!
//! The content security policy is a pure function of a static allow-list of
//! external origins. It is rendered once at startup into [`SecurityHeaders`],
//! which the security middleware copies onto every response.

use axum::http::{
    header::{self, HeaderName, InvalidHeaderValue},
    HeaderMap, HeaderValue,
};

/// Allow-listed external origins, grouped by content category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentSecurityPolicy {
    pub script: Vec<String>,
    pub style: Vec<String>,
    pub connect: Vec<String>,
    pub font: Vec<String>,
    pub image: Vec<String>,
    pub media: Vec<String>,
}

impl ContentSecurityPolicy {
    /// The CDN, map tile and font origins the site pages load from, plus the
    /// given Cloudinary account for uploaded images.
    pub fn for_cloudinary(cloud_name: &str) -> Self {
        let cloudinary = format!("https://res.cloudinary.com/{cloud_name}/");
        let origins = |list: &[&str]| -> Vec<String> {
            list.iter()
                .map(|s| s.to_string())
                .chain(std::iter::once(cloudinary.clone()))
                .collect()
        };

        Self {
            script: origins(&[
                "https://stackpath.bootstrapcdn.com/",
                "https://api.tiles.mapbox.com/",
                "https://api.mapbox.com/",
                "https://kit.fontawesome.com/",
                "https://cdnjs.cloudflare.com/",
                "https://cdn.jsdelivr.net/",
            ]),
            style: origins(&[
                "https://kit-free.fontawesome.com/",
                "https://stackpath.bootstrapcdn.com/",
                "https://api.mapbox.com/",
                "https://api.tiles.mapbox.com/",
                "https://fonts.googleapis.com/",
                "https://use.fontawesome.com/",
                "https://cdn.jsdelivr.net/",
            ]),
            connect: origins(&[
                "https://*.tiles.mapbox.com",
                "https://api.mapbox.com",
                "https://events.mapbox.com",
            ]),
            font: origins(&[]),
            image: vec![cloudinary.clone(), "https://images.unsplash.com/".to_string()],
            media: origins(&[]),
        }
    }

    /// Render the `Content-Security-Policy` header value
    ///
    /// Deterministic: the same policy always yields the same string. A
    /// directive with neither keywords nor origins renders as `'none'`.
    pub fn header_value(&self) -> String {
        let directives = [
            directive("default-src", &[], &[]),
            directive("base-uri", &["'self'"], &[]),
            directive("form-action", &["'self'"], &[]),
            directive("frame-ancestors", &["'self'"], &[]),
            directive("connect-src", &["'self'"], &self.connect),
            directive("script-src", &["'unsafe-inline'", "'self'"], &self.script),
            directive("script-src-attr", &[], &[]),
            directive("style-src", &["'self'", "'unsafe-inline'"], &self.style),
            directive("worker-src", &["'self'", "blob:"], &[]),
            directive("object-src", &[], &[]),
            directive("img-src", &["'self'", "blob:", "data:"], &self.image),
            directive("font-src", &["'self'"], &self.font),
            directive("media-src", &[], &self.media),
            directive("child-src", &["blob:"], &[]),
            "upgrade-insecure-requests".to_string(),
        ];

        directives.join("; ")
    }
}

fn directive(name: &str, keywords: &[&str], origins: &[String]) -> String {
    let sources: Vec<&str> = keywords
        .iter()
        .copied()
        .chain(origins.iter().map(String::as_str))
        .collect();

    if sources.is_empty() {
        format!("{name} 'none'")
    } else {
        format!("{name} {}", sources.join(" "))
    }
}

/// Precomputed response headers applied to every response
///
/// Cross-Origin-Embedder-Policy is deliberately absent: the pages embed
/// third-party map tiles and images that do not send CORP headers.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaders {
    pub fn from_policy(policy: &ContentSecurityPolicy) -> Result<Self, InvalidHeaderValue> {
        let headers = vec![
            (
                header::CONTENT_SECURITY_POLICY,
                HeaderValue::from_str(&policy.header_value())?,
            ),
            (
                HeaderName::from_static("cross-origin-opener-policy"),
                HeaderValue::from_static("same-origin"),
            ),
            (
                HeaderName::from_static("cross-origin-resource-policy"),
                HeaderValue::from_static("same-origin"),
            ),
            (
                HeaderName::from_static("origin-agent-cluster"),
                HeaderValue::from_static("?1"),
            ),
            (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
            (
                header::STRICT_TRANSPORT_SECURITY,
                HeaderValue::from_static("max-age=15552000; includeSubDomains"),
            ),
            (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
            (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
            (
                HeaderName::from_static("x-download-options"),
                HeaderValue::from_static("noopen"),
            ),
            (header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
            (
                HeaderName::from_static("x-permitted-cross-domain-policies"),
                HeaderValue::from_static("none"),
            ),
            (header::X_XSS_PROTECTION, HeaderValue::from_static("0")),
        ];

        Ok(Self { headers })
    }

    /// Overwrite the response headers with the policy headers
    pub fn apply(&self, target: &mut HeaderMap) {
        for (name, value) in &self.headers {
            target.insert(name.clone(), value.clone());
        }
    }
}
