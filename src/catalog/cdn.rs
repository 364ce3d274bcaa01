//! Storage origin to caching proxy rewrite

/// Known storage origins and the proxies that front them
const CDN_REWRITES: [(&str, &str); 2] = [
    (
        "https://laudmedia-content.s3.eu-central-1.amazonaws.com/",
        "https://contentcache.laud-media.com/",
    ),
    (
        "https://lm-test-pipeline-output.s3.eu-west-1.amazonaws.com/",
        "https://staging-contentcache.laud-media.com/",
    ),
];

/// Literal substitution of every known origin; other URLs pass through unchanged
pub fn rewrite_cdn_url(url: &str) -> String {
    CDN_REWRITES
        .iter()
        .fold(url.to_string(), |acc, (origin, proxy)| acc.replace(origin, proxy))
}
