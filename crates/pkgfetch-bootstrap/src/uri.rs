//! Download URI templating

use url::Url;

/// Placeholder replaced by the executable version
pub const VERSION_PLACEHOLDER: &str = "{0}";

/// Render a download URI from a template and version
///
/// Templates without a placeholder are used verbatim. The rendered string is
/// returned as the error when it is not an absolute http or https URI.
pub fn render_download_uri(format: &str, version: &str) -> Result<Url, String> {
    let rendered = if format.contains(VERSION_PLACEHOLDER) {
        format.replace(VERSION_PLACEHOLDER, version.trim())
    } else {
        format.to_string()
    };

    match Url::parse(rendered.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(url),
        _ => Err(rendered),
    }
}
