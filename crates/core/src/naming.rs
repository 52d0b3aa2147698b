//! File naming for stored result assets.

/// Channel name used when an upload does not say where it belongs.
pub const UNKNOWN_CHANNEL: &str = "unknown";

/// Reduce a requester channel to a safe file-name component.
///
/// Keeps ASCII alphanumerics, `-`, `_` and `.`; every other character
/// becomes `_`. Leading dots are replaced so the result can never be a
/// hidden file or a `..` path segment. Empty or absent channels map to
/// [`UNKNOWN_CHANNEL`].
pub fn sanitize_channel(channel: Option<&str>) -> String {
    let raw = channel.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return UNKNOWN_CHANNEL.to_string();
    }

    let mut out: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if out.starts_with('.') {
        out = out.replacen('.', "_", 1);
    }
    out
}

/// Stored file name for the `index`-th asset of a channel.
///
/// Convention: `{channel}_{index}.png`. A later upload to the same
/// channel reuses the same ordinals.
pub fn result_asset_filename(channel: &str, index: usize) -> String {
    format!("{channel}_{index}.png")
}
