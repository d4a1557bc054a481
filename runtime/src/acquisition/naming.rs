//! `{identifier}.{extension}` naming for acquired files.

use std::path::Path;

/// File name for an acquired asset.
pub fn target_file_name(identifier: &str, extension: &str) -> String {
    format!("{identifier}.{extension}")
}

fn clean_extension(raw: &str) -> Option<String> {
    let ext = raw.trim().trim_start_matches('.').to_ascii_lowercase();
    if !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext)
    } else {
        None
    }
}

/// Extension declared by a `fileType` query parameter.
pub fn query_file_type(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let value = parsed
        .query_pairs()
        .find(|(k, _)| k.eq_ignore_ascii_case("fileType"))
        .map(|(_, v)| v.into_owned())?;
    clean_extension(&value)
}

/// Extension of the `filename` in a `Content-Disposition` header.
pub fn content_disposition_extension(header: &str) -> Option<String> {
    let filename = header.split(';').map(str::trim).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("filename")
            .then(|| value.trim().trim_matches('"').to_string())
    })?;
    let (_, ext) = filename.rsplit_once('.')?;
    clean_extension(ext)
}

/// Extension of a file on disk.
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).and_then(clean_extension)
}
