//! The `<title>-<resolution>.<container>` filename grammar.
//!
//! Titles may themselves contain hyphens, so parsing splits at the **last**
//! hyphen before the extension. The resolution token and the extension are
//! matched case-insensitively; anything else is [`Error::MalformedName`]
//! and callers skip the file.

use std::path::Path;

use crate::error::{Error, Result};
use crate::media::{Container, Resolution};

/// Parse a file name (not a full path) into `(title, resolution, container)`.
pub fn parse_filename(name: &str) -> Result<(String, Resolution, Container)> {
    let (stem, ext) = name
        .rsplit_once('.')
        .ok_or_else(|| Error::malformed_name(name))?;

    let container = Container::from_extension(ext).ok_or_else(|| Error::malformed_name(name))?;

    let (title, token) = stem
        .rsplit_once('-')
        .ok_or_else(|| Error::malformed_name(name))?;

    let resolution = Resolution::from_token(token).ok_or_else(|| Error::malformed_name(name))?;

    if title.is_empty() {
        return Err(Error::malformed_name(name));
    }

    Ok((title.to_string(), resolution, container))
}

/// Parse the base name of a path.
pub fn parse_path(path: &Path) -> Result<(String, Resolution, Container)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::malformed_name(path.to_string_lossy()))?;
    parse_filename(name)
}

/// Compose the canonical file name for a catalog key.
pub fn compose_filename(title: &str, resolution: Resolution, container: Container) -> String {
    format!("{title}-{resolution}.{container}")
}
