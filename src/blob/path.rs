use std::path::{Component, Path, PathBuf};

const MAX_NAME_LEN: usize = 100;
const MAX_FILENAME_LEN: usize = 255;

fn is_valid_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
}

/// Checks that an application or service name is safe to use as a single
/// directory segment under the blob root.
pub fn validate_name(name: &str, entity: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("{entity} name cannot be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!(
            "{entity} name cannot exceed {MAX_NAME_LEN} characters"
        ));
    }
    if !name.chars().all(is_valid_name_char) {
        return Err(format!(
            "{entity} name can only contain alphanumeric characters, hyphens, underscores, and periods"
        ));
    }
    // Also rules out "." and "..", and keeps the app-level directory name
    // out of reach of service names.
    if name.starts_with(['-', '_', '.']) {
        return Err(format!(
            "{entity} name cannot start with a hyphen, underscore, or period"
        ));
    }
    Ok(())
}

/// Checks an uploaded file's original name. It becomes the tail of the blob
/// filename, so it must not carry any directory structure.
pub fn validate_filename(filename: &str) -> Result<(), String> {
    if filename.is_empty() {
        return Err("filename cannot be empty".to_string());
    }
    if filename.len() > MAX_FILENAME_LEN {
        return Err(format!(
            "filename cannot exceed {MAX_FILENAME_LEN} bytes"
        ));
    }
    if filename.contains(['/', '\\']) {
        return Err("filename cannot contain path separators".to_string());
    }
    if filename.chars().any(char::is_control) {
        return Err("filename contains invalid characters".to_string());
    }
    if filename.starts_with('.') {
        return Err("filename cannot start with a period".to_string());
    }
    Ok(())
}

/// Joins a stored relative path onto `root`, refusing anything that would
/// land outside of it.
pub fn resolve_relative(root: &Path, relative: &str) -> Option<PathBuf> {
    if relative.is_empty() {
        return None;
    }
    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(segment) => resolved.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}
