use crate::error::StagingError;

/// Maps an object key to the file name it is staged under.
///
/// Returns `Ok(None)` for folder placeholder keys (ending in `/`), which
/// carry no migration content. The name is the key's final `/` segment,
/// preserved verbatim.
pub fn staged_file_name(key: &str) -> Result<Option<&str>, StagingError> {
    if key.ends_with('/') {
        return Ok(None);
    }

    let name = key.rsplit('/').next().unwrap_or(key);
    if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
        return Err(StagingError::InvalidKey {
            key: key.to_string(),
        });
    }

    Ok(Some(name))
}
