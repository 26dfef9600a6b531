use crate::github::{GitHubError, RepositoryCoordinates};

/// Derive `(owner, name)` from a repository reference URL by taking its last
/// two path segments, e.g. `https://api.github.com/repos/rust-lang/cargo`.
///
/// Empty segments (trailing or doubled slashes) are ignored. Fewer than two
/// remaining segments is a `MalformedReference`.
pub fn derive_coordinates(reference: &str) -> Result<RepositoryCoordinates, GitHubError> {
    let mut segments = reference
        .trim()
        .rsplit('/')
        .filter(|segment| !segment.is_empty());

    match (segments.next(), segments.next()) {
        (Some(name), Some(owner)) => Ok(RepositoryCoordinates {
            owner: owner.to_string(),
            name: name.to_string(),
        }),
        _ => Err(GitHubError::MalformedReference(reference.to_string())),
    }
}
