use crate::error::{EntityKind, Error, Result};

/// Names become single path segments, so separators and dot entries are rejected.
pub fn validate_name(kind: EntityKind, name: &str) -> Result<()> {
    let problem = if name.is_empty() {
        Some("must not be empty")
    } else if name == "." || name == ".." {
        Some("must not be a dot entry")
    } else if name.contains(['/', '\\', '\0']) {
        Some("must not contain path separators or NUL")
    } else if name.trim() != name {
        Some("must not start or end with whitespace")
    } else {
        None
    };

    match problem {
        Some(reason) => Err(Error::Validation(format!(
            "{} name '{}' {}",
            kind,
            name.escape_default(),
            reason
        ))),
        None => Ok(()),
    }
}
