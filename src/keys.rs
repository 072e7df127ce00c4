use thiserror::Error;

/// Longest key accepted for projects, environments and flags.
pub const MAX_KEY_LENGTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("{entity} key is required")]
    Required { entity: &'static str },

    #[error("{entity} key must be 100 characters or less")]
    TooLong { entity: &'static str },

    #[error(
        "{entity} key must be at least 2 characters, start and end with a lowercase letter or number, \
         and contain only lowercase letters, numbers, hyphens and underscores"
    )]
    InvalidFormat { entity: &'static str },
}

/// Validate an identifier shared by flags, environments and projects.
///
/// Accepted keys match `^[a-z0-9][a-z0-9_-]*[a-z0-9]$`, so single characters are rejected.
/// `entity` is the label used in the error message ("Flag", "Environment", ...); each entity
/// validator wraps the returned [`KeyError`] in its own error type.
pub fn validate_key(key: &str, entity: &'static str) -> Result<(), KeyError> {
    if key.is_empty() {
        return Err(KeyError::Required { entity });
    }

    if key.chars().count() > MAX_KEY_LENGTH {
        return Err(KeyError::TooLong { entity });
    }

    let bytes = key.as_bytes();
    let is_edge = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    let is_inner = |b: u8| is_edge(b) || b == b'-' || b == b'_';

    let well_formed = bytes.len() >= 2
        && is_edge(bytes[0])
        && is_edge(bytes[bytes.len() - 1])
        && bytes.iter().all(|&b| is_inner(b));

    if !well_formed {
        return Err(KeyError::InvalidFormat { entity });
    }

    Ok(())
}
