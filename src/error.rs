use thiserror::Error;

pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteleErrorCode {
    UninitializedKeyspace,
    InvalidName,
    InvalidConfig,
    Schema,
    UnresolvedType,
    CyclicType,
    Backend,
}

impl SteleErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            SteleErrorCode::UninitializedKeyspace => "uninitialized_keyspace",
            SteleErrorCode::InvalidName => "invalid_name",
            SteleErrorCode::InvalidConfig => "invalid_config",
            SteleErrorCode::Schema => "schema",
            SteleErrorCode::UnresolvedType => "unresolved_type",
            SteleErrorCode::CyclicType => "cyclic_type",
            SteleErrorCode::Backend => "backend",
        }
    }
}

#[derive(Debug, Error)]
pub enum SteleError {
    #[error("uninitialized keyspace, cannot continue")]
    UninitializedKeyspace,
    #[error("keyspace name does not conform to the keyspace naming rules: {name} ({reason})")]
    InvalidName { name: String, reason: String },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("cannot map declared type: {0}")]
    UnresolvedType(String),
    #[error("cyclic composite type definition: {path}")]
    CyclicType { path: String },
    #[error("store error: {0}")]
    Backend(#[source] BackendError),
}

impl SteleError {
    pub fn backend(err: impl Into<BackendError>) -> Self {
        SteleError::Backend(err.into())
    }

    pub fn code(&self) -> SteleErrorCode {
        match self {
            SteleError::UninitializedKeyspace => SteleErrorCode::UninitializedKeyspace,
            SteleError::InvalidName { .. } => SteleErrorCode::InvalidName,
            SteleError::InvalidConfig(_) => SteleErrorCode::InvalidConfig,
            SteleError::Schema(_) => SteleErrorCode::Schema,
            SteleError::UnresolvedType(_) => SteleErrorCode::UnresolvedType,
            SteleError::CyclicType { .. } => SteleErrorCode::CyclicType,
            SteleError::Backend(_) => SteleErrorCode::Backend,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::{SteleError, SteleErrorCode};

    #[test]
    fn error_code_strings_are_stable() {
        assert_eq!(
            SteleErrorCode::UninitializedKeyspace.as_str(),
            "uninitialized_keyspace"
        );
        assert_eq!(SteleErrorCode::CyclicType.as_str(), "cyclic_type");
        assert_eq!(SteleErrorCode::Backend.as_str(), "backend");
    }

    #[test]
    fn error_code_str_matches_variant_mapping() {
        let err = SteleError::InvalidName {
            name: "bad.name".into(),
            reason: "'.' at position 3".into(),
        };
        assert_eq!(err.code(), SteleErrorCode::InvalidName);
        assert_eq!(err.code_str(), "invalid_name");

        let err = SteleError::Schema("table \"runs\" is not initialized".into());
        assert_eq!(err.code_str(), "schema");
    }
}
