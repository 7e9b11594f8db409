use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialRef {
    Env { var: String },
    InlineToken { token: String },
    None,
}

impl Default for CredentialRef {
    fn default() -> Self {
        CredentialRef::Env {
            var: "TRIAGE_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("missing api key environment variable {var}")]
    MissingEnv { var: String },
    #[error("api key from {source_name} is blank")]
    Blank { source_name: String },
}

/// Resolves the `x-api-key` value. `None` means requests go out without one.
pub fn resolve_api_key(reference: &CredentialRef) -> Result<Option<String>, CredentialError> {
    match reference {
        CredentialRef::Env { var } => {
            let key = env::var(var).map_err(|_| CredentialError::MissingEnv { var: var.clone() })?;
            non_blank(key, var).map(Some)
        }
        CredentialRef::InlineToken { token } => non_blank(token.clone(), "inline token").map(Some),
        CredentialRef::None => Ok(None),
    }
}

fn non_blank(key: String, source_name: &str) -> Result<String, CredentialError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(CredentialError::Blank {
            source_name: source_name.to_string(),
        });
    }
    Ok(trimmed.to_string())
}
