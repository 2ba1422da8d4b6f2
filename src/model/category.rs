use crate::error::{Error, ErrorType};
use crate::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A spending category, e.g. "Groceries".
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Category {
    /// Synthetic auto-increment primary key.
    pub id: i64,
    /// Unique display name.
    pub name: String,
}

/// Trims a user-supplied category name and rejects an empty one.
pub(crate) fn clean_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::msg(
            ErrorType::Validation,
            "A category name is required",
        ));
    }
    Ok(trimmed)
}
