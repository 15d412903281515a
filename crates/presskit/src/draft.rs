//! The press-kit draft edited by the CLI.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Editable fields, in display order.
pub const FIELDS: &[&str] = &["title", "bio", "genre", "links"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("Unknown field: {0} (expected title, bio, genre or links)")]
    Unknown(String),

    #[error("Links are written as name=url")]
    InvalidLink,

    #[error("Field {0} cannot be edited on its own")]
    NotScalar(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressKit {
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bio: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub genre: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, String>,
}

impl PressKit {
    /// Set a field from its text form.
    ///
    /// `links` takes `name=url`; an empty url removes the link.
    pub fn set(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        match field {
            "title" => self.title = value.to_string(),
            "bio" => self.bio = value.to_string(),
            "genre" => self.genre = value.to_string(),
            "links" => {
                let (name, url) = value.split_once('=').ok_or(FieldError::InvalidLink)?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(FieldError::InvalidLink);
                }
                match url.trim() {
                    "" => self.links.remove(name),
                    url => self.links.insert(name.to_string(), url.to_string()),
                };
            }
            other => return Err(FieldError::Unknown(other.to_string())),
        }
        Ok(())
    }

    /// Check that `field` holds a single string value.
    pub fn scalar_field(field: &str) -> Result<(), FieldError> {
        match field {
            "title" | "bio" | "genre" => Ok(()),
            "links" => Err(FieldError::NotScalar(field.to_string())),
            other => Err(FieldError::Unknown(other.to_string())),
        }
    }
}
