//! Archive-level metadata supplied by the user
//!
//! Most fields are templates: `{name}` style placeholders are substituted by
//! [`ZimConfig::format`] once the run knows their values (`name`, `period`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::ConfigError;

pub const MAX_TITLE_LENGTH: usize = 30;
pub const MAX_DESCRIPTION_LENGTH: usize = 80;
pub const MAX_LONG_DESCRIPTION_LENGTH: usize = 4000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZimConfig {
    pub file_name: String,
    pub name: String,
    pub title: String,
    pub publisher: String,
    pub creator: String,
    pub description: String,
    pub long_description: Option<String>,
    /// Semicolon separated
    pub tags: String,
    pub secondary_color: String,
}

impl Default for ZimConfig {
    fn default() -> Self {
        Self {
            file_name: "{name}_{period}".to_string(),
            name: String::new(),
            title: String::new(),
            publisher: "openZIM".to_string(),
            creator: String::new(),
            description: String::new(),
            long_description: None,
            tags: String::new(),
            secondary_color: "#FFFFFF".to_string(),
        }
    }
}

impl ZimConfig {
    /// Returns a copy with placeholders substituted in every templated
    /// field (publisher, creator and secondary color are taken verbatim),
    /// then checks field lengths.
    pub fn format(&self, placeholders: &BTreeMap<&str, String>) -> Result<ZimConfig, ConfigError> {
        let formatted = ZimConfig {
            file_name: format_template(&self.file_name, placeholders)?,
            name: format_template(&self.name, placeholders)?,
            title: format_template(&self.title, placeholders)?,
            publisher: self.publisher.clone(),
            creator: self.creator.clone(),
            description: format_template(&self.description, placeholders)?,
            long_description: match &self.long_description {
                Some(value) if !value.is_empty() => Some(format_template(value, placeholders)?),
                _ => None,
            },
            tags: format_template(&self.tags, placeholders)?,
            secondary_color: self.secondary_color.clone(),
        };

        formatted.validate()?;
        Ok(formatted)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_length("title", &self.title, MAX_TITLE_LENGTH)?;
        check_length("description", &self.description, MAX_DESCRIPTION_LENGTH)?;
        if let Some(long_description) = &self.long_description {
            check_length(
                "long description",
                long_description,
                MAX_LONG_DESCRIPTION_LENGTH,
            )?;
            let description = self.description.chars().count();
            let long = long_description.chars().count();
            if long <= description {
                return Err(ConfigError::LongDescriptionTooShort {
                    description,
                    long_description: long,
                });
            }
        }
        Ok(())
    }

    pub fn tags_list(&self) -> Vec<String> {
        self.tags
            .split(';')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn check_length(field: &'static str, value: &str, limit: usize) -> Result<(), ConfigError> {
    let length = value.chars().count();
    if length > limit {
        return Err(ConfigError::FieldTooLong {
            field,
            length,
            limit,
        });
    }
    Ok(())
}

/// Substitutes `{key}` placeholders; `{{` and `}}` stand for literal braces.
pub fn format_template(
    template: &str,
    placeholders: &BTreeMap<&str, String>,
) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                result.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                result.push('}');
            }
            '{' => {
                let mut key = String::new();
                let mut closed = false;
                for k in chars.by_ref() {
                    if k == '}' {
                        closed = true;
                        break;
                    }
                    key.push(k);
                }

                match placeholders.get(key.as_str()) {
                    Some(value) if closed => result.push_str(value),
                    _ => {
                        return Err(ConfigError::InvalidPlaceholder {
                            placeholder: format!("'{}'", key),
                            template: template.to_string(),
                            valid: placeholders.keys().cloned().collect::<Vec<_>>().join(", "),
                        })
                    }
                }
            }
            _ => result.push(c),
        }
    }

    Ok(result)
}
