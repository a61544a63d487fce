//! Named layout templates.

use crate::error::{LayoutError, LayoutResult};
use crate::models::snapshot::{validate_level, Snapshot};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static TEMPLATE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9 _-]{1,64}$").expect("template name pattern is valid"));

/// A named, reusable slot layout stored per spec.
///
/// # Validation
///
/// - name must be 1-64 characters of letters, digits, space, `_` or `-`
/// - description max 200 characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Template name (unique within a spec)
    pub name: String,
    /// Free text description
    #[serde(default)]
    pub description: String,
    /// Creation timestamp
    pub created: DateTime<Utc>,
    /// Level the template was captured from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_level: Option<u8>,
    /// Slot contents
    pub layout: Snapshot,
}

impl Template {
    /// Creates a template from a snapshot.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        layout: &Snapshot,
        source_level: Option<u8>,
    ) -> LayoutResult<Self> {
        let name = name.into();
        let description = description.into();
        validate_template_name(&name)?;
        validate_description(&description)?;

        let mut layout = layout.clone();
        layout.is_derived = false;
        layout.source_level = None;
        layout.unavailable.clear();

        Ok(Self {
            name,
            description,
            created: Utc::now(),
            source_level,
            layout,
        })
    }

    /// Checks a template that was not built through [`Template::new`].
    pub fn validate(&self) -> LayoutResult<()> {
        validate_template_name(&self.name)?;
        validate_description(&self.description)?;
        if let Some(level) = self.source_level {
            validate_level(level)?;
        }
        self.layout.validate()
    }

    /// Number of non-empty slots in the template.
    #[must_use]
    pub fn configured_slots(&self) -> usize {
        self.layout.configured_slots()
    }
}

fn validate_description(description: &str) -> LayoutResult<()> {
    let len = description.chars().count();
    if len > 200 {
        return Err(LayoutError::Validation(format!(
            "Template description exceeds maximum length of 200 characters (got {len})"
        )));
    }
    Ok(())
}

/// Validates a template name.
pub fn validate_template_name(name: &str) -> LayoutResult<()> {
    if !TEMPLATE_NAME.is_match(name) {
        return Err(LayoutError::Validation(format!(
            "Invalid template name '{name}'. Use 1-64 letters, digits, spaces, '_' or '-'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SlotAssignment;

    #[test]
    fn test_template_name_validation() {
        assert!(validate_template_name("Leveling AoE").is_ok());
        assert!(validate_template_name("pvp_2-v-2").is_ok());
        assert!(validate_template_name("").is_err());
        assert!(validate_template_name("bad/name").is_err());
        assert!(validate_template_name(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_template_strips_derived_state() {
        let mut snapshot = Snapshot::new(20);
        snapshot
            .set(1, SlotAssignment::spell("Fireball", "Rank 3"))
            .unwrap();
        snapshot.is_derived = true;
        snapshot.source_level = Some(10);

        let template = Template::new("Base", "", &snapshot, Some(20)).unwrap();
        assert!(!template.layout.is_derived);
        assert_eq!(template.layout.source_level, None);
        assert_eq!(template.configured_slots(), 1);
        assert_eq!(template.source_level, Some(20));
    }

    #[test]
    fn test_validate_checks_name_and_layout() {
        let snapshot = Snapshot::new(20);
        let mut template = Template::new("Base", "", &snapshot, Some(20)).unwrap();
        assert!(template.validate().is_ok());

        template.name = "bad/name".to_string();
        assert!(template.validate().is_err());

        template.name = "Base".to_string();
        template.layout.level = 0;
        assert!(template.validate().is_err());
    }

    #[test]
    fn test_template_description_limit() {
        let snapshot = Snapshot::new(1);
        assert!(Template::new("x", "d".repeat(201), &snapshot, None).is_err());
    }
}
