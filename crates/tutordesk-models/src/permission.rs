//! Capability tiers carried by lesson sharing grants.
//!
//! A grant holds exactly one [`PermissionLevel`]. The tiers nest
//! (`view ⊂ edit ⊂ manage`), but callers never compare them numerically:
//! every capability question goes through [`PermissionLevel::can_view`],
//! [`PermissionLevel::can_edit`] or [`PermissionLevel::can_manage`], each an
//! exhaustive `match`, so adding a tier forces every rule to be revisited.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use tutordesk_core::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "permission_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    View,
    Edit,
    Manage,
}

impl PermissionLevel {
    pub const ALL: [PermissionLevel; 3] = [
        PermissionLevel::View,
        PermissionLevel::Edit,
        PermissionLevel::Manage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionLevel::View => "view",
            PermissionLevel::Edit => "edit",
            PermissionLevel::Manage => "manage",
        }
    }

    pub fn can_view(self) -> bool {
        match self {
            PermissionLevel::View | PermissionLevel::Edit | PermissionLevel::Manage => true,
        }
    }

    pub fn can_edit(self) -> bool {
        match self {
            PermissionLevel::Edit | PermissionLevel::Manage => true,
            PermissionLevel::View => false,
        }
    }

    pub fn can_manage(self) -> bool {
        match self {
            PermissionLevel::Manage => true,
            PermissionLevel::View | PermissionLevel::Edit => false,
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(PermissionLevel::View),
            "edit" => Ok(PermissionLevel::Edit),
            "manage" => Ok(PermissionLevel::Manage),
            _ => {
                let valid: Vec<&str> = PermissionLevel::ALL.iter().map(|l| l.as_str()).collect();
                Err(AppError::bad_request(anyhow!(
                    "Invalid permission level '{}'. Must be one of: {}",
                    s,
                    valid.join(", ")
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutordesk_core::ErrorKind;

    #[test]
    fn test_view_grants_only_viewing() {
        let level = PermissionLevel::View;
        assert!(level.can_view());
        assert!(!level.can_edit());
        assert!(!level.can_manage());
    }

    #[test]
    fn test_edit_grants_edit_but_not_manage() {
        let level = PermissionLevel::Edit;
        assert!(level.can_view());
        assert!(level.can_edit());
        assert!(!level.can_manage());
    }

    #[test]
    fn test_manage_grants_everything() {
        let level = PermissionLevel::Manage;
        assert!(level.can_view());
        assert!(level.can_edit());
        assert!(level.can_manage());
    }

    #[test]
    fn test_parse_known_levels() {
        for level in PermissionLevel::ALL {
            assert_eq!(level.as_str().parse::<PermissionLevel>().unwrap(), level);
        }
        assert_eq!(
            " Manage ".parse::<PermissionLevel>().unwrap(),
            PermissionLevel::Manage
        );
    }

    #[test]
    fn test_parse_unknown_level_is_invalid_argument() {
        let err = "owner".parse::<PermissionLevel>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("view, edit, manage"));

        assert!("".parse::<PermissionLevel>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&PermissionLevel::Edit).unwrap(),
            r#""edit""#
        );
        let level: PermissionLevel = serde_json::from_str(r#""manage""#).unwrap();
        assert_eq!(level, PermissionLevel::Manage);
    }
}
