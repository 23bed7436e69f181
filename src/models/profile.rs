use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Approval state set by an administrator outside this crate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

/// A row of the `profiles` relation, keyed by the identity id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,

    pub email: String,

    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub birth_date: Option<NaiveDate>,

    #[serde(default)]
    pub rg: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub gender: Option<String>,

    #[serde(default)]
    pub position: Option<String>,

    #[serde(default)]
    pub responsible_name: Option<String>,

    #[serde(default)]
    pub responsible_phone: Option<String>,

    /// Base64 data URL (`data:image/png;base64,...`), never a storage path.
    #[serde(default)]
    pub avatar_url: Option<String>,

    #[serde(default)]
    pub observation: Option<String>,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub status: ApprovalStatus,

    #[serde(default)]
    pub account_status: AccountStatus,

    #[serde(default)]
    pub must_change_password: bool,
}

impl Profile {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    #[must_use]
    pub const fn is_inactive(&self) -> bool {
        matches!(self.account_status, AccountStatus::Inactive)
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Row written at registration time.
///
/// Status fields are fixed by the constructor so a self-registered account can
/// never grant itself approval or the admin role.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub rg: String,
    pub region: String,
    pub gender: Option<String>,
    pub position: Option<String>,
    pub responsible_name: Option<String>,
    pub responsible_phone: Option<String>,
    pub avatar_url: String,
    pub observation: Option<String>,
    role: Role,
    status: ApprovalStatus,
    account_status: AccountStatus,
}

/// Submitted registration fields, before the identity id is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationDetails {
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub rg: String,
    pub region: String,
    pub gender: Option<String>,
    pub position: Option<String>,
    pub responsible_name: Option<String>,
    pub responsible_phone: Option<String>,
    pub avatar_url: String,
    pub observation: Option<String>,
}

impl NewProfile {
    #[must_use]
    pub fn pending(id: Uuid, details: RegistrationDetails) -> Self {
        Self {
            id,
            email: details.email,
            full_name: details.full_name,
            phone: details.phone,
            birth_date: details.birth_date,
            rg: details.rg,
            region: details.region,
            gender: details.gender,
            position: details.position,
            responsible_name: details.responsible_name,
            responsible_phone: details.responsible_phone,
            avatar_url: details.avatar_url,
            observation: details.observation,
            role: Role::User,
            status: ApprovalStatus::Pending,
            account_status: AccountStatus::Active,
        }
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub const fn status(&self) -> ApprovalStatus {
        self.status
    }

    #[must_use]
    pub const fn account_status(&self) -> AccountStatus {
        self.account_status
    }

    /// Same row expressed as a partial update, used when the insert conflicts.
    #[must_use]
    pub fn as_changes(&self) -> ProfileChanges {
        ProfileChanges {
            full_name: Some(Some(self.full_name.clone())),
            phone: Some(Some(self.phone.clone())),
            birth_date: Some(Some(self.birth_date)),
            rg: Some(Some(self.rg.clone())),
            region: Some(Some(self.region.clone())),
            gender: Some(self.gender.clone()),
            position: Some(self.position.clone()),
            responsible_name: Some(self.responsible_name.clone()),
            responsible_phone: Some(self.responsible_phone.clone()),
            avatar_url: Some(Some(self.avatar_url.clone())),
            observation: Some(self.observation.clone()),
            role: Some(self.role),
            status: Some(self.status),
            account_status: Some(self.account_status),
            must_change_password: None,
        }
    }
}

/// Partial update of a profile row.
///
/// Outer `None` leaves the column untouched, `Some(None)` writes `null`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProfileChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Option<NaiveDate>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rg: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_name: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_phone: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApprovalStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_status: Option<AccountStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_change_password: Option<bool>,
}

impl ProfileChanges {
    #[must_use]
    pub fn clear_password_flag() -> Self {
        Self {
            must_change_password: Some(false),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> RegistrationDetails {
        RegistrationDetails {
            email: "ana@club.test".to_string(),
            full_name: "Ana Souza".to_string(),
            phone: "11987654321".to_string(),
            birth_date: NaiveDate::from_ymd_opt(2008, 3, 14).unwrap(),
            rg: "12.345.678-9".to_string(),
            region: "Zona Sul".to_string(),
            gender: None,
            position: Some("Goleira".to_string()),
            responsible_name: None,
            responsible_phone: None,
            avatar_url: "data:image/png;base64,AAAA".to_string(),
            observation: None,
        }
    }

    #[test]
    fn test_profile_deserializes_remote_row() {
        let row = serde_json::json!({
            "id": "7f1c2d1e-56a4-4b8e-9a55-3c0b1f2c9a10",
            "email": "ana@club.test",
            "full_name": "Ana Souza",
            "birth_date": "2008-03-14",
            "avatar_url": null,
            "role": "admin",
            "status": "approved",
            "account_status": "inactive",
            "must_change_password": true
        });

        let profile: Profile = serde_json::from_value(row).unwrap();
        assert!(profile.is_admin());
        assert!(profile.is_inactive());
        assert_eq!(profile.status, ApprovalStatus::Approved);
        assert!(profile.must_change_password);
        assert_eq!(profile.birth_date, NaiveDate::from_ymd_opt(2008, 3, 14));
        assert!(profile.phone.is_none());
    }

    #[test]
    fn test_new_profile_is_pending_active_user() {
        let row = NewProfile::pending(Uuid::new_v4(), details());
        let json = serde_json::to_value(&row).unwrap();

        assert_eq!(json["status"], "pending");
        assert_eq!(json["account_status"], "active");
        assert_eq!(json["role"], "user");
        assert_eq!(json["birth_date"], "2008-03-14");
    }

    #[test]
    fn test_changes_serialize_only_touched_columns() {
        let changes = ProfileChanges {
            phone: Some(Some("11987654321".to_string())),
            observation: Some(None),
            ..ProfileChanges::default()
        };

        let json = serde_json::to_value(&changes).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(json["phone"], "11987654321");
        assert!(json["observation"].is_null());
    }

    #[test]
    fn test_clear_password_flag() {
        let json = serde_json::to_value(ProfileChanges::clear_password_flag()).unwrap();
        assert_eq!(json, serde_json::json!({ "must_change_password": false }));
        assert!(ProfileChanges::default().is_empty());
    }
}
