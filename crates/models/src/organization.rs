use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;

/// Identifier of an organization.
pub type OrganizationId = Uuid;

/// Membership status of the user within an organization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationUserStatus {
    Invited,
    Accepted,
    Confirmed,
    Revoked,
}

/// Role of the user within an organization. `Custom` defers to the
/// per-user permission set on the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationUserRole {
    Owner,
    Admin,
    User,
    Custom,
}

/// Granular permissions granted to a `Custom`-role member.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    pub manage_users: bool,
    pub manage_reset_password: bool,
    pub manage_groups: bool,
    pub manage_policies: bool,
    pub manage_sso: bool,
    pub manage_scim: bool,
    pub manage_device_approvals: bool,
    pub access_import_export: bool,
    pub access_reports: bool,
    pub access_event_logs: bool,
    pub create_new_collections: bool,
    pub edit_any_collection: bool,
}

/// Persisted organization record, a flat shape mirroring the API response.
/// Stored as one entry of the `organizations` record key, keyed by `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrganizationData {
    pub id: OrganizationId,
    pub name: String,
    #[serde(default)]
    pub identifier: Option<String>,
    pub enabled: bool,
    pub status: OrganizationUserStatus,
    pub role: OrganizationUserRole,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub use_policies: bool,
    #[serde(default)]
    pub use_sso: bool,
    #[serde(default)]
    pub use_scim: bool,
    #[serde(default)]
    pub use_groups: bool,
    #[serde(default)]
    pub use_events: bool,
    #[serde(default)]
    pub seats: Option<u32>,
    #[serde(default)]
    pub family_sponsorship_available: bool,
}

impl OrganizationData {
    /// Reject records that would be unusable once persisted.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.id.is_nil() {
            return Err(ModelError::Validation("organization id required".into()));
        }
        if self.name.trim().is_empty() {
            return Err(ModelError::Validation("organization name required".into()));
        }
        Ok(())
    }
}

/// Read-only projection of an [`OrganizationData`] record.
///
/// Rebuilt from the record on every read; never persisted and carries no
/// mutation path. The permission booleans are derived once here so every
/// consumer observes the same policy.
#[derive(Clone, Debug, PartialEq)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub identifier: Option<String>,
    pub enabled: bool,
    pub status: OrganizationUserStatus,
    pub role: OrganizationUserRole,
    pub seats: Option<u32>,

    pub is_owner: bool,
    pub is_admin: bool,
    pub is_member: bool,

    pub can_manage_users: bool,
    pub can_manage_users_password: bool,
    pub can_manage_groups: bool,
    pub can_manage_policies: bool,
    pub can_manage_sso: bool,
    pub can_manage_scim: bool,
    pub can_manage_device_approvals: bool,
    pub can_access_import_export: bool,
    pub can_access_reports: bool,
    pub can_access_event_logs: bool,
    pub can_create_new_collections: bool,
    pub can_view_all_collections: bool,
    pub can_view_assigned_collections: bool,
    pub can_manage_sponsorships: bool,
}

impl From<&OrganizationData> for Organization {
    fn from(data: &OrganizationData) -> Self {
        let is_owner = data.role == OrganizationUserRole::Owner;
        let is_admin = is_owner || data.role == OrganizationUserRole::Admin;
        let is_member = data.status == OrganizationUserStatus::Confirmed;
        let p = data.permissions;

        // Admins hold every granular permission; Custom members hold the
        // ones granted on the record. Product flags (SSO/SCIM/groups/events)
        // gate the matching permission entirely.
        Self {
            id: data.id,
            name: data.name.clone(),
            identifier: data.identifier.clone(),
            enabled: data.enabled,
            status: data.status,
            role: data.role,
            seats: data.seats,

            is_owner,
            is_admin,
            is_member,

            can_manage_users: is_admin || p.manage_users,
            can_manage_users_password: is_admin || p.manage_reset_password,
            can_manage_groups: (is_admin || p.manage_groups) && data.use_groups,
            can_manage_policies: (is_admin || p.manage_policies) && data.use_policies,
            can_manage_sso: (is_admin || p.manage_sso) && data.use_sso,
            can_manage_scim: (is_admin || p.manage_scim) && data.use_scim,
            can_manage_device_approvals: is_admin || p.manage_device_approvals,
            can_access_import_export: is_admin || p.access_import_export,
            can_access_reports: is_admin || p.access_reports,
            can_access_event_logs: (is_admin || p.access_event_logs) && data.use_events,
            can_create_new_collections: is_admin || p.create_new_collections,
            can_view_all_collections: is_admin || p.edit_any_collection,
            can_view_assigned_collections: is_member,
            can_manage_sponsorships: data.family_sponsorship_available && data.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(role: OrganizationUserRole, status: OrganizationUserStatus) -> OrganizationData {
        OrganizationData {
            id: Uuid::new_v4(),
            name: "acme".into(),
            identifier: Some("acme-id".into()),
            enabled: true,
            status,
            role,
            permissions: Permissions::default(),
            use_policies: true,
            use_sso: true,
            use_scim: false,
            use_groups: true,
            use_events: true,
            seats: Some(10),
            family_sponsorship_available: false,
        }
    }

    #[test]
    fn owner_gets_admin_permissions() {
        let org = Organization::from(&record(
            OrganizationUserRole::Owner,
            OrganizationUserStatus::Confirmed,
        ));
        assert!(org.is_owner && org.is_admin && org.is_member);
        assert!(org.can_manage_users);
        assert!(org.can_manage_policies);
        assert!(org.can_view_all_collections);
        // scim flag is off on the record, so even an owner cannot manage it
        assert!(!org.can_manage_scim);
    }

    #[test]
    fn plain_user_gets_no_admin_permissions() {
        let org = Organization::from(&record(
            OrganizationUserRole::User,
            OrganizationUserStatus::Confirmed,
        ));
        assert!(!org.is_admin);
        assert!(org.is_member);
        assert!(!org.can_manage_users);
        assert!(!org.can_access_reports);
        assert!(org.can_view_assigned_collections);
    }

    #[test]
    fn custom_role_follows_permission_set() {
        let mut data = record(
            OrganizationUserRole::Custom,
            OrganizationUserStatus::Confirmed,
        );
        data.permissions.access_reports = true;
        data.permissions.manage_groups = true;
        let org = Organization::from(&data);
        assert!(org.can_access_reports);
        assert!(org.can_manage_groups);
        assert!(!org.can_manage_users);
    }

    #[test]
    fn invited_user_is_not_a_member() {
        let org = Organization::from(&record(
            OrganizationUserRole::User,
            OrganizationUserStatus::Invited,
        ));
        assert!(!org.is_member);
        assert!(!org.can_view_assigned_collections);
    }

    #[test]
    fn validate_rejects_empty_name_and_nil_id() {
        let mut data = record(
            OrganizationUserRole::User,
            OrganizationUserStatus::Confirmed,
        );
        data.name = "  ".into();
        assert!(data.validate().is_err());
        data.name = "acme".into();
        data.id = Uuid::nil();
        assert!(data.validate().is_err());
    }

    #[test]
    fn record_json_round_trip_preserves_fields() {
        let data = record(
            OrganizationUserRole::Admin,
            OrganizationUserStatus::Confirmed,
        );
        let json = serde_json::to_value(&data).expect("serialize");
        let back: OrganizationData = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, data);
    }
}
