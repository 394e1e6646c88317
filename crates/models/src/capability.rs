//! Central capability predicate table.
//!
//! Admin-console gating (tab visibility, admin filtering) is decided by one
//! table keyed by capability name so call sites cannot drift apart.

use crate::organization::Organization;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    VaultTab,
    SettingsTab,
    MembersTab,
    GroupsTab,
    ReportingTab,
    BillingTab,
    OrgAdmin,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::VaultTab,
        Capability::SettingsTab,
        Capability::MembersTab,
        Capability::GroupsTab,
        Capability::ReportingTab,
        Capability::BillingTab,
        Capability::OrgAdmin,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Capability::VaultTab => "vault_tab",
            Capability::SettingsTab => "settings_tab",
            Capability::MembersTab => "members_tab",
            Capability::GroupsTab => "groups_tab",
            Capability::ReportingTab => "reporting_tab",
            Capability::BillingTab => "billing_tab",
            Capability::OrgAdmin => "org_admin",
        }
    }

    pub fn by_name(name: &str) -> Option<Capability> {
        Capability::ALL.iter().copied().find(|c| c.name() == name)
    }

    /// Whether the organization grants this capability to the user.
    pub fn allows(self, org: &Organization) -> bool {
        match self {
            Capability::VaultTab => {
                org.can_view_assigned_collections || org.can_view_all_collections
            }
            Capability::SettingsTab => {
                org.is_owner
                    || org.can_manage_policies
                    || org.can_manage_sso
                    || org.can_manage_scim
                    || org.can_access_import_export
                    || org.can_manage_device_approvals
            }
            Capability::MembersTab => org.can_manage_users || org.can_manage_users_password,
            Capability::GroupsTab => org.can_manage_groups,
            Capability::ReportingTab => org.can_access_reports || org.can_access_event_logs,
            Capability::BillingTab => org.is_owner,
            Capability::OrgAdmin => [
                Capability::MembersTab,
                Capability::GroupsTab,
                Capability::ReportingTab,
                Capability::BillingTab,
                Capability::SettingsTab,
                Capability::VaultTab,
            ]
            .iter()
            .any(|tab| tab.allows(org)),
        }
    }
}
