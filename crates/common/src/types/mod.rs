use uuid::Uuid;

/// Identifier of an account known to the process.
pub type UserId = Uuid;

/// Identifier of an organization the user belongs to.
pub type OrganizationId = Uuid;
