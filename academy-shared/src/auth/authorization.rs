/// Role-scoped authorization
///
/// Every permission decision in the API goes through this module. A handler
/// loads the caller's account as a [`Principal`] and then asks one of three
/// questions:
///
/// 1. [`require`]: may this role perform the action at all?
/// 2. [`require_tenant`]: may this principal touch records of that academy?
/// 3. [`Principal::scope`]: which rows of a listing may it see?
///
/// # Permission Model
///
/// | Role     | Capabilities                            | Tenant access |
/// |----------|-----------------------------------------|---------------|
/// | `admin`  | all                                     | every academy |
/// | `coach`  | schedule, attendance, results, payments | own academy   |
/// | `member` | none beyond self-service                | own academy   |
///
/// # Example
///
/// ```
/// use academy_shared::auth::authorization::{require, require_tenant, Capability, Principal};
/// use academy_shared::models::account::Role;
///
/// let coach = Principal { id: 2, role: Role::Coach, vendor_id: Some(10) };
///
/// assert!(require(&coach, Capability::ManageSchedule).is_ok());
/// assert!(require_tenant(&coach, 10).is_ok());
/// assert!(require_tenant(&coach, 11).is_err());
/// ```

use sqlx::{Postgres, QueryBuilder};

use crate::models::account::{Account, Role};

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Role lacks the capability
    #[error("Role {role} may not {capability}")]
    InsufficientRole { role: Role, capability: Capability },

    /// Record belongs to another academy
    #[error("Not authorized for vendor {0}")]
    WrongTenant(i64),

    /// Caller is neither the owner nor allowed to act for the owner
    #[error("Not authorized to access this resource")]
    NotOwner,

    /// Target account's role is not below the caller's
    #[error("Role {role} may not act on {target} accounts")]
    NotOutranked { role: Role, target: Role },
}

/// Actions gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Create or change events, trainings, matches and challenges
    ManageSchedule,

    /// Log attendance for other accounts and flip log status
    RecordAttendance,

    /// Record challenge points
    RecordChallengeResult,

    /// Bulk payments and payment status changes
    ManagePayments,

    /// Academy photo and bank details
    ManageVendor,

    /// Edit other accounts of the same academy
    ManageMembers,

    /// Change roles, edit accounts anywhere, delete academies
    Administer,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ManageSchedule => "manage schedule",
            Capability::RecordAttendance => "record attendance",
            Capability::RecordChallengeResult => "record challenge results",
            Capability::ManagePayments => "manage payments",
            Capability::ManageVendor => "manage vendor",
            Capability::ManageMembers => "manage members",
            Capability::Administer => "administer",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    /// Whether this role carries the capability
    pub fn allows(&self, capability: Capability) -> bool {
        match self {
            Role::Admin => true,
            Role::Coach => !matches!(capability, Capability::Administer),
            Role::Member => false,
        }
    }
}

/// Authenticated account as seen by permission checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
    pub vendor_id: Option<i64>,
}

impl From<&Account> for Principal {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            role: account.role,
            vendor_id: account.vendor_id,
        }
    }
}

/// Which rows a listing may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordScope {
    All,
    Tenant(i64),
    Own(i64),
}

/// How a record type is shared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Academy-wide records (events, trainings, matches, challenges)
    Tenant,

    /// Records about one account (accounts, logs, payments)
    Personal,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Listing scope for a record type
    ///
    /// Members see their academy's schedule but only their own personal
    /// records. A non-admin without an academy falls back to `Own`.
    pub fn scope(&self, visibility: Visibility) -> RecordScope {
        match (self.role, visibility, self.vendor_id) {
            (Role::Admin, _, _) => RecordScope::All,
            (Role::Member, Visibility::Personal, _) => RecordScope::Own(self.id),
            (_, _, Some(vendor_id)) => RecordScope::Tenant(vendor_id),
            (_, _, None) => RecordScope::Own(self.id),
        }
    }
}

impl RecordScope {
    /// Appends the scope as `AND ...` conditions to a query that already has
    /// a `WHERE` clause
    ///
    /// Tables without an owner column yield no rows for `Own`.
    pub fn push_filter(
        &self,
        builder: &mut QueryBuilder<'_, Postgres>,
        tenant_column: &str,
        owner_column: Option<&str>,
    ) {
        match (self, owner_column) {
            (RecordScope::All, _) => {}
            (RecordScope::Tenant(vendor_id), _) => {
                builder
                    .push(" AND ")
                    .push(tenant_column)
                    .push(" = ")
                    .push_bind(*vendor_id);
            }
            (RecordScope::Own(account_id), Some(owner)) => {
                builder
                    .push(" AND ")
                    .push(owner)
                    .push(" = ")
                    .push_bind(*account_id);
            }
            (RecordScope::Own(_), None) => {
                builder.push(" AND FALSE");
            }
        }
    }
}

/// Checks that the principal's role carries a capability
pub fn require(principal: &Principal, capability: Capability) -> Result<(), AuthzError> {
    if principal.role.allows(capability) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole {
            role: principal.role,
            capability,
        })
    }
}

/// Checks that the principal may act on records of an academy
pub fn require_tenant(principal: &Principal, vendor_id: i64) -> Result<(), AuthzError> {
    if principal.is_admin() || principal.vendor_id == Some(vendor_id) {
        Ok(())
    } else {
        Err(AuthzError::WrongTenant(vendor_id))
    }
}

/// Capability check followed by a tenant check
pub fn require_in_tenant(
    principal: &Principal,
    capability: Capability,
    vendor_id: i64,
) -> Result<(), AuthzError> {
    require(principal, capability)?;
    require_tenant(principal, vendor_id)
}

/// Checks that the principal may act on behalf of an account
///
/// Allowed for the account itself and for admins. Anyone else needs
/// `capability`, must share the account's academy, and must hold a role
/// strictly above the account's: a coach manages members, never other
/// coaches or admins.
pub fn require_self_or(
    principal: &Principal,
    target: &Principal,
    capability: Capability,
) -> Result<(), AuthzError> {
    if principal.id == target.id || principal.is_admin() {
        return Ok(());
    }

    require(principal, capability)?;

    if target.role >= principal.role {
        return Err(AuthzError::NotOutranked {
            role: principal.role,
            target: target.role,
        });
    }

    match target.vendor_id {
        Some(vendor_id) => require_tenant(principal, vendor_id),
        None => Err(AuthzError::NotOwner),
    }
}
