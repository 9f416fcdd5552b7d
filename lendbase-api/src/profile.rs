//! Per-entity configuration.
//!
//! Each entity kind the platform exposes is described by one const
//! [`EntityProfile`]: its URL path, identity field, which operations it
//! supports and which query parameters the server accepts for it. The
//! service dispatches on capability presence instead of per-entity types.

use crate::error::{ApiError, ApiResult};

/// One operation an entity kind may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Get,
    List,
    Search,
    Create,
    Update,
    Patch,
    Delete,
}

impl Capability {
    fn as_str(&self) -> &'static str {
        match self {
            Capability::Get => "get",
            Capability::List => "list",
            Capability::Search => "search",
            Capability::Create => "create",
            Capability::Update => "update",
            Capability::Patch => "patch",
            Capability::Delete => "delete",
        }
    }
}

/// Static description of one entity kind.
#[derive(Debug, Clone, Copy)]
pub struct EntityProfile {
    /// Human-readable entity name, used in error messages.
    pub entity_type: &'static str,
    /// URL path segment under the base URL.
    pub url_path: &'static str,
    /// Field whose value identifies a record on the server.
    pub identity_field: &'static str,
    /// Query filter keys the server accepts for this entity.
    pub allowed_filters: &'static [&'static str],
    /// Fields the server can sort by.
    pub allowed_sort_fields: &'static [&'static str],
    /// Operations this entity kind supports.
    pub capabilities: &'static [Capability],
    /// Fields excluded from type coercion on top of the defaults.
    pub coercion_exclusions: &'static [&'static str],
}

impl EntityProfile {
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Errors with [`ApiError::Unsupported`] when the capability is absent.
    pub fn require(&self, capability: Capability) -> ApiResult<()> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(ApiError::Unsupported {
                entity: self.entity_type,
                operation: capability.as_str(),
            })
        }
    }
}

/// Built-in profiles for the platform's core entity kinds.
pub mod profiles {
    use super::{Capability, EntityProfile};

    const ALL: &[Capability] = &[
        Capability::Get,
        Capability::List,
        Capability::Search,
        Capability::Create,
        Capability::Update,
        Capability::Patch,
        Capability::Delete,
    ];

    pub const CLIENT: EntityProfile = EntityProfile {
        entity_type: "client",
        url_path: "clients",
        identity_field: "encodedKey",
        allowed_filters: &[
            "branchId",
            "centreId",
            "creditOfficerUsername",
            "firstName",
            "lastName",
            "idNumber",
            "state",
        ],
        allowed_sort_fields: &["creationDate", "lastModifiedDate", "firstName", "lastName"],
        capabilities: ALL,
        coercion_exclusions: &["idNumber", "preferredLanguage"],
    };

    pub const GROUP: EntityProfile = EntityProfile {
        entity_type: "group",
        url_path: "groups",
        identity_field: "encodedKey",
        allowed_filters: &["branchId", "centreId", "creditOfficerUsername", "groupName"],
        allowed_sort_fields: &["creationDate", "lastModifiedDate", "groupName"],
        capabilities: ALL,
        coercion_exclusions: &[],
    };

    pub const BRANCH: EntityProfile = EntityProfile {
        entity_type: "branch",
        url_path: "branches",
        identity_field: "encodedKey",
        allowed_filters: &[],
        allowed_sort_fields: &["creationDate", "lastModifiedDate", "name"],
        capabilities: &[Capability::Get, Capability::List],
        coercion_exclusions: &["phoneNumber"],
    };

    pub const LOAN_ACCOUNT: EntityProfile = EntityProfile {
        entity_type: "loan account",
        url_path: "loans",
        identity_field: "encodedKey",
        allowed_filters: &[
            "accountHolderId",
            "accountHolderType",
            "accountState",
            "branchId",
            "centreId",
            "creditOfficerUsername",
        ],
        allowed_sort_fields: &["creationDate", "lastModifiedDate", "loanAmount"],
        capabilities: ALL,
        coercion_exclusions: &["accountHolderKey", "productTypeKey"],
    };

    pub const USER: EntityProfile = EntityProfile {
        entity_type: "user",
        url_path: "users",
        identity_field: "encodedKey",
        allowed_filters: &["branchId", "username", "email"],
        allowed_sort_fields: &["creationDate", "lastModifiedDate", "username"],
        capabilities: &[Capability::Get, Capability::List, Capability::Patch],
        coercion_exclusions: &["username", "email"],
    };

    pub const TASK: EntityProfile = EntityProfile {
        entity_type: "task",
        url_path: "tasks",
        identity_field: "encodedKey",
        allowed_filters: &["username", "clientId", "groupId", "status"],
        allowed_sort_fields: &["creationDate", "dueDate"],
        capabilities: &[
            Capability::Get,
            Capability::List,
            Capability::Create,
            Capability::Update,
            Capability::Delete,
        ],
        coercion_exclusions: &[],
    };
}
