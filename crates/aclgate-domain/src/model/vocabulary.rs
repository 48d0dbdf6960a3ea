//! Resource types and relations used across the gateway.

/// Resource and subject type names.
pub mod resource_type {
    pub const ROLES: &str = "roles";
    pub const SUPERROOT: &str = "superroot";
    pub const GLOBALUSER: &str = "globaluser";
    pub const API: &str = "api";
    pub const PAGE: &str = "page";
    pub const PARTNER: &str = "partner";
    pub const ADVERTISER: &str = "advertiser";
    pub const PUBLISHER: &str = "publisher";
    pub const FEATURE: &str = "feature";
    pub const USERS: &str = "users";
}

/// Relation names.
pub mod relation {
    pub const USER: &str = "user";
    pub const SCOPE: &str = "scope";
    pub const SUPERADMIN: &str = "superadmin";
    pub const GLOBALUSER: &str = "globaluser";
    pub const GLOBALADMIN: &str = "globaladmin";
    pub const PARENT: &str = "parent";
    pub const ROOT: &str = "root";
    pub const ROLE: &str = "role";
    pub const PUBLIC: &str = "public";
    pub const GLOBAL: &str = "global";
    pub const DENIED_USER: &str = "denied_user";
    pub const FEATURE: &str = "feature";
}
