//! Well-known role name constants.
//!
//! These must match the seed data in `0001_create_auth_tables.sql`.

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_MANAGER: &str = "MANAGER";
pub const ROLE_STAFF: &str = "STAFF";
pub const ROLE_RECEPTIONIST: &str = "RECEPTIONIST";
pub const ROLE_CUSTOMER: &str = "CUSTOMER";

/// Role assigned at registration when the request names none.
pub const DEFAULT_ROLE: &str = ROLE_CUSTOMER;

/// Seeded roles with their descriptions, in id order.
pub const SEEDED_ROLES: [(&str, &str); 5] = [
    (ROLE_ADMIN, "Full administrative access"),
    (ROLE_MANAGER, "Garage manager"),
    (ROLE_STAFF, "Mechanic or workshop staff"),
    (ROLE_RECEPTIONIST, "Front desk and scheduling"),
    (ROLE_CUSTOMER, "Registered customer"),
];
