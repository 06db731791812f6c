/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// ROLE CONSTANTS (wire values of the `role` token claim)
// =============================================================================

pub const ROLE_CITIZEN: &str = "citizen";

pub const ROLE_DRIVER: &str = "driver";

pub const ROLE_HOSPITAL_ADMIN: &str = "hospital_admin";

pub const ROLE_BLOOD_BANK_ADMIN: &str = "blood_bank_admin";

pub const ROLE_SUPER_ADMIN: &str = "super_admin";

// =============================================================================
// NOTIFICATION COPY
// =============================================================================

pub const TITLE_AMBULANCE_ASSIGNED: &str = "Ambulance Assigned";

pub const TITLE_NEW_ASSIGNMENT: &str = "New Booking Assigned";

pub const TITLE_BOOKING_STATUS_UPDATED: &str = "Booking Status Updated";

pub const TITLE_BOOKING_CANCELLED: &str = "Booking Cancelled";

pub const TITLE_AMBULANCE_APPROVED: &str = "Ambulance Approved";
