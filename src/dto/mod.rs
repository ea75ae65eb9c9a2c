//! View models assembled by services for templates and JSON responses.

pub mod bookings;
pub mod catalog;
pub mod offers;
pub mod quotes;

use serde::Deserialize;

/// Query parameters shared by paginated list pages.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub status: Option<String>,
    pub search: Option<String>,
    /// Clinic selector for staff working at several clinics.
    pub clinic: Option<i32>,
}

/// Badge counters shown in the navigation bar.
#[derive(Debug, Default, Clone, Copy, serde::Serialize, PartialEq, Eq)]
pub struct UnreadCounts {
    pub messages: usize,
    pub notifications: usize,
}
