//! sea-orm entities for the enrollments service.

pub mod enrollment_status_history;
pub mod enrollments;
pub mod institutions;
pub mod outbox_events;
pub mod partner_members;
pub mod polo_members;
pub mod simplified_enrollment_status_logs;
pub mod simplified_enrollments;
pub mod student_profiles;
pub mod users;
