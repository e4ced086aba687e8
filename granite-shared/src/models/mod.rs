/// Data models for Granite Flow
///
/// Rows are owned by the remote gateway; these types mirror its tables and
/// carry the small amount of logic that belongs to the data itself.
///
/// # Models
///
/// - `session`: Sessions and authenticated identities
/// - `role`: Role assignments (member / org_admin / system_admin)
/// - `profile`: User profiles
/// - `task`: Tasks, statuses, priorities and write payloads
/// - `organization`: Organizations (read only)

pub mod organization;
pub mod profile;
pub mod role;
pub mod session;
pub mod task;
