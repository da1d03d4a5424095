// Export components
pub mod google_calendar;
pub mod identity_cache;

// Re-export the component handles and seams
pub use google_calendar::{CalendarGateway, GoogleCalendarHandle};
pub use identity_cache::{IdentityCache, IdentityCacheHandle};
