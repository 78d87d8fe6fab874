pub mod api_client;
pub mod inflight;
pub mod metrics;

pub use api_client::{BookingPage, InquiryScope, Listing, LoginSession, MarketplaceClient};
pub use inflight::{InFlight, InFlightGuard};
