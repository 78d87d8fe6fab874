pub(crate) mod de;

pub mod banner;
pub mod booking;
pub mod filter;
pub mod inquiry;
pub mod money;
pub mod pagination;
pub mod user;
pub mod warehouse;

pub use banner::{Banner, BannerKind};
pub use booking::{
    BookingRecord, BookingStats, BookingStatus, InquiryStatus, RawBooking, RecordKey, RecordKind,
    RecordStatus, RecordType,
};
pub use filter::{Filter, FilterParams, ListingQuery, RangeTrack};
pub use inquiry::{PartnerInquiry, PartnerInquiryStatus};
pub use money::Paise;
pub use pagination::{PageNav, Pagination};
pub use user::{ProfileUpdate, Role, UserProfile};
pub use warehouse::Warehouse;
