pub mod results;
pub mod suggest;

pub use results::{FeedSnapshot, FeedUpdate, FetchTicket, ResultFeed, SearchFeeds, Settled};
pub use suggest::{Debouncer, SuggestionList};
