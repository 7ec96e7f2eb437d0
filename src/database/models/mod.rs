pub mod profile;
pub mod watchlist;

pub use profile::Profile;
pub use watchlist::{Watchlist, WatchlistItem, WatchlistWithItems};
