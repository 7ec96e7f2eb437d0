pub mod chat_service;
pub mod quote_service;
pub mod read_through;
pub mod summary_service;
pub mod watchlist_service;

pub use chat_service::{ChatError, ChatReply, ChatRequest, ChatService, MarketNews};
pub use quote_service::{PriceHistory, QuoteResponse, QuoteService, QuoteSnapshot};
pub use read_through::{read_through, read_through_or_fallback};
pub use summary_service::{StockSummary, SummaryError, SummaryPayload, SummaryService};
pub use watchlist_service::{Signup, WatchlistError, WatchlistService};
