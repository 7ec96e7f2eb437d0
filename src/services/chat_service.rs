use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::upstream::{ChatMessage, CompletionRequest, LanguageModel, UpstreamError};

const CHAT_SYSTEM_PROMPT: &str = "You are a knowledgeable financial assistant for Stonklytics, a stock market analytics platform. \
Help users understand stocks, markets, investing strategies and financial concepts through short, conversational, step-by-step guidance.\n\
- Keep replies to 2-4 sentences and ask at most one follow-up question at a time.\n\
- Answer directly only when the question is specific and factual, or the user asks for a direct answer.\n\
- Build on earlier turns of the conversation when relevant.\n\
- Remind users that you provide educational information, not financial advice.\n\
- Stay on finance topics and politely redirect anything else.";

const NEWS_ITEM_COUNT: usize = 5;

/// One prior turn as sent by the web client: `{role, parts: [{text}]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<HistoryPart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryPart {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchlistStock {
    pub ticker: Option<String>,
}

/// Watchlist the user imported into the chat.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatWatchlist {
    pub name: Option<String>,
    #[serde(default)]
    pub stocks: Vec<WatchlistStock>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub watchlist: Option<ChatWatchlist>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub message: String,
    pub role: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketNews {
    pub news: Vec<Value>,
    pub generated_at: String,
    pub source: &'static str,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message is required")]
    EmptyMessage,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Assistant chat and AI-written market news. Neither is cached.
#[derive(Clone)]
pub struct ChatService {
    llm: Arc<dyn LanguageModel>,
}

impl ChatService {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let mut messages = vec![ChatMessage::system(CHAT_SYSTEM_PROMPT)];
        messages.extend(request.history.iter().filter_map(history_message));

        let mut user_turn = message.to_string();
        if let Some(context) = request.watchlist.as_ref().and_then(watchlist_context) {
            user_turn.push_str(&context);
        }
        messages.push(ChatMessage::user(user_turn));

        let reply = self.llm.complete(CompletionRequest::new(messages)).await?;
        Ok(ChatReply {
            message: reply,
            role: "model",
        })
    }

    /// A handful of generated headlines. Output that does not parse as a JSON
    /// array yields a single placeholder item rather than an error.
    pub async fn market_news(&self) -> Result<MarketNews, UpstreamError> {
        let now = Utc::now();
        let generated_at = now.format("%B %d, %Y").to_string();
        let prompt = news_prompt(&generated_at, &now.format("%I:%M %p").to_string());

        let raw = self
            .llm
            .complete(CompletionRequest::new(vec![ChatMessage::user(prompt)]))
            .await?;

        let news = match serde_json::from_str::<Vec<Value>>(strip_code_fences(&raw)) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Market news output was not a JSON array: {}", e);
                vec![default_news_item()]
            }
        };

        Ok(MarketNews {
            news,
            generated_at,
            source: "ai_generated",
        })
    }
}

fn history_message(entry: &HistoryEntry) -> Option<ChatMessage> {
    let text = entry.parts.first().map(|part| part.text.as_str())?;
    if text.is_empty() {
        return None;
    }
    match entry.role.as_deref() {
        Some("model") | Some("assistant") => Some(ChatMessage::assistant(text)),
        _ => Some(ChatMessage::user(text)),
    }
}

fn watchlist_context(watchlist: &ChatWatchlist) -> Option<String> {
    let tickers: Vec<&str> = watchlist
        .stocks
        .iter()
        .filter_map(|stock| stock.ticker.as_deref())
        .filter(|ticker| !ticker.is_empty())
        .collect();
    if tickers.is_empty() {
        return None;
    }

    let name = watchlist.name.as_deref().unwrap_or("My Watchlist");
    Some(format!(
        "\n\nIMPORTANT - USER'S WATCHLIST CONTEXT:\n\
         The user has imported their watchlist named '{}' containing these stocks: {}.\n\
         Reference these stocks when relevant, compare them if asked and consider them as the user's portfolio, \
         but introduce them one step at a time.",
        name,
        tickers.join(", ")
    ))
}

fn news_prompt(date: &str, time: &str) -> String {
    format!(
        r#"You are a financial news analyst. Generate a brief market news summary for today ({date}).

Provide exactly {count} news items as a JSON array. Return ONLY valid JSON, no markdown and no code blocks:

[
  {{
    "id": 1,
    "headline": "Brief news headline here",
    "summary": "2-3 sentence summary of the news and its market impact",
    "category": "one of: Markets, Tech, Economy, Earnings, Crypto, Energy, Healthcare",
    "sentiment": "one of: positive, negative, neutral",
    "time": "relative time such as '2 hours ago' or 'Just now'"
  }}
]

Focus on major market movements, tech stocks, economic indicators, notable earnings and global trends. The current time is {time}."#,
        date = date,
        count = NEWS_ITEM_COUNT,
        time = time,
    )
}

/// Remove a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

fn default_news_item() -> Value {
    json!({
        "id": 1,
        "headline": "Market Update",
        "summary": "Unable to generate news at this time. Please try again later.",
        "category": "Markets",
        "sentiment": "neutral"
    })
}
