use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::SymbolCache;
use crate::types::{Provenance, Symbol};
use crate::upstream::{ChatMessage, CompletionRequest, LanguageModel, MarketData, UpstreamError};

use super::read_through::read_through_or_fallback;

pub const SUMMARY_NAMESPACE: &str = "summary";

const DESCRIPTION_LIMIT: usize = 400;
const FALLBACK_MAX_LINES: usize = 6;

const SYSTEM_PROMPT: &str = "You are a concise financial assistant. \
You summarize company outlooks in neutral, factual language.";

/// Where part of a summary's context came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub title: String,
    pub url: String,
}

/// What gets cached per symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryPayload {
    pub summary: String,
    pub references: Vec<Reference>,
}

/// Response body of `GET /api/summary/{symbol}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockSummary {
    pub symbol: Symbol,
    pub summary: String,
    pub source: Provenance,
    pub references: Vec<Reference>,
}

/// Context lines fed to the model, first line always `Symbol: X`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryContext {
    pub lines: Vec<String>,
    pub references: Vec<Reference>,
}

impl SummaryContext {
    fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// A failed generation keeps whatever context was gathered so the fallback
/// can be built from it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct GenerationFailure {
    pub error: UpstreamError,
    pub context: SummaryContext,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SummaryError {
    #[error("Cannot build a summary for an empty symbol")]
    EmptySymbol,
}

/// AI summaries with a read-through cache and a context-only fallback.
#[derive(Clone)]
pub struct SummaryService {
    market: Arc<dyn MarketData>,
    llm: Arc<dyn LanguageModel>,
    cache: SymbolCache<SummaryPayload>,
}

impl SummaryService {
    pub fn new(market: Arc<dyn MarketData>, llm: Arc<dyn LanguageModel>, cache: SymbolCache<SummaryPayload>) -> Self {
        Self { market, llm, cache }
    }

    /// Summary for `raw_symbol`. Only fails when the symbol is blank after
    /// normalization; vendor failures degrade to a fallback summary.
    pub async fn summarize(&self, raw_symbol: &str, force: bool) -> Result<StockSummary, SummaryError> {
        let symbol = Symbol::normalize(raw_symbol);

        let sourced = read_through_or_fallback(
            &self.cache,
            &symbol,
            force,
            |symbol| self.generate(symbol),
            |failure: GenerationFailure| -> Result<SummaryPayload, SummaryError> {
                let summary = fallback_summary(&symbol, &failure.context.lines)?;
                Ok(SummaryPayload {
                    summary,
                    references: failure.context.references,
                })
            },
        )
        .await?;

        Ok(StockSummary {
            symbol,
            summary: sourced.value.summary,
            source: sourced.source,
            references: sourced.value.references,
        })
    }

    async fn generate(&self, symbol: Symbol) -> Result<SummaryPayload, GenerationFailure> {
        if symbol.is_empty() {
            return Err(GenerationFailure {
                error: UpstreamError::InvalidInput("symbol is empty".to_string()),
                context: SummaryContext::default(),
            });
        }

        let context = self.gather_context(&symbol).await;
        let request = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(summary_prompt(&symbol, &context)),
        ])
        .temperature(0.2)
        .max_tokens(250);

        match self.llm.complete(request).await {
            Ok(summary) => Ok(SummaryPayload {
                summary,
                references: context.references,
            }),
            Err(error) => Err(GenerationFailure { error, context }),
        }
    }

    /// Reference data lines for the prompt. Vendor errors are logged and
    /// leave only the `Symbol:` line.
    pub async fn gather_context(&self, symbol: &Symbol) -> SummaryContext {
        let mut context = SummaryContext {
            lines: vec![format!("Symbol: {}", symbol)],
            references: Vec::new(),
        };

        let details = match self.market.ticker_details(symbol).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!("Context fetch failed for {}: {}", symbol, e);
                return context;
            }
        };

        if let Some(name) = details.name.as_deref().filter(|s| !s.is_empty()) {
            context.lines.push(format!("Company name: {}", name));
        }
        if let Some(sector) = details.sic_description.as_deref().filter(|s| !s.is_empty()) {
            context.lines.push(format!("Sector / Industry: {}", sector));
        }
        if let Some(description) = details.description.as_deref().filter(|s| !s.is_empty()) {
            let truncated: String = description.chars().take(DESCRIPTION_LIMIT).collect();
            context.lines.push(format!("Description: {}...", truncated));
        }
        context.references.push(Reference {
            title: format!("Polygon ref data for {}", symbol),
            url: self.market.reference_url(symbol),
        });

        context
    }
}

fn summary_prompt(symbol: &Symbol, context: &SummaryContext) -> String {
    format!(
        "Summarize the current outlook for {symbol} in 5–7 bullet points.\n\
         Use information in the context below plus general market knowledge.\n\
         Be neutral and avoid making investment recommendations.\n\
         Mention:\n\
         - What the company does\n\
         - Recent or typical drivers (earnings, products, macro trends)\n\
         - Any notable risks or uncertainties (at a high level)\n\
         \n\
         Context:\n\
         {context}",
        symbol = symbol,
        context = context.text(),
    )
}

/// Bullet list built from context alone: every line except `Symbol:`, at
/// most six, each prefixed with `• `.
pub fn fallback_summary(symbol: &Symbol, lines: &[String]) -> Result<String, SummaryError> {
    if symbol.is_empty() {
        return Err(SummaryError::EmptySymbol);
    }

    let mut bullets: Vec<String> = lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with("Symbol:"))
        .take(FALLBACK_MAX_LINES)
        .map(str::to_string)
        .collect();

    if bullets.is_empty() {
        bullets.push(format!(
            "{} – no detailed context available. Monitor earnings, revenue growth, margins, and major product or regulatory news.",
            symbol
        ));
    }

    Ok(bullets
        .iter()
        .map(|line| format!("• {}", line))
        .collect::<Vec<_>>()
        .join("\n"))
}
