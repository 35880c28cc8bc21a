use rust_decimal::Decimal;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::plugins::trackers::price::{DEFAULT_CURRENCY, PriceTracker};
use crate::utils::error::{AppError, Result};

/// Amazon price locations, most specific first.
pub const DEFAULT_PRICE_SELECTORS: &[&str] = &[
    "#corePrice_feature_div span.a-price.aok-align-center span.a-offscreen",
    "#corePrice_feature_div span.a-offscreen",
    "span.a-price.aok-align-center span.a-offscreen",
    ".a-price span.a-offscreen",
    // Legacy layouts
    "span.a-price-whole",
    "span.a-offscreen",
    "span#priceblock_ourprice",
    "span#priceblock_dealprice",
    "span.a-price span.a-offscreen",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceReading {
    pub price: Decimal,
    pub currency: Option<String>,
    /// The selector that produced the price text.
    pub selector: String,
}

impl PriceReading {
    pub fn currency_symbol(&self) -> &str {
        self.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }
}

#[derive(Debug, Clone)]
pub struct ElementSelector {
    pub selector: String,
    parsed: Selector,
}

impl ElementSelector {
    pub fn parse(selector: &str) -> Result<Self> {
        let parsed = Selector::parse(selector).map_err(|e| {
            AppError::InvalidConfiguration(format!("invalid CSS selector '{}': {}", selector, e))
        })?;

        Ok(Self {
            selector: selector.to_string(),
            parsed,
        })
    }

    /// Trimmed text of the first matching element, if it has any.
    fn first_text(&self, document: &Html) -> Option<String> {
        let element = document.select(&self.parsed).next()?;
        let text = element.text().collect::<String>().trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

pub struct PriceExtractor {
    selectors: Vec<ElementSelector>,
    tracker: PriceTracker,
}

impl Default for PriceExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceExtractor {
    pub fn new() -> Self {
        Self::with_selectors(DEFAULT_PRICE_SELECTORS).expect("default price selectors are valid CSS")
    }

    pub fn with_selectors<S: AsRef<str>>(selectors: &[S]) -> Result<Self> {
        if selectors.is_empty() {
            return Err(AppError::InvalidConfiguration(
                "at least one price selector is required".into(),
            ));
        }

        let selectors = selectors
            .iter()
            .map(|s| ElementSelector::parse(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            selectors,
            tracker: PriceTracker::new(),
        })
    }

    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.selectors.iter().map(|s| s.selector.as_str())
    }

    /// Tries each selector in order and stops at the first one that yields text.
    pub fn find_price_text<'a>(&'a self, document: &Html) -> Option<(&'a str, String)> {
        self.selectors
            .iter()
            .find_map(|s| s.first_text(document).map(|text| (s.selector.as_str(), text)))
    }

    pub fn extract(&self, html: &str) -> Result<PriceReading> {
        let document = Html::parse_document(html);

        let Some((selector, text)) = self.find_price_text(&document) else {
            warn!(
                "Could not find price on page (title: {}). The page layout may have changed.",
                page_title(&document).as_deref().unwrap_or("No title")
            );
            return Err(AppError::price_not_found("no price selector matched the page"));
        };

        debug!("Selector '{}' matched price text '{}'", selector, text);

        let parsed = self.tracker.parse(&text)?;

        Ok(PriceReading {
            price: parsed.amount,
            currency: parsed.currency,
            selector: selector.to_string(),
        })
    }
}

pub fn page_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let title = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    (!title.is_empty()).then_some(title)
}
