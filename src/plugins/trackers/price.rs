use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::utils::error::{AppError, Result};

/// Currency symbols recognised in price text, longest first so `US$` wins over `$`.
const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("US$", "$"),
    ("$", "$"),
    ("£", "£"),
    ("€", "€"),
    ("¥", "¥"),
    ("₹", "₹"),
];

pub const DEFAULT_CURRENCY: &str = "$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPrice {
    pub amount: Decimal,
    /// Display symbol found in the text, if any.
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetComparison {
    pub at_or_below_target: bool,
    /// `current - target`; negative when the price is under target.
    pub difference: Decimal,
}

pub struct PriceTracker {
    number_regex: Regex,
}

impl Default for PriceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceTracker {
    pub fn new() -> Self {
        PriceTracker {
            // Grouped thousands ("1,234.56"), a decimal with optional integer
            // part ("1234.56", ".99") or a whole number.
            number_regex: Regex::new(r"\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d*\.\d+|\d+")
                .expect("price regex is valid"),
        }
    }

    /// Parses text such as `"$1,234.56"` into an amount and currency symbol.
    ///
    /// Anything ambiguous is rejected rather than guessed: mixed currency
    /// symbols, more than one number (price ranges) and decimal-comma
    /// formats such as `"1.234,56"` all fail with `PriceNotFound`.
    pub fn parse(&self, text: &str) -> Result<ParsedPrice> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AppError::price_not_found("price text is empty"));
        }

        let currency = self.extract_currency(trimmed)?;

        let mut numbers = self.number_regex.find_iter(trimmed);
        let number = numbers
            .next()
            .ok_or_else(|| AppError::price_not_found(format!("no number in '{}'", trimmed)))?;
        if numbers.next().is_some() {
            return Err(AppError::price_not_found(format!(
                "ambiguous price text '{}'",
                trimmed
            )));
        }

        let mut cleaned = number.as_str().replace(',', "");
        if cleaned.starts_with('.') {
            cleaned.insert(0, '0');
        }
        let amount = Decimal::from_str(&cleaned)
            .map_err(|e| AppError::price_not_found(format!("'{}': {}", trimmed, e)))?;

        Ok(ParsedPrice { amount, currency })
    }

    fn extract_currency(&self, text: &str) -> Result<Option<String>> {
        let mut found: Option<&str> = None;
        let mut rest = text.to_string();

        for (symbol, display) in CURRENCY_SYMBOLS {
            if !rest.contains(symbol) {
                continue;
            }
            // Remove so "US$" is not counted again as "$".
            rest = rest.replace(symbol, " ");
            match found {
                Some(existing) if existing != *display => {
                    return Err(AppError::price_not_found(format!(
                        "multiple currencies in '{}'",
                        text
                    )));
                }
                _ => found = Some(*display),
            }
        }

        Ok(found.map(str::to_string))
    }

    /// The alert threshold is inclusive: a price equal to target counts.
    pub fn compare(&self, current: Decimal, target: Decimal) -> TargetComparison {
        TargetComparison {
            at_or_below_target: current <= target,
            difference: current - target,
        }
    }
}

/// Formats an amount with its currency symbol and two decimals, e.g. `$45.99`.
pub fn format_price(currency: &str, amount: Decimal) -> String {
    format!("{}{:.2}", currency, amount)
}
