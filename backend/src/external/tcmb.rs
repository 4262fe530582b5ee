//! Exchange-rate provider backed by the TCMB (Turkish central bank) feed
//!
//! The feed publishes daily XML bulletins: `today.xml` for the current day
//! and `/{YYYYMM}/{DDMMYYYY}.xml` for past days. The selling rate is taken
//! with ForexSelling preferred over BanknoteSelling.

use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::TcmbConfig;
use crate::error::{AppError, AppResult};
use shared::finance::round_rate;
use shared::types::Currency;

/// A resolved exchange rate: how many TRY one unit of the currency buys.
#[derive(Debug, Clone, Serialize)]
pub struct RateQuote {
    pub rate: Decimal,
    pub source: String,
}

/// Source of exchange rates for the currency lock. Injected into the
/// services so tests can substitute a fixed provider and so caching stays a
/// decorator rather than global state.
pub trait RateProvider: Send + Sync {
    fn rate(
        &self,
        currency: Currency,
        date: Option<NaiveDate>,
    ) -> impl Future<Output = AppResult<RateQuote>> + Send;
}

/// TCMB feed client
#[derive(Clone)]
pub struct TcmbRateClient {
    client: Client,
    base_url: String,
}

impl TcmbRateClient {
    pub fn new(config: &TcmbConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn bulletin_url(&self, date: Option<NaiveDate>) -> String {
        match date {
            None => format!("{}/today.xml", self.base_url),
            Some(d) => format!(
                "{}/{}/{}.xml",
                self.base_url,
                d.format("%Y%m"),
                d.format("%d%m%Y")
            ),
        }
    }

    async fn fetch_bulletin(&self, date: Option<NaiveDate>) -> AppResult<String> {
        let url = self.bulletin_url(date);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("TCMB request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "TCMB returned status {} for {}",
                response.status(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::ExternalService(format!("TCMB response unreadable: {}", e)))
    }
}

impl RateProvider for TcmbRateClient {
    async fn rate(&self, currency: Currency, date: Option<NaiveDate>) -> AppResult<RateQuote> {
        if currency.is_local() {
            return Ok(RateQuote {
                rate: Decimal::new(10000, 4),
                source: "local".to_string(),
            });
        }

        let xml = self.fetch_bulletin(date).await?;
        let rate = parse_selling_rate(&xml, currency.code()).ok_or(AppError::RateUnavailable {
            currency: currency.code().to_string(),
            date,
        })?;

        let source = match date {
            None => "TCMB today.xml".to_string(),
            Some(d) => format!("TCMB {}", d),
        };
        Ok(RateQuote { rate, source })
    }
}

/// Pull the selling rate for one currency out of a TCMB bulletin.
///
/// The bulletin structure is flat and stable, so the extraction is a plain
/// text scan over the matching `<Currency>` block; no match returns `None`
/// rather than a default rate.
fn parse_selling_rate(xml: &str, currency_code: &str) -> Option<Decimal> {
    let marker = format!("CurrencyCode=\"{}\"", currency_code);
    let start = xml.find(&marker)?;
    let block_end = xml[start..].find("</Currency>")? + start;
    let block = &xml[start..block_end];

    let value = extract_tag(block, "ForexSelling")
        .filter(|v| !v.is_empty())
        .or_else(|| extract_tag(block, "BanknoteSelling").filter(|v| !v.is_empty()))?;

    let normalized = value.replace(',', ".");
    Decimal::from_str(normalized.trim()).ok().map(round_rate)
}

fn extract_tag(block: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = block.find(&open)? + open.len();
    let end = block[start..].find(&close)? + start;
    Some(block[start..end].trim().to_string())
}

/// Caching decorator over any [`RateProvider`].
///
/// Only dated lookups are cached: a past bulletin never changes, while
/// today's rate must stay live.
#[derive(Clone)]
pub struct CachedRates<P> {
    inner: P,
    cache: Arc<Mutex<HashMap<(Currency, NaiveDate), RateQuote>>>,
}

impl<P> CachedRates<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<P: RateProvider> RateProvider for CachedRates<P> {
    async fn rate(&self, currency: Currency, date: Option<NaiveDate>) -> AppResult<RateQuote> {
        if let Some(d) = date {
            if let Ok(cache) = self.cache.lock() {
                if let Some(hit) = cache.get(&(currency, d)) {
                    return Ok(hit.clone());
                }
            }
            let quote = self.inner.rate(currency, date).await?;
            if let Ok(mut cache) = self.cache.lock() {
                cache.insert((currency, d), quote.clone());
            }
            Ok(quote)
        } else {
            self.inner.rate(currency, date).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BULLETIN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Tarih_Date Tarih="15.01.2025" Date="01/15/2025" Bulten_No="2025/10">
  <Currency CrossOrder="0" Kod="USD" CurrencyCode="USD">
    <Unit>1</Unit>
    <Isim>ABD DOLARI</Isim>
    <CurrencyName>US DOLLAR</CurrencyName>
    <ForexBuying>35.3210</ForexBuying>
    <ForexSelling>35.3847</ForexSelling>
    <BanknoteBuying>35.2963</BanknoteBuying>
    <BanknoteSelling>35.4378</BanknoteSelling>
  </Currency>
  <Currency CrossOrder="1" Kod="EUR" CurrencyCode="EUR">
    <Unit>1</Unit>
    <Isim>EURO</Isim>
    <CurrencyName>EURO</CurrencyName>
    <ForexBuying>36.3684</ForexBuying>
    <ForexSelling></ForexSelling>
    <BanknoteBuying>36.3430</BanknoteBuying>
    <BanknoteSelling>36.5391</BanknoteSelling>
  </Currency>
</Tarih_Date>"#;

    #[test]
    fn prefers_forex_selling() {
        let rate = parse_selling_rate(BULLETIN, "USD").unwrap();
        assert_eq!(rate, Decimal::from_str("35.3847").unwrap());
    }

    #[test]
    fn falls_back_to_banknote_selling_when_forex_empty() {
        let rate = parse_selling_rate(BULLETIN, "EUR").unwrap();
        assert_eq!(rate, Decimal::from_str("36.5391").unwrap());
    }

    #[test]
    fn unknown_currency_is_none_not_a_default() {
        assert!(parse_selling_rate(BULLETIN, "GBP").is_none());
    }

    #[test]
    fn comma_decimal_separator_is_accepted() {
        let xml = r#"<Currency CurrencyCode="USD"><ForexSelling>35,3847</ForexSelling></Currency>"#;
        assert_eq!(
            parse_selling_rate(xml, "USD").unwrap(),
            Decimal::from_str("35.3847").unwrap()
        );
    }

    #[test]
    fn bulletin_urls_follow_the_archive_scheme() {
        let client = TcmbRateClient::new(&TcmbConfig {
            base_url: "https://www.tcmb.gov.tr/kurlar".to_string(),
            timeout_seconds: 10,
        });
        assert_eq!(
            client.bulletin_url(None),
            "https://www.tcmb.gov.tr/kurlar/today.xml"
        );
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(
            client.bulletin_url(Some(date)),
            "https://www.tcmb.gov.tr/kurlar/202501/15012025.xml"
        );
    }
}
