//! Exchange-rate gateway
//!
//! External collaborator returning a map of currency code to rate
//! relative to the home currency. The provider is a black box: the core
//! only distinguishes "the code list was rejected" from "the provider
//! is unavailable".

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

/// Errors reported by the exchange-rate gateway
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// The provider rejected one or more of the requested codes
    #[error("Invalid currencies inputted: {0}")]
    InvalidCurrency(String),

    /// Transport failure or a non-success provider response
    #[error("Exchange rate provider unavailable: {0}")]
    Upstream(String),
}

/// Source of exchange rates for the ledger engine.
///
/// An empty code list requests every currency the provider supports.
#[async_trait]
pub trait ExchangeRateGateway: Send + Sync {
    async fn rates(&self, currencies: &[String])
        -> Result<HashMap<String, Decimal>, ExchangeError>;
}

#[derive(Debug, Deserialize)]
struct CurrencyApiResponse {
    data: HashMap<String, Decimal>,
}

/// HTTP client for the currency-rate provider.
///
/// Sends `GET {base_url}?currencies=A,B` with the API key in an
/// `apikey` header and expects `{"data": {"EUR": 0.91, ...}}` back.
#[derive(Debug, Clone)]
pub struct CurrencyApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CurrencyApiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ExchangeRateGateway for CurrencyApiClient {
    async fn rates(
        &self,
        currencies: &[String],
    ) -> Result<HashMap<String, Decimal>, ExchangeError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("currencies", currencies.join(","))])
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| ExchangeError::Upstream(e.to_string()))?;

        match response.status() {
            StatusCode::UNPROCESSABLE_ENTITY => {
                Err(ExchangeError::InvalidCurrency(currencies.join(",")))
            }
            status if !status.is_success() => Err(ExchangeError::Upstream(format!(
                "provider returned {status}"
            ))),
            _ => {
                let body: CurrencyApiResponse = response
                    .json()
                    .await
                    .map_err(|e| ExchangeError::Upstream(e.to_string()))?;
                Ok(body.data)
            }
        }
    }
}

/// Fixed-rate gateway for tests and offline wiring.
#[derive(Debug, Default)]
pub struct StaticRateGateway {
    rates: HashMap<String, Decimal>,
    error: Option<ExchangeError>,
}

impl StaticRateGateway {
    pub fn new(rates: HashMap<String, Decimal>) -> Self {
        Self { rates, error: None }
    }

    /// Gateway that fails every call with the given error.
    pub fn failing(error: ExchangeError) -> Self {
        Self {
            rates: HashMap::new(),
            error: Some(error),
        }
    }
}

#[async_trait]
impl ExchangeRateGateway for StaticRateGateway {
    async fn rates(
        &self,
        currencies: &[String],
    ) -> Result<HashMap<String, Decimal>, ExchangeError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if currencies.is_empty() {
            return Ok(self.rates.clone());
        }

        let mut selected = HashMap::new();
        for code in currencies {
            match self.rates.get(code) {
                Some(rate) => {
                    selected.insert(code.clone(), *rate);
                }
                None => return Err(ExchangeError::InvalidCurrency(code.clone())),
            }
        }
        Ok(selected)
    }
}
