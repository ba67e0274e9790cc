//! # Curated Token List
//!
//! Token entries keyed by contract address and ticker. Anyone may propose
//! a token or its removal; anyone may challenge.

use arbitrable_core::{Address, Amount, ItemId, RequestId};
use arbitrable_engine::{
    Arbitrable, EngineError, ItemPayload, ItemStatus, PayloadError, Submission,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DomainError;

const MAX_NAME_LEN: usize = 64;
const MAX_TICKER_LEN: usize = 12;

/// A token listed on the curated list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    /// Human-readable name.
    pub name: String,
    /// Ticker symbol, uppercase alphanumeric.
    pub ticker: String,
    /// Token contract address.
    pub contract: Address,
    /// URI of the token's logo.
    pub symbol_uri: String,
}

fn token_key(contract: &Address, ticker: &str) -> String {
    format!("token:{}:{ticker}", contract.as_str().to_ascii_lowercase())
}

impl ItemPayload for TokenEntry {
    fn key(&self) -> String {
        token_key(&self.contract, &self.ticker)
    }

    fn validate(&self) -> Result<(), PayloadError> {
        let name = self.name.trim();
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(PayloadError::new(
                "name",
                format!("must be 1-{MAX_NAME_LEN} characters"),
            ));
        }
        let ticker_ok = !self.ticker.is_empty()
            && self.ticker.len() <= MAX_TICKER_LEN
            && self
                .ticker
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        if !ticker_ok {
            return Err(PayloadError::new(
                "ticker",
                format!("must be 1-{MAX_TICKER_LEN} uppercase letters or digits"),
            ));
        }
        if self.symbol_uri.trim().is_empty() {
            return Err(PayloadError::new("symbol_uri", "must not be empty"));
        }
        Ok(())
    }
}

/// A curated list of tokens over any [`Arbitrable`] engine.
#[derive(Debug)]
pub struct TokenList<R> {
    engine: R,
}

impl<R> TokenList<R>
where
    R: Arbitrable<Payload = TokenEntry>,
{
    /// Wrap an engine.
    pub fn new(engine: R) -> Self {
        Self { engine }
    }

    /// Propose a token for listing, or its removal if already listed.
    pub fn propose(
        &mut self,
        requester: &Address,
        entry: TokenEntry,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<Submission, DomainError> {
        let ticker = entry.ticker.clone();
        let submission = self.engine.submit(requester, entry, deposit, evidence)?;
        info!(ticker = %ticker, request = %submission.request, kind = %submission.kind, "token proposal");
        Ok(submission)
    }

    /// Request removal of a listed token.
    pub fn request_removal(
        &mut self,
        requester: &Address,
        item: ItemId,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<Submission, DomainError> {
        if self.engine.status_of(item)? != ItemStatus::Registered {
            return Err(EngineError::InvalidState {
                operation: "request_removal".to_string(),
                reason: format!("{item} is not listed"),
            }
            .into());
        }
        Ok(self
            .engine
            .request_change(requester, item, deposit, evidence)?)
    }

    /// Challenge the pending request on a token.
    pub fn challenge(
        &mut self,
        challenger: &Address,
        item: ItemId,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<RequestId, DomainError> {
        let request = self
            .engine
            .active_request(item)?
            .ok_or(DomainError::NoActiveRequest(item))?;
        self.engine
            .challenge(challenger, request, deposit, evidence)?;
        Ok(request)
    }

    /// Whether the token is currently listed.
    pub fn is_listed(&self, item: ItemId) -> Result<bool, DomainError> {
        Ok(self.engine.status_of(item)? == ItemStatus::Registered)
    }

    /// Look a token up by contract address and ticker.
    pub fn find(&self, contract: &Address, ticker: &str) -> Option<ItemId> {
        self.engine.item_for_key(&token_key(contract, ticker))
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &R {
        &self.engine
    }

    /// Mutable access to the wrapped engine.
    pub fn engine_mut(&mut self) -> &mut R {
        &mut self.engine
    }
}
