//! # Translation Tasks
//!
//! A translator delivers work for a task by opening a registration request
//! on the submission. Anyone who finds the quality lacking challenges it;
//! an accepted submission is the task's delivered translation.

use arbitrable_core::{Address, Amount, ItemId, RequestId};
use arbitrable_engine::{Arbitrable, ItemPayload, ItemStatus, PayloadError, Submission};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DomainError;

/// A delivered translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationSubmission {
    /// The task this delivers.
    pub task_ref: String,
    /// Who did the work.
    pub translator: Address,
    /// Source language code, e.g. `en`.
    pub source_language: String,
    /// Target language code, e.g. `pt-br`.
    pub target_language: String,
    /// Where the translated text lives.
    pub translation_uri: String,
}

fn translation_key(task_ref: &str) -> String {
    format!("translation:{task_ref}")
}

fn language_code_ok(code: &str) -> bool {
    (2..=8).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_lowercase() || c == '-')
}

impl ItemPayload for TranslationSubmission {
    fn key(&self) -> String {
        translation_key(&self.task_ref)
    }

    fn validate(&self) -> Result<(), PayloadError> {
        if self.task_ref.trim().is_empty() {
            return Err(PayloadError::new("task_ref", "must not be empty"));
        }
        for (field, code) in [
            ("source_language", &self.source_language),
            ("target_language", &self.target_language),
        ] {
            if !language_code_ok(code) {
                return Err(PayloadError::new(
                    field,
                    "must be 2-8 lowercase letters or hyphens",
                ));
            }
        }
        if self.source_language == self.target_language {
            return Err(PayloadError::new(
                "target_language",
                "must differ from source_language",
            ));
        }
        if self.translation_uri.trim().is_empty() {
            return Err(PayloadError::new("translation_uri", "must not be empty"));
        }
        Ok(())
    }
}

/// Translation deliveries over any [`Arbitrable`] engine.
#[derive(Debug)]
pub struct TranslationMarket<R> {
    engine: R,
}

impl<R> TranslationMarket<R>
where
    R: Arbitrable<Payload = TranslationSubmission>,
{
    /// Wrap an engine.
    pub fn new(engine: R) -> Self {
        Self { engine }
    }

    /// Deliver a translation. Only the named translator may deliver.
    pub fn deliver(
        &mut self,
        caller: &Address,
        submission: TranslationSubmission,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<Submission, DomainError> {
        if caller != &submission.translator {
            return Err(DomainError::WrongParty {
                caller: caller.clone(),
                role: "translator",
                target: submission.key(),
            });
        }
        let task = submission.task_ref.clone();
        let delivered = self.engine.submit(caller, submission, deposit, evidence)?;
        info!(task = %task, request = %delivered.request, "translation delivered");
        Ok(delivered)
    }

    /// Challenge the quality of a pending delivery.
    pub fn dispute_quality(
        &mut self,
        challenger: &Address,
        task_ref: &str,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<RequestId, DomainError> {
        let item = self
            .item_for_task(task_ref)
            .ok_or_else(|| DomainError::Unsupported {
                domain: "translation",
                operation: "disputing an undelivered task",
            })?;
        let request = self
            .engine
            .active_request(item)?
            .ok_or(DomainError::NoActiveRequest(item))?;
        self.engine.challenge(challenger, request, deposit, evidence)?;
        Ok(request)
    }

    /// Whether the task's delivery has been accepted.
    pub fn is_accepted(&self, task_ref: &str) -> bool {
        self.item_for_task(task_ref)
            .and_then(|item| self.engine.status_of(item).ok())
            == Some(ItemStatus::Registered)
    }

    /// The item holding the task's delivery.
    pub fn item_for_task(&self, task_ref: &str) -> Option<ItemId> {
        self.engine.item_for_key(&translation_key(task_ref))
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
