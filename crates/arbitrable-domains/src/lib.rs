#![deny(missing_docs)]

//! # arbitrable-domains — Domain Facades
//!
//! Payload types and thin facades that put a domain vocabulary on top of
//! any [`Arbitrable`](arbitrable_engine::Arbitrable) engine.
//!
//! | Module | Payload | Facade |
//! |--------|---------|--------|
//! | [`token`] | [`TokenEntry`] | [`TokenList`] |
//! | [`address_list`] | [`AddressEntry`] | [`AddressList`] |
//! | [`escrow`] | [`EscrowPayment`] | [`EscrowBook`] |
//! | [`translation`] | [`TranslationSubmission`] | [`TranslationMarket`] |
//!
//! Facades check domain roles (only the receiver claims an escrow release,
//! only the translator delivers) and leave every funds rule to the engine.

pub mod address_list;
pub mod error;
pub mod escrow;
pub mod token;
pub mod translation;

pub use address_list::{AddressEntry, AddressList};
pub use error::DomainError;
pub use escrow::{EscrowBook, EscrowOutcome, EscrowPayment};
pub use token::{TokenEntry, TokenList};
pub use translation::{TranslationMarket, TranslationSubmission};
