//! Price lookup module.
//!
//! The engine never retrieves market data itself. Hosts implement
//! [`PriceProviderTrait`] on top of whatever quote store they have; the engine
//! only asks for the current price of the tickers and option contracts that
//! are still open when a day is sealed.

mod price_provider;

pub use price_provider::{NoPriceProvider, PriceProviderTrait, StaticPriceProvider};
