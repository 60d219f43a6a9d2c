//! Signed request/response layer for the exchange: component A.

pub mod auth;
pub mod client;

pub use auth::GatewayAuth;
pub use client::{
    EventsPage, ExchangeGateway, Market, MarketsPage, PlaceOrderRequest, RawEvent, RawFill,
    RawOrder, RawOrderbook, RawPosition,
};
