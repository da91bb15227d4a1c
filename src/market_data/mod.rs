// Market data module entrypoint
pub mod adapters;       // venue-specific websocket handlers (e.g. Gate.io)
pub mod normaliser;     // converts venue strings -> exact decimals
pub mod types;          // pairs, prices, handler outcomes
pub mod router;         // drives handlers over live connections
