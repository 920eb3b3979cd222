pub mod adapter;
pub mod binance;
pub mod paper;
