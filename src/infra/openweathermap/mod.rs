mod client;

pub use client::{API_KEY_VARIABLE, OpenWeatherMapClient, decode_current};
