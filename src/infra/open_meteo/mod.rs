mod client;

pub use client::{OpenMeteoClient, decode_current, decode_daily};
