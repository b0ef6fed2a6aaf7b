#![deny(clippy::expect_used, clippy::unwrap_used)]

//! The root of the timing-wheel expiry and response pipelining library.
//! 时间轮过期与响应流水线库的根。

pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod wheel;

mod testing;
