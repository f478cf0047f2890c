// src/lib.rs

pub mod eventbus;
pub mod http;
pub mod karaoke;
pub mod keepalive;
pub mod lyrics;
pub mod platforms;
pub mod services;
pub mod settings;
pub mod tasks;
pub mod test_utils;

pub use http::{DefaultHttpClient, HttpClient, HttpResponse};
pub use neonbot_common::error::Error;
