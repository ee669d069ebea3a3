//! Uniform random selection strategy.

use axum::http::Request;
use crate::load_balancer::Selector;

#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl Selector for Random {
    fn select(&self, urls: &[String], _request: &Request<()>) -> Option<usize> {
        if urls.is_empty() {
            return None;
        }
        Some(fastrand::usize(..urls.len()))
    }
}
