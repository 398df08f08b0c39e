//! Test utilities for pipeline tests.
//!
//! This module provides mock service implementations and fixtures.

pub mod fixtures;
pub mod mock_services;

#[allow(unused_imports)]
pub use fixtures::{
    brief_json, demo_repository, sample_bundle, script_json, test_config, valid_script,
};
#[allow(unused_imports)]
pub use mock_services::{
    MockBehavior, MockEncoder, MockLanguageModel, MockResponse, MockSpeech, MockVideo,
};
