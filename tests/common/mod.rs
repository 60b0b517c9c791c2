#![allow(dead_code, unused_imports)]

pub use cmdrunner_test_utils::builders::{
    Harness, RegistrationBuilder, ScriptDir, fast_runner_settings,
};
pub use cmdrunner_test_utils::fake_backend::FakeBackend;
pub use cmdrunner_test_utils::{closed_url, http_responder, init_tracing, with_timeout};
