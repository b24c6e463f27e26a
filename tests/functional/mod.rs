//! Functional test harness for glpidesk
//!
//! Builds a signed-in [`GlpiClient`] from environment variables and guards
//! against running mutations on a production desk by accident.

use std::env;

use glpidesk::{Config, GlpiClient};

pub mod error_tests;
pub mod mutation_tests;
pub mod read_tests;

// ============================================================================
// Test Configuration
// ============================================================================

/// Prefix for test resources to identify and clean up
pub const TEST_RESOURCE_PREFIX: &str = "glpidesk-functest";

/// Host fragments that mark a non-production instance
const TEST_HOST_MARKERS: [&str; 4] = ["localhost", "127.0.0.1", "homolog", "test"];

const PRODUCTION_WARNING: &str = r#"
GLPIDESK_TEST_URL does not look like a test instance.
Functional tests create and purge tickets and categories.
To proceed anyway, set: GLPIDESK_FUNCTIONAL_TESTS_CONFIRM=yes
"#;

// ============================================================================
// FunctionalTestContext
// ============================================================================

/// Connection details for the instance under test.
///
/// - `GLPIDESK_TEST_URL` - GLPI REST endpoint
/// - `GLPIDESK_TEST_APP_TOKEN` - optional App-Token
/// - `GLPIDESK_TEST_LOGIN` / `GLPIDESK_TEST_PASSWORD` - account to sign in with
pub struct FunctionalTestContext {
    pub config: Config,
    pub login: String,
    pub password: String,
}

impl FunctionalTestContext {
    pub fn new() -> Self {
        let url = required("GLPIDESK_TEST_URL");
        Self::check_production_safety(&url);

        let mut config = Config::new(url);
        config.app_token = env::var("GLPIDESK_TEST_APP_TOKEN").ok();

        Self {
            config,
            login: required("GLPIDESK_TEST_LOGIN"),
            password: required("GLPIDESK_TEST_PASSWORD"),
        }
    }

    fn check_production_safety(url: &str) {
        let lower = url.to_lowercase();
        if TEST_HOST_MARKERS.iter().any(|m| lower.contains(m)) {
            return;
        }
        if env::var("GLPIDESK_FUNCTIONAL_TESTS_CONFIRM").as_deref() != Ok("yes") {
            eprintln!("{}", PRODUCTION_WARNING);
            panic!("Production confirmation required.");
        }
    }

    /// A client with no session yet
    pub fn client(&self) -> GlpiClient {
        GlpiClient::from_config(&self.config).expect("valid functional test config")
    }

    /// A client signed in with the configured account
    pub async fn signed_in(&self) -> GlpiClient {
        glpidesk::logging::init(env::var("GLPIDESK_TEST_DEBUG").is_ok());
        let client = self.client();
        client
            .session()
            .authenticate(&self.login, &self.password)
            .await
            .expect("functional test account should sign in");
        client
    }

    /// Unique name for a resource created by a test
    pub fn resource_name(&self, kind: &str) -> String {
        format!(
            "{}-{}-{}",
            TEST_RESOURCE_PREFIX,
            kind,
            chrono::Utc::now().timestamp_millis()
        )
    }
}

fn required(var: &str) -> String {
    env::var(var).unwrap_or_else(|_| panic!("{} must be set for functional tests", var))
}
