//! Testing utilities for the webhook service
//!
//! - Alba-style HTTP endpoint testing without running a server
//! - Square payload builders and signing helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use money_buddy::testing::{self, SquareEvent};
//!
//! #[tokio::test]
//! async fn test_deposit() {
//!     let app = test_app("secret");
//!     let body = SquareEvent::payment_created("pay_1", "COMPLETED", 1000).to_bytes();
//!
//!     testing::post(app, "/api/webhooks/square")
//!         .signed_body(body, "secret")
//!         .execute()
//!         .await
//!         .assert_ok()
//!         .assert_json_path("success", serde_json::json!(true))
//!         .await;
//! }
//! ```

mod fixtures;
mod scenario;

pub use fixtures::{SquareEvent, fake, sign_body};
pub use scenario::{Scenario, ScenarioAssert, get, head, post};
