//! # audience-visibility: Per-user content visibility
//!
//! Decides which articles, pages, embedded widgets and newsletter recipients
//! a user is targeted by, using the rules in [`audience_rules`].
//!
//! ```text
//! VisibilityService ──▶ Rule Evaluator ──▶ Condition Evaluator
//!        │
//!        └──▶ UserDirectory + GroupMembershipStore  (once per call)
//! ```
//!
//! Failure policy:
//! - A user the directory cannot describe (unknown, inactive) sees nothing
//!   restricted: single checks return `false`.
//! - A rule that cannot be parsed follows [`MalformedRulePolicy`]
//!   (fail open by default) and is logged, never raised.
//! - Directory failures and cancellation are returned to the caller as
//!   [`VisibilityError`].
//!
//! ## Examples
//!
//! ```
//! use std::sync::Arc;
//! use audience_rules::UserSnapshot;
//! use audience_types::UserId;
//! use audience_visibility::{InMemoryDirectory, VisibilityService};
//!
//! # tokio_test_block_on(async {
//! let alice = UserId::random();
//! let directory = InMemoryDirectory::new()
//!     .with_user(UserSnapshot::new(alice).with_department("Engineering"));
//! let service = VisibilityService::with_directory(Arc::new(directory));
//!
//! let content = r#"[
//!     {"kind": "banner"},
//!     {"kind": "promo", "visibility": {"type": "rules", "ruleSet": {"logic": "AND",
//!         "conditions": [{"field": "department", "operator": "equals", "value": "Sales"}]}}}
//! ]"#;
//!
//! let filtered = service.filter_widgets(alice, content).await.unwrap();
//! assert_eq!(filtered, r#"[{"kind":"banner"}]"#);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod directory;
pub mod error;
pub mod service;
mod widgets;


pub use audience_types::MalformedRulePolicy;
pub use directory::{DirectoryError, GroupMembershipStore, InMemoryDirectory, UserDirectory};
pub use error::{Result, VisibilityError};
pub use service::{ServiceOptions, VisibilityService};
