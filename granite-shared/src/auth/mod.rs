/// Authentication and authorization
///
/// # Modules
///
/// - [`session`]: Cached session and auth-state subscriptions
/// - [`resolver`]: Session plus role resolution, with default role creation
/// - [`guard`]: Access gate parameterised by [`guard::AccessLevel`]
/// - [`flow`]: Sign-in, sign-up, social sign-in and password reset
/// - [`retry`]: Cancellable retry policy used by the profile bootstrap
///
/// Permission enforcement itself happens at the gateway (row-level
/// policies). Everything here decides what to show and where to send the
/// caller.
///
/// # Example
///
/// ```
/// use granite_shared::auth::guard::{AccessGate, AccessLevel, GateOutcome, AUTH_ROUTE};
/// use granite_shared::client::Client;
/// use granite_shared::gateway::memory::MemoryGateway;
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let client = Client::new(Arc::new(MemoryGateway::new()));
/// let outcome = AccessGate::new(&client).check(AccessLevel::Authenticated).await;
/// assert_eq!(outcome, GateOutcome::Redirect(AUTH_ROUTE));
/// # }
/// ```

pub mod flow;
pub mod guard;
pub mod resolver;
pub mod retry;
pub mod session;
