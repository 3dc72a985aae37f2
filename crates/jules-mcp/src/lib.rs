//! # jules-mcp
//!
//! Model Context Protocol server for the Jules automator. An MCP client (an
//! editor or another agent) gets the same operations as the `jules` CLI:
//!
//! - `jules_create_session`, `jules_list_sessions`, `jules_get_status`
//! - `jules_send_message`, `jules_get_activities`
//! - `jules_process_reviews`: one review-loop run against the local ledger
//!
//! Tool failures come back as tool results with `isError` set so the caller
//! can read the message.

mod tools;

pub use tools::{
    CreateSessionArgs, JulesTools, ListSessionsArgs, ProcessReviewsArgs, SendMessageArgs,
    SessionIdArgs,
};
