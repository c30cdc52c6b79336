//! flagmon-monitor — the canary monitoring control loop.
//!
//! Polls Flagger for the status of a set of canaries until every one
//! of them is terminal or the time budget runs out, then classifies
//! the result and hands it to a sink exactly once.
//!
//! # Architecture
//!
//! ```text
//! MonitorSession
//!   ├── initial delay
//!   └── poll cycle (repeats every poll interval)
//!       ├── ControllerQuery::query_status() → QueryOutput
//!       ├── parse_batch() → ObservationBatch
//!       ├── StatusTable::apply()
//!       └── classify() → Verdict, or keep polling
//!   └── ResultSink::publish(SessionReport)
//! ```
//!
//! A non-zero exit status from the query aborts the loop immediately.
//! Malformed or unrelated output lines are dropped without error.

pub mod classifier;
pub mod error;
pub mod parser;
pub mod port;
pub mod session;
pub mod table;

pub use classifier::{classify, classify_at_timeout};
pub use error::{MonitorError, MonitorResult};
pub use parser::{parse_batch, parse_line, Observation, ObservationBatch};
pub use port::{ControllerQuery, QueryOutput, ResultSink};
pub use session::{MonitorPhase, MonitorSession, SessionReport};
pub use table::StatusTable;
