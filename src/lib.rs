//! ChainPilot: a conversational crypto command router.
//!
//! Free-text utterances are matched against an ordered pattern table
//! and dispatched to named tasks (price lookup, wallet monitoring,
//! simulated trades, market analysis, transaction tracking, contract
//! gas estimation) through an immutable registry with a uniform
//! success/failure result shape. An automation engine re-evaluates
//! user-defined conditions on a timer and triggers the same tasks when
//! they hold.

pub mod automation;
pub mod channels;
pub mod clients;
pub mod config;
pub mod error;
pub mod router;
pub mod tasks;

pub use automation::{AutomationEngine, AutomationRule, RuleId};
pub use config::Config;
pub use error::{Error, Result};
pub use router::{Response, Router};
pub use tasks::{TaskData, TaskRegistry, TaskResult};
