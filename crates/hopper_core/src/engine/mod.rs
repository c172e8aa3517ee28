//! Daily rollover and streak engine.
//!
//! # Responsibility
//! - Keep every task's notion of "today" aligned with wall-clock days.
//! - Apply streak breaks, hopper decay and auto-secure per crossed midnight.
//!
//! The securing rule itself lives on `Task::try_secure`; this module only
//! decides when it runs with reason `rollover`.

pub mod rollover;
