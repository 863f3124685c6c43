//! `li-gateway`: the LexIntake conversation gateway.
//!
//! A turn flows `api`/`cli` → [`runtime::run_turn`] → [`pipeline::Pipeline`]
//! (ordered [`middleware`] stages) → optional intake agent with
//! [`tools`] → context store.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod middleware;
pub mod pipeline;
pub mod runtime;
pub mod state;
pub mod tools;
