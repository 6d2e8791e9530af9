//! Cross-subsystem flows.

mod ledger_flows;
mod node_flows;
mod pool_flows;
mod restart;
