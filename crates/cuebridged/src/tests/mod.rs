//! Behavioural suites for the bridge.

mod bootstrap_behaviour;
mod socket_behaviour;
mod support;
