pub mod config;
pub mod model;
pub mod probe;
pub mod reducer;
pub mod state;
pub mod store;

// Seams to the control server and to running microservices
pub mod control;

// Components driving the dashboard
pub mod dashboard;
pub mod dispatcher;
pub mod poller;
pub mod request_probe;

#[cfg(test)]
pub(crate) mod testing;
