pub mod ports;
pub mod event_bus;
pub mod store;
pub mod turn;
pub mod notebook;

#[cfg(test)]
mod tests;
