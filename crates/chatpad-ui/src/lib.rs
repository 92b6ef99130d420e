//! egui front-end for Chatpad. Panels render from `UiState` and report user
//! intent back to the app; they never touch the stores directly.

pub mod state;
pub mod panels;
pub mod theme;
