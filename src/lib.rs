//! Arena client - local simulation and peer synchronization for a
//! first-person arena shooter

pub mod bot;
pub mod config;
pub mod game;
pub mod sync;
pub mod util;
