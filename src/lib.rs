//! Headless simulation core of Wasteland Idle.
//!
//! All game rules live under [`game`]; [`time`] supplies timestamps.

pub mod game;
pub mod time;
