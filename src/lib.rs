//! Tile-based track building and racing simulation.
//!
//! A grid of rotatable track pieces is resolved into a closed loop, each
//! Start piece turns that loop into two sampled lane routes, and cars race
//! along them under a small randomized physics model.

pub mod assets;
pub mod car;
pub mod config;
pub mod connectivity;
pub mod data;
pub mod grid;
pub mod input;
pub mod layout;
pub mod piece;
pub mod race;
pub mod route;
pub mod scoreboard;
