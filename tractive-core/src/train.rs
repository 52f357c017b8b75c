//! Tractive simulation: the time-stepped motion of one train under its locomotive's traction
//! characteristics, speed limits and track profile.

mod element;
mod locomotive;
mod lookahead;
mod positions;
mod resistance;
mod thermal;
mod tractive_sim;
mod train_state;


pub use element::*;
pub use locomotive::*;
pub use lookahead::*;
pub use positions::*;
pub use resistance::*;
pub use thermal::*;
pub use tractive_sim::*;
pub use train_state::*;
