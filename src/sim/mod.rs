pub mod event;
pub mod frame;
pub mod game;
pub mod level;
pub mod state;
pub mod step;
pub mod world;
