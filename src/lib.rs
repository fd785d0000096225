pub mod classifier;
pub mod controller;
pub mod delay;
pub mod directive;
pub mod keyboard;
pub mod keymap;
pub mod language;
pub mod model;
pub mod planner;
pub mod playback;
pub mod sim;
pub mod trace;
pub mod whitespace;
