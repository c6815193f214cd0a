//! First Lego League robot simulator.
//!
//! A differential drive robot with color, ultrasonic, gyro and touch sensors drives over a game
//! map, pushes movable mission props and scores missions. The robot is driven by a command queue,
//! a Pybricks style drive base or the arrow keys.

#[cfg(test)]
mod tests;

pub mod config;
pub mod controller;
pub mod domain;
pub mod plot;
pub mod simulator;
