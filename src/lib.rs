//! Agent-based simulation of mosquito-borne disease spread.
//!
//! Humans and mosquitoes wander a bounded plane; mosquitoes seek, latch onto
//! and bite humans, transmitting infection in either direction. A discrete
//! SIR model is advanced once per simulated day alongside the agents so the
//! two can be compared.
//!
//! [`engine::Engine`] is the entry point for hosts driving the simulation
//! frame by frame; [`manager::Manager`] runs it headless over a directory.

pub mod agent;
pub mod analysis;
pub mod clock;
pub mod config;
pub mod engine;
pub mod geometry;
pub mod infection;
pub mod manager;
pub mod movement;
pub mod population;
pub mod random;
pub mod sir;
pub mod spatial;
pub mod stats;
pub mod types;
