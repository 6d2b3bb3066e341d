pub mod command;
pub mod communication;
pub mod config;
pub mod dut;
pub mod indicator;
pub mod pins;
pub mod verify;
