//! Background services

pub mod sweeper;
