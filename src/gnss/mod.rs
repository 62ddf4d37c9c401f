pub mod constants;
pub mod signal;

pub mod gps_l1_ca;
pub mod galileo_e1;

/// This module contains functionality related to acquiring GNSS signals common to all systems
pub mod common;
