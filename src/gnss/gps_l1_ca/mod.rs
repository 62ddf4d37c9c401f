pub mod signal_modulation;
