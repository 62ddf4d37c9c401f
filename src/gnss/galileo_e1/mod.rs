pub mod signal_modulation;

pub use self::signal_modulation::MemoryCodeBook;
