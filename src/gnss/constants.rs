
pub mod gps {

	pub const L1_CA_CHIP_RATE_HZ:f64 = 1.023e6;
	pub const L1_CA_CODE_LENGTH:usize = 1023;
	pub const L1_CA_CODE_PERIOD_MS:u32 = 1;
	pub const L1_CA_MAX_PRN:usize = 32;

	// G2 output taps (1-based) for each PRN, IS-GPS-200 Table 3-Ia
	pub const L1_CA_G2_TAPS:[(usize, usize); 32] = [
		(2, 6), (3, 7), (4, 8), (5, 9), (1, 9), (2, 10), (1, 8), (2, 9),
		(3, 10), (2, 3), (3, 4), (5, 6), (6, 7), (7, 8), (8, 9), (9, 10),
		(1, 4), (2, 5), (3, 6), (4, 7), (5, 8), (6, 9), (1, 3), (4, 6),
		(5, 7), (6, 8), (7, 9), (8, 10), (1, 6), (2, 7), (3, 8), (4, 9),
	];

}

pub mod galileo {

	pub const E1_CHIP_RATE_HZ:f64 = 1.023e6;
	pub const E1_CODE_LENGTH:usize = 4092;
	pub const E1_CODE_PERIOD_MS:u32 = 4;
	pub const E1_MAX_PRN:usize = 50;

	// Hex digits per memory code as published in the OS SIS ICD
	pub const E1_CODE_HEX_DIGITS:usize = E1_CODE_LENGTH / 4;

	// CBOC(6,1,1/11) weights
	pub const CBOC_ALPHA:f64 = 0.953_462_589_245_592_4;	// sqrt(10/11)
	pub const CBOC_BETA:f64  = 0.301_511_344_577_763_6;	// sqrt(1/11)

}
