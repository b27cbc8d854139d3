// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]
//! Cycle-accurate emulation of the original Game Boy (DMG, Sharp LR35902):
//! the CPU interpreter, the memory bus with cartridge bank switching and
//! boot-ROM overlay, the timer, the pixel processing unit, the interrupt
//! controller and the serial link stub, as described in the publicly
//! available "Game Boy CPU Manual" and in the Pan Docs.
//!
//! The host windowing/input surface, the audio sink, ROM file I/O and the
//! APU's wave synthesis are not part of this crate; only the APU's register
//! interface is emulated, since its timing is observable on the bus.

#[cfg(any(test, feature = "debug", feature = "std"))]
#[macro_use]
extern crate std;
extern crate core;
// The alloc crate is optional, and used for allocating the cartridge controller's
// ram on the heap and for the serial conformance harness' output buffer.
#[cfg(feature = "alloc")]
extern crate alloc;

pub mod bus;
pub mod config;
pub mod cpu;
pub mod emulator;

use core::fmt;

/// The library's exported errors.
pub enum GameboyError {
	/// Unimplemented feature error.
	NotImplemented,
	/// Cartridge operation error.
	Cartridge(&'static str),
	/// Generic IO related error.
	Io(&'static str),
	/// Unexpected address error.
	BadAddress(u16),
	/// Invalid opcode error.
	BadOpcode(u8),
	/// Invalid value written to a register.
	BadValue(u8),
}

impl fmt::Display for GameboyError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			GameboyError::NotImplemented => write!(f, "Not implemented"),
			GameboyError::Cartridge(ref info) => write!(f, "Cartridge error: {}", info),
			GameboyError::Io(ref info) => write!(f, "IO error: {}", info),
			GameboyError::BadAddress(address) => write!(f, "Bad address: 0x{:x}", address),
			GameboyError::BadOpcode(value) => write!(f, "Bad opcode: 0x{:x}", value),
			GameboyError::BadValue(value) => write!(f, "Bad value: {}", value),
		}
	}
}

impl fmt::Debug for GameboyError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		(self as &dyn fmt::Display).fmt(f)
	}
}

#[cfg(feature = "std")]
impl std::error::Error for GameboyError {}
