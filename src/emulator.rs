// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! The emulation library's front-end API: the top-level scheduler that
//! drives the cpu and its peripherals one `step()` at a time.
//!
//! Loading ROM/save files, presenting a window, and feeding audio to a sink
//! are host concerns; this type only consumes borrowed buffers and reports
//! borrowed results.

use crate::GameboyError;
use crate::cpu::Cpu;
use crate::bus::cartridge::Cartridge;
use crate::bus::joypad::Controller;
use crate::config::Config;

/// T-cycles in a single Game Boy video frame (70,224).
pub const CYCLES_PER_FRAME: u64 = 70_224;

/// The complete emulator's state: a cpu (which itself owns the memory bus)
/// plus the scheduler loop that advances them together.
pub struct Emulator<'a> {
	/// The gameboy's processor, owning the memory bus and every peripheral.
	pub cpu: Cpu<'a>,
}

impl<'a> Emulator<'a> {
	/// Create a new emulator for the given cartridge.
	#[inline(always)]
	pub fn new(config: &'a Config<'a>, cartridge: &'a mut Cartridge<'a>) -> Self {
		Emulator {
			cpu: Cpu::new(config, cartridge),
		}
	}

	/// Runs a single scheduler iteration: one CPU step (servicing an
	/// interrupt, idling while halted, or executing one instruction),
	/// followed by ticking every peripheral by that exact T-cycle budget.
	/// Returns the number of T-cycles the iteration consumed.
	pub fn step(&mut self) -> Result<usize, GameboyError> {
		self.cpu.step()
	}

	/// Runs scheduler iterations until at least one full frame's worth of
	/// T-cycles (`CYCLES_PER_FRAME`) has been consumed, then returns the
	/// total T-cycles consumed. Used by hosts that want to render once per
	/// call rather than drive `step()` directly and watch IF themselves.
	///
	/// This counts down a fixed cycle budget rather than waiting for a
	/// VBlank IF latch: IF bit 0 stays set until something clears it (the
	/// host, or the CPU servicing the interrupt), so a level check across
	/// calls would see a stale latch from the previous frame and return
	/// immediately.
	pub fn run_frame(&mut self) -> Result<u64, GameboyError> {
		let mut total = 0u64;

		while total < CYCLES_PER_FRAME {
			total += self.step()? as u64;
		}

		Ok(total)
	}

	/// The palette-index framebuffer (160x144, one byte per pixel) of the
	/// most recently completed frame.
	pub fn framebuffer(&self) -> &[u8; crate::bus::ppu::consts::WIDTH * crate::bus::ppu::consts::HEIGHT] {
		self.cpu.mmap.ppu.framebuffer()
	}

	/// The bytes transmitted over the serial link so far, in order; this is
	/// how conformance ROMs (e.g. Blargg's test suite) report PASS/FAIL.
	#[cfg(feature = "alloc")]
	pub fn serial_output(&self) -> &[u8] {
		self.cpu.mmap.serial.output()
	}

	/// Apply the given closure to the game controller.
	pub fn with_controller<F>(&mut self, closure: F)
		where F: FnOnce(&mut dyn Controller) {
		self.cpu.with_controller(closure);
	}
}

#[cfg(test)]
#[cfg(feature = "alloc")]
mod tests {
	use super::*;
	use crate::bus::cartridge;
	use alloc::boxed::Box;

	#[test]
	fn test_run_frame_consumes_one_frame_budget() -> Result<(), GameboyError> {
		let config = Config::default();
		let mut rom = cartridge::tests::empty_rom();
		let mut ram: Box<[u8]> = Cartridge::make_ram(&rom);
		let mut cartridge = Cartridge::new(&mut rom, &mut ram)?;
		let mut emulator = Emulator::new(&config, &mut cartridge);

		let cycles = emulator.run_frame()?;

		assert!(cycles >= CYCLES_PER_FRAME);

		Ok(())
	}
}
