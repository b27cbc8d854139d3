// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Gameboy's processor emulation.

pub mod alu;
pub mod state;
pub mod decode;
pub mod interrupts;
pub mod instructions;

use num::PrimInt;
use core::mem::size_of;
use core::ops::{AddAssign, Shl};

use state::*;
use state::registers::*;
use instructions::isr_address;

use crate::GameboyError;
use crate::config::Config;
use crate::bus::joypad::Controller;

use crate::bus::*;
use crate::bus::cartridge::*;
use crate::cpu::interrupts::*;

/// The gameboy's processor.
///
/// This struct owns the register file and the memory bus, and drives the
/// fetch/decode/execute/interrupt-service cycle described by `step()`.
pub struct Cpu<'a> {
	/// The cpu's registers.
	pub(crate) registers: CpuState,
	/// The devices' memory mapping
	pub mmap: SystemBus<'a>,
	/// The emulator's configuration
	pub config: &'a Config<'a>,

	/// Set by HALT; cleared when a pending interrupt wakes the cpu.
	halted: bool,
	/// Set when HALT executes with IME=0 and an interrupt already pending:
	/// the instruction right after HALT is fetched without a PC increment.
	halt_bug_pending: bool,
	/// EI's pending-enable countdown. Decremented once per `step()`, before
	/// that step's instruction runs; IME becomes true on the 1->0 edge.
	ei_delay: u8,
	/// Monotonic count of T-cycles executed since reset.
	cycles: u64,
}

impl<'a> Cpu<'a> {
	/// Initializes a new virtual cpu
	#[inline(always)]
	pub fn new(config: &'a Config<'a>, cartridge: &'a mut Cartridge<'a>) -> Self {
		Cpu {
			registers: CpuState::new(config),
			mmap: SystemBus::new(config, cartridge),
			config,
			halted: false,
			halt_bug_pending: false,
			ei_delay: 0,
			cycles: 0,
		}
	}

	/// The number of T-cycles executed since this cpu was created.
	pub fn cycles(&self) -> u64 {
		self.cycles
	}

	/// Executed by the HALT opcode. Per the DMG's documented anomaly: with
	/// IME disabled and an interrupt already pending, the cpu does not
	/// actually suspend, and instead the following opcode byte is fetched
	/// twice (the "HALT bug").
	pub fn halt(&mut self) {
		let pending = self.mmap.interrupt_flag & self.mmap.interrupt_enable & 0x1F;

		if self.registers.ime() || pending == 0 {
			self.halted = true;
		} else {
			self.halt_bug_pending = true;
		}
	}

	/// Enable interrupts with a delay of a single instruction, as EI does.
	pub fn toggle_ime_delayed(&mut self) {
		self.ei_delay = 2;
	}

	/// Apply the given closure to the game controller.
	pub fn with_controller<F>(&mut self, closure: F)
		where F: FnOnce(&mut dyn Controller) {
			closure(&mut self.mmap.joypad);
	}

	/// Reads the next instruction bytes and increments the program counter appropriately.
	///
	/// The function works in little-endian, that is, when reading 2 bytes,
	/// the first byte will be the least-significant one.
	pub fn fetch<T: PrimInt + AddAssign + Shl<Output=T>>(&mut self) -> Result<T, GameboyError> {
		let mut result: T = num::cast(0).unwrap();

		for i in 0..size_of::<T>() {
			let pc: u16 = self.registers.get(Register::PC);
			let data: T = num::cast::<u8, T>(self.mmap.read(pc)?).unwrap();

			result += data << num::cast::<usize, T>(8 * i).unwrap();

			if self.halt_bug_pending {
				// The halt bug prevents the program counter from advancing exactly once.
				self.halt_bug_pending = false;
			} else {
				self.registers.set(Register::PC, pc.wrapping_add(1));
			}
		}

		Ok(result)
	}

	/// Writes the display's palette-index framebuffer through an RGB lookup,
	/// for hosts that want a ready-to-blit buffer (see the `display` feature).
	#[cfg(feature = "display")]
	pub fn flush(&mut self, frame_buffer: &mut [u32]) {
		self.mmap.ppu.flush_rgb(frame_buffer);
	}

	/// Runs one `step()`: services a pending interrupt, idles while halted,
	/// or fetches and executes one instruction. Returns the T-cycles spent,
	/// and advances every other peripheral on the bus by that same count.
	pub fn step(&mut self) -> Result<usize, GameboyError> {
		let num_cycles = self.step_cpu()?;

		if self.ei_delay > 0 {
			self.ei_delay -= 1;
			if self.ei_delay == 0 {
				self.registers.set_ime(true);
			}
		}

		self.mmap.process(num_cycles);
		self.cycles += num_cycles as u64;

		Ok(num_cycles)
	}

	fn step_cpu(&mut self) -> Result<usize, GameboyError> {
		if self.registers.ime() {
			if let Some(interrupt) = self.mmap.fetch_interrupt() {
				self.halted = false;
				log::trace!("servicing interrupt");
				return instructions::enter_interrupt(self, isr_address(interrupt));
			}
		} else if self.halted && self.mmap.interrupt_flag & self.mmap.interrupt_enable & 0x1F != 0 {
			// HALT with IME=0 ends without servicing once an interrupt is pending.
			self.halted = false;
		}

		if self.halted {
			return Ok(4);
		}

		self.execute_opcode()
	}
}

#[cfg(test)]
#[cfg(feature = "alloc")]
pub mod tests {
	use super::*;
	use alloc::boxed::Box;

	/// With-closure for running logic with an initialized cpu instance.
	pub fn with_cpu<F>(callback: F) -> Result<(), GameboyError>
		where F: FnOnce(&mut Cpu) -> Result<(), GameboyError> {
		let config = Config::default();
		let mut rom = cartridge::tests::empty_rom();
		let mut ram: Box<[u8]> = Cartridge::make_ram(&rom);
		let mut cartridge = Cartridge::new(&mut rom, &mut ram)?;

		let mut cpu = Cpu::new(&config, &mut cartridge);

		callback(&mut cpu)
	}

	#[test]
	fn test_fetch() -> Result<(), GameboyError> {
		with_cpu(|cpu| {
			cpu.registers.set(Register::PC, 0xC000);

			let data: &[u8] = &[1, 2, 3];
			cpu.mmap.write_all(cpu.registers.get(Register::PC), data)?;

			assert!(cpu.fetch::<u16>()? == 0x0201);
			assert!(cpu.fetch::<u8>()? == 0x03);

			Ok(())
		})
	}

	#[test]
	fn test_halt_bug() -> Result<(), GameboyError> {
		with_cpu(|cpu| {
			// HALT; INC A; NOP, with IME=0, IE=0x01, IF=0x01: the HALT bug
			// fetches INC A without advancing PC, so it runs twice.
			cpu.registers.set(Register::PC, 0xC000);
			cpu.registers.set(Register::A, 0x00);
			cpu.mmap.write_all(0xC000, &[0x76, 0x3C, 0x00])?;
			cpu.mmap.interrupt_enable = 0x01;
			cpu.mmap.interrupt_flag = 0x01;
			cpu.registers.set_ime(false);

			cpu.step()?;
			cpu.step()?;

			assert_eq!(0x02, cpu.registers.get(Register::A));

			Ok(())
		})
	}

	#[test]
	fn test_halt_then_interrupt() -> Result<(), GameboyError> {
		with_cpu(|cpu| {
			cpu.registers.set(Register::PC, 0xC000);
			cpu.mmap.write_all(0xC000, &[0x76])?;
			cpu.registers.set_ime(true);
			cpu.mmap.interrupt_enable = 0x01;

			// Halts: no interrupt pending yet.
			let cycles = cpu.step()?;
			assert_eq!(4, cycles);

			// Now raise VBlank; the next step should service it.
			cpu.mmap.interrupt_flag = 0x01;
			let cycles = cpu.step()?;
			assert_eq!(20, cycles);
			assert_eq!(0x0040, cpu.registers.get(Register::PC));

			Ok(())
		})
	}
}
