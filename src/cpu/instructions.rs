// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Semantic building blocks shared by the opcode dispatcher in `decode.rs`:
//! operand access by register-file index, condition evaluation, the stack,
//! and interrupt entry.

use super::Cpu;
use super::alu::{alu8, shift};
use super::state::registers::{Flag, Register};
use super::interrupts::Interrupt;

use crate::GameboyError;

/// Reads one of the eight 3-bit-encoded 8-bit operands `{B,C,D,E,H,L,(HL),A}`.
pub fn read_r8(cpu: &mut Cpu, index: u8) -> Result<u8, GameboyError> {
	Ok(match index {
		0 => cpu.registers.get(Register::B) as u8,
		1 => cpu.registers.get(Register::C) as u8,
		2 => cpu.registers.get(Register::D) as u8,
		3 => cpu.registers.get(Register::E) as u8,
		4 => cpu.registers.get(Register::H) as u8,
		5 => cpu.registers.get(Register::L) as u8,
		6 => cpu.mmap.read(cpu.registers.get(Register::HL))?,
		_ => cpu.registers.get(Register::A) as u8,
	})
}

/// Writes one of the eight 3-bit-encoded 8-bit operands.
pub fn write_r8(cpu: &mut Cpu, index: u8, value: u8) -> Result<(), GameboyError> {
	match index {
		0 => cpu.registers.set(Register::B, value as u16),
		1 => cpu.registers.set(Register::C, value as u16),
		2 => cpu.registers.set(Register::D, value as u16),
		3 => cpu.registers.set(Register::E, value as u16),
		4 => cpu.registers.set(Register::H, value as u16),
		5 => cpu.registers.set(Register::L, value as u16),
		6 => cpu.mmap.write(cpu.registers.get(Register::HL), value)?,
		_ => cpu.registers.set(Register::A, value as u16),
	}

	Ok(())
}

/// True when accessing `(HL)` rather than a plain register; used to add the
/// extra memory M-cycle to a group's base timing.
pub fn is_indirect(index: u8) -> bool {
	index == 6
}

/// The 2-bit-encoded 16-bit register pairs used by `LD rr,nn`/`INC rr`/etc.
pub fn read_rr_sp(cpu: &Cpu, index: u8) -> u16 {
	match index {
		0 => cpu.registers.get(Register::BC),
		1 => cpu.registers.get(Register::DE),
		2 => cpu.registers.get(Register::HL),
		_ => cpu.registers.get(Register::SP),
	}
}

/// Writes the 2-bit-encoded 16-bit register pair (SP form).
pub fn write_rr_sp(cpu: &mut Cpu, index: u8, value: u16) {
	match index {
		0 => cpu.registers.set(Register::BC, value),
		1 => cpu.registers.set(Register::DE, value),
		2 => cpu.registers.set(Register::HL, value),
		_ => cpu.registers.set(Register::SP, value),
	}
}

/// The 2-bit-encoded 16-bit register pairs used by `PUSH`/`POP` (AF form).
pub fn read_rr_af(cpu: &Cpu, index: u8) -> u16 {
	match index {
		0 => cpu.registers.get(Register::BC),
		1 => cpu.registers.get(Register::DE),
		2 => cpu.registers.get(Register::HL),
		_ => cpu.registers.get(Register::AF),
	}
}

/// Writes the 2-bit-encoded 16-bit register pair (AF form). `POP AF` masks
/// F's low nibble through `CpuState::set`'s own invariant enforcement.
pub fn write_rr_af(cpu: &mut Cpu, index: u8, value: u16) {
	match index {
		0 => cpu.registers.set(Register::BC, value),
		1 => cpu.registers.set(Register::DE, value),
		2 => cpu.registers.set(Register::HL, value),
		_ => cpu.registers.set(Register::AF, value),
	}
}

/// Evaluates one of the four condition codes `{NZ, Z, NC, C}`.
pub fn condition(cpu: &Cpu, index: u8) -> bool {
	match index {
		0 => !cpu.registers.flag(Flag::Z),
		1 => cpu.registers.flag(Flag::Z),
		2 => !cpu.registers.flag(Flag::C),
		_ => cpu.registers.flag(Flag::C),
	}
}

/// Pushes a 16-bit value: high byte at SP-1, low byte at SP-2.
pub fn push(cpu: &mut Cpu, value: u16) -> Result<(), GameboyError> {
	let sp = cpu.registers.get(Register::SP).wrapping_sub(1);
	cpu.mmap.write(sp, (value >> 8) as u8)?;
	let sp = sp.wrapping_sub(1);
	cpu.mmap.write(sp, value as u8)?;
	cpu.registers.set(Register::SP, sp);

	Ok(())
}

/// Pops a 16-bit value: low byte first, then high byte.
pub fn pop(cpu: &mut Cpu) -> Result<u16, GameboyError> {
	let sp = cpu.registers.get(Register::SP);
	let low = cpu.mmap.read(sp)?;
	let high = cpu.mmap.read(sp.wrapping_add(1))?;
	cpu.registers.set(Register::SP, sp.wrapping_add(2));

	Ok(((high as u16) << 8) | low as u16)
}

/// Applies the group of 8-bit ALU operations selected by the 3-bit opcode
/// field shared by `0x80..=0xBF` (register/`(HL)` form) and `0xC6..=0xFE`
/// (immediate form): ADD, ADC, SUB, SBC, AND, XOR, OR, CP.
pub fn apply_alu(cpu: &mut Cpu, op: u8, rhs: u8) {
	let a = cpu.registers.get(Register::A) as u8;

	let result = match op {
		0 => alu8::add(&mut cpu.registers, a, rhs),
		1 => alu8::adc(&mut cpu.registers, a, rhs),
		2 => alu8::sub(&mut cpu.registers, a, rhs),
		3 => alu8::sbc(&mut cpu.registers, a, rhs),
		4 => alu8::and(&mut cpu.registers, a, rhs),
		5 => alu8::xor(&mut cpu.registers, a, rhs),
		6 => alu8::or(&mut cpu.registers, a, rhs),
		_ => {
			alu8::cp(&mut cpu.registers, a, rhs);
			a
		}
	};

	// CP (op 7) deliberately discards the result.
	if op != 7 {
		cpu.registers.set(Register::A, result as u16);
	}
}

/// Applies the group of CB-prefixed rotate/shift operations selected by the
/// 3-bit opcode field of `0x00..=0x3F`.
pub fn apply_shift(cpu: &mut Cpu, op: u8, value: u8) -> u8 {
	match op {
		0 => shift::rlc(&mut cpu.registers, value, true),
		1 => shift::rrc(&mut cpu.registers, value, true),
		2 => shift::rl(&mut cpu.registers, value, true),
		3 => shift::rr(&mut cpu.registers, value, true),
		4 => shift::sla(&mut cpu.registers, value),
		5 => shift::sra(&mut cpu.registers, value),
		6 => shift::swap(&mut cpu.registers, value),
		_ => shift::srl(&mut cpu.registers, value),
	}
}

/// Pushes the current PC and jumps to the given interrupt service routine.
/// Used by the cpu's interrupt-servicing step. Clears IME so the handler
/// runs without being immediately re-entered by another pending interrupt.
pub fn enter_interrupt(cpu: &mut Cpu, isr_address: u16) -> Result<usize, GameboyError> {
	cpu.registers.set_ime(false);

	let pc = cpu.registers.get(Register::PC);
	push(cpu, pc)?;
	cpu.registers.set(Register::PC, isr_address);

	Ok(20)
}

/// Maps an `Interrupt` to its fixed service routine address.
pub fn isr_address(interrupt: Interrupt) -> u16 {
	match interrupt {
		Interrupt::VerticalBlank => 0x0040,
		Interrupt::LcdStat => 0x0048,
		Interrupt::Timer => 0x0050,
		Interrupt::Serial => 0x0058,
		Interrupt::Joypad => 0x0060,
	}
}
