//! Ricoh 2A03 CPU core (6502 without decimal mode).
//!
//! `step` executes one instruction: poll interrupts, fetch, decode through the opcode table,
//! execute, then advance the rest of the machine by the elapsed cycles via [`Bus::tick`].

use log::{Level, log_enabled, trace};
use thiserror::Error;

use crate::{
    bus::Bus,
    cpu::{
        flags::Status,
        instruction::{AddressingMode, Instruction, Mnemonic, lookup},
    },
};

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Cycles taken to push state and jump through an interrupt vector.
const INTERRUPT_CYCLES: usize = 7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CpuError {
    #[error("unknown opcode ${opcode:02X} at ${pc:04X}")]
    UnknownOpcode { opcode: u8, pc: u16 },
}

pub struct CPU<B: Bus> {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: Status,
    pub cycles: usize,
    pub bus: B,
}

impl<B: Bus> CPU<B> {
    /// Power-on register state. PC is loaded by [`CPU::reset`].
    pub fn new(bus: B) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            status: Status::POWER_ON,
            cycles: 0,
            bus,
        }
    }

    pub fn reset(&mut self) {
        self.pc = self.bus.read_word(RESET_VECTOR);

        self.sp = 0xFD; // reset performs three phantom pushes from $00
        self.status = Status::POWER_ON;

        self.a = 0;
        self.x = 0;
        self.y = 0;

        self.cycles = 7;
    }

    /// Execute one instruction (servicing a pending interrupt first) and return the CPU
    /// cycles it took, including any bus stall it caused.
    pub fn step(&mut self) -> Result<usize, CpuError> {
        let start = self.cycles;

        if self.bus.poll_nmi() {
            self.interrupt(NMI_VECTOR);
        } else if !self.status.contains(Status::INTERRUPT_DISABLE) && self.bus.poll_irq() {
            self.interrupt(IRQ_VECTOR);
        }

        let pc = self.pc;
        let opcode = self.bus.read(pc);
        let inst = lookup(opcode).ok_or(CpuError::UnknownOpcode { opcode, pc })?;

        if log_enabled!(Level::Trace) {
            self.trace(pc, inst);
        }

        let (addr, page_crossed) = self.operand_address(inst.mode, pc.wrapping_add(1));
        self.pc = pc.wrapping_add(inst.len as u16);
        self.cycles += inst.cycles as usize;
        if page_crossed {
            self.cycles += inst.page_penalty as usize;
        }

        self.execute(inst, addr);

        self.cycles += self.bus.take_stall();
        let elapsed = self.cycles - start;
        self.bus.tick(elapsed);
        Ok(elapsed)
    }

    fn trace(&self, pc: u16, inst: &Instruction) {
        trace!(
            "{:04X}  {:02X}  {:?}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            pc,
            inst.opcode,
            inst.mnemonic,
            self.a,
            self.x,
            self.y,
            self.status.bits(),
            self.sp,
            self.cycles
        );
    }

    /// Effective address for `mode`, with `operand` pointing at the first operand byte.
    /// Immediate mode yields the operand's own address; implied/accumulator yield 0.
    fn operand_address(&mut self, mode: AddressingMode, operand: u16) -> (u16, bool) {
        match mode {
            AddressingMode::Implied | AddressingMode::Accumulator => (0, false),
            AddressingMode::Immediate => (operand, false),
            AddressingMode::ZeroPage => (self.bus.read(operand) as u16, false),
            AddressingMode::ZeroPageX => (self.bus.read(operand).wrapping_add(self.x) as u16, false),
            AddressingMode::ZeroPageY => (self.bus.read(operand).wrapping_add(self.y) as u16, false),
            AddressingMode::Relative => {
                let offset = self.bus.read(operand) as i8;
                let next = operand.wrapping_add(1);
                (next.wrapping_add(offset as u16), false)
            }
            AddressingMode::Absolute => (self.bus.read_word(operand), false),
            AddressingMode::AbsoluteX => {
                let base = self.bus.read_word(operand);
                Self::indexed(base, self.x)
            }
            AddressingMode::AbsoluteY => {
                let base = self.bus.read_word(operand);
                Self::indexed(base, self.y)
            }
            AddressingMode::Indirect => {
                // The pointer's high byte is fetched without carrying into the page.
                let ptr = self.bus.read_word(operand);
                let lo = self.bus.read(ptr) as u16;
                let hi = self.bus.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)) as u16;
                ((hi << 8) | lo, false)
            }
            AddressingMode::IndirectX => {
                let zp = self.bus.read(operand).wrapping_add(self.x);
                (self.read_zero_page_word(zp), false)
            }
            AddressingMode::IndirectY => {
                let zp = self.bus.read(operand);
                let base = self.read_zero_page_word(zp);
                Self::indexed(base, self.y)
            }
        }
    }

    fn indexed(base: u16, index: u8) -> (u16, bool) {
        let addr = base.wrapping_add(index as u16);
        (addr, (base & 0xFF00) != (addr & 0xFF00))
    }

    fn read_zero_page_word(&mut self, zp: u8) -> u16 {
        let lo = self.bus.read(zp as u16) as u16;
        let hi = self.bus.read(zp.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    fn execute(&mut self, inst: &Instruction, addr: u16) {
        let accumulator = inst.mode == AddressingMode::Accumulator;
        match inst.mnemonic {
            Mnemonic::Lda => {
                self.a = self.bus.read(addr);
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Ldx => {
                self.x = self.bus.read(addr);
                self.update_zero_and_negative_flags(self.x);
            }
            Mnemonic::Ldy => {
                self.y = self.bus.read(addr);
                self.update_zero_and_negative_flags(self.y);
            }
            Mnemonic::Sta => self.bus.write(addr, self.a),
            Mnemonic::Stx => self.bus.write(addr, self.x),
            Mnemonic::Sty => self.bus.write(addr, self.y),

            Mnemonic::Tax => {
                self.x = self.a;
                self.update_zero_and_negative_flags(self.x);
            }
            Mnemonic::Tay => {
                self.y = self.a;
                self.update_zero_and_negative_flags(self.y);
            }
            Mnemonic::Tsx => {
                self.x = self.sp;
                self.update_zero_and_negative_flags(self.x);
            }
            Mnemonic::Txa => {
                self.a = self.x;
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Txs => self.sp = self.x,
            Mnemonic::Tya => {
                self.a = self.y;
                self.update_zero_and_negative_flags(self.a);
            }

            Mnemonic::Adc => {
                let value = self.bus.read(addr);
                self.add_with_carry(value);
            }
            Mnemonic::Sbc => {
                let value = self.bus.read(addr);
                self.add_with_carry(!value);
            }
            Mnemonic::And => {
                self.a &= self.bus.read(addr);
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Ora => {
                self.a |= self.bus.read(addr);
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Eor => {
                self.a ^= self.bus.read(addr);
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Cmp => self.compare(self.a, addr),
            Mnemonic::Cpx => self.compare(self.x, addr),
            Mnemonic::Cpy => self.compare(self.y, addr),
            Mnemonic::Bit => {
                let value = self.bus.read(addr);
                self.status.set(Status::ZERO, self.a & value == 0);
                self.status.set(Status::NEGATIVE, value & 0x80 != 0);
                self.status.set(Status::OVERFLOW, value & 0x40 != 0);
            }

            Mnemonic::Inc => {
                let value = self.bus.read(addr).wrapping_add(1);
                self.bus.write(addr, value);
                self.update_zero_and_negative_flags(value);
            }
            Mnemonic::Dec => {
                let value = self.bus.read(addr).wrapping_sub(1);
                self.bus.write(addr, value);
                self.update_zero_and_negative_flags(value);
            }
            Mnemonic::Inx => {
                self.x = self.x.wrapping_add(1);
                self.update_zero_and_negative_flags(self.x);
            }
            Mnemonic::Iny => {
                self.y = self.y.wrapping_add(1);
                self.update_zero_and_negative_flags(self.y);
            }
            Mnemonic::Dex => {
                self.x = self.x.wrapping_sub(1);
                self.update_zero_and_negative_flags(self.x);
            }
            Mnemonic::Dey => {
                self.y = self.y.wrapping_sub(1);
                self.update_zero_and_negative_flags(self.y);
            }

            Mnemonic::Asl => self.modify(accumulator, addr, |cpu, v| {
                cpu.status.set(Status::CARRY, v & 0x80 != 0);
                v << 1
            }),
            Mnemonic::Lsr => self.modify(accumulator, addr, |cpu, v| {
                cpu.status.set(Status::CARRY, v & 0x01 != 0);
                v >> 1
            }),
            Mnemonic::Rol => self.modify(accumulator, addr, |cpu, v| {
                let carry_in = cpu.status.contains(Status::CARRY) as u8;
                cpu.status.set(Status::CARRY, v & 0x80 != 0);
                (v << 1) | carry_in
            }),
            Mnemonic::Ror => self.modify(accumulator, addr, |cpu, v| {
                let carry_in = (cpu.status.contains(Status::CARRY) as u8) << 7;
                cpu.status.set(Status::CARRY, v & 0x01 != 0);
                (v >> 1) | carry_in
            }),

            Mnemonic::Bcc => self.branch(!self.status.contains(Status::CARRY), addr),
            Mnemonic::Bcs => self.branch(self.status.contains(Status::CARRY), addr),
            Mnemonic::Beq => self.branch(self.status.contains(Status::ZERO), addr),
            Mnemonic::Bne => self.branch(!self.status.contains(Status::ZERO), addr),
            Mnemonic::Bmi => self.branch(self.status.contains(Status::NEGATIVE), addr),
            Mnemonic::Bpl => self.branch(!self.status.contains(Status::NEGATIVE), addr),
            Mnemonic::Bvs => self.branch(self.status.contains(Status::OVERFLOW), addr),
            Mnemonic::Bvc => self.branch(!self.status.contains(Status::OVERFLOW), addr),

            Mnemonic::Jmp => self.pc = addr,
            Mnemonic::Jsr => {
                let return_addr = self.pc.wrapping_sub(1);
                self.push_word(return_addr);
                self.pc = addr;
            }
            Mnemonic::Rts => {
                self.pc = self.pop_word().wrapping_add(1);
            }
            Mnemonic::Rti => {
                let status = self.pop();
                self.status = Status::pulled(status);
                self.pc = self.pop_word();
            }
            Mnemonic::Brk => {
                self.push_word(self.pc);
                self.push(self.status.pushed_by_instruction());
                self.status.insert(Status::INTERRUPT_DISABLE);
                self.pc = self.bus.read_word(IRQ_VECTOR);
            }

            Mnemonic::Pha => self.push(self.a),
            Mnemonic::Php => self.push(self.status.pushed_by_instruction()),
            Mnemonic::Pla => {
                self.a = self.pop();
                self.update_zero_and_negative_flags(self.a);
            }
            Mnemonic::Plp => {
                let value = self.pop();
                self.status = Status::pulled(value);
            }

            Mnemonic::Clc => self.status.remove(Status::CARRY),
            Mnemonic::Cld => self.status.remove(Status::DECIMAL),
            Mnemonic::Cli => self.status.remove(Status::INTERRUPT_DISABLE),
            Mnemonic::Clv => self.status.remove(Status::OVERFLOW),
            Mnemonic::Sec => self.status.insert(Status::CARRY),
            Mnemonic::Sed => self.status.insert(Status::DECIMAL),
            Mnemonic::Sei => self.status.insert(Status::INTERRUPT_DISABLE),

            Mnemonic::Nop => {}
        }
    }

    fn add_with_carry(&mut self, value: u8) {
        let carry = self.status.contains(Status::CARRY) as u16;
        let sum = self.a as u16 + value as u16 + carry;
        let result = sum as u8;

        self.status.set(Status::CARRY, sum > 0xFF);
        self.status
            .set(Status::OVERFLOW, (self.a ^ result) & (value ^ result) & 0x80 != 0);

        self.a = result;
        self.update_zero_and_negative_flags(result);
    }

    fn compare(&mut self, register: u8, addr: u16) {
        let value = self.bus.read(addr);
        self.status.set(Status::CARRY, register >= value);
        self.update_zero_and_negative_flags(register.wrapping_sub(value));
    }

    /// Read-modify-write on the accumulator or memory; N and Z follow the result.
    fn modify(&mut self, accumulator: bool, addr: u16, op: impl FnOnce(&mut Self, u8) -> u8) {
        if accumulator {
            let value = self.a;
            let result = op(self, value);
            self.a = result;
            self.update_zero_and_negative_flags(result);
        } else {
            let value = self.bus.read(addr);
            let result = op(self, value);
            self.bus.write(addr, result);
            self.update_zero_and_negative_flags(result);
        }
    }

    fn update_zero_and_negative_flags(&mut self, value: u8) {
        self.status.set(Status::ZERO, value == 0);
        self.status.set(Status::NEGATIVE, value & 0x80 != 0);
    }

    /// Push PC and status, disable IRQs, and jump through `vector` (NMI or IRQ).
    fn interrupt(&mut self, vector: u16) {
        self.push_word(self.pc);
        self.push(self.status.pushed_by_interrupt());
        self.status.insert(Status::INTERRUPT_DISABLE);
        self.pc = self.bus.read_word(vector);
        self.cycles += INTERRUPT_CYCLES;
    }

    fn push(&mut self, value: u8) {
        let addr = 0x0100 | self.sp as u16;
        self.bus.write(addr, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        let addr = 0x0100 | self.sp as u16;
        self.bus.read(addr)
    }

    fn push_word(&mut self, value: u16) {
        self.push((value >> 8) as u8);
        self.push(value as u8);
    }

    fn pop_word(&mut self) -> u16 {
        let lo = self.pop() as u16;
        let hi = self.pop() as u16;
        (hi << 8) | lo
    }

    /// Taken branches cost one cycle, plus one more when the target is on another page.
    fn branch(&mut self, condition: bool, target: u16) {
        if condition {
            self.cycles += 1;
            if (self.pc & 0xFF00) != (target & 0xFF00) {
                self.cycles += 1;
            }
            self.pc = target;
        }
    }
}
