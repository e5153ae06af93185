use crate::{
    bus::Bus,
    cpu::{
        cpu::{CPU, CpuError},
        flags::Status,
        instruction::{INSTRUCTIONS, lookup},
    },
};

struct TestBus {
    mem: [u8; 65536],
    nmi: bool,
    irq: bool,
    ticked: usize,
}

impl TestBus {
    fn new() -> Self {
        Self {
            mem: [0; 65536],
            nmi: false,
            irq: false,
            ticked: 0,
        }
    }
}

impl Bus for TestBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.mem[addr as usize] = data;
    }

    fn tick(&mut self, cycles: usize) {
        self.ticked += cycles;
    }

    fn poll_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi)
    }

    fn poll_irq(&mut self) -> bool {
        self.irq
    }
}

/// CPU with `program` at $8000 and the reset vector pointing at it.
fn cpu_with(program: &[u8]) -> CPU<TestBus> {
    let mut bus = TestBus::new();
    bus.mem[0x8000..0x8000 + program.len()].copy_from_slice(program);
    bus.mem[0xFFFC] = 0x00;
    bus.mem[0xFFFD] = 0x80;

    let mut cpu = CPU::new(bus);
    cpu.reset();
    cpu
}

fn run(cpu: &mut CPU<TestBus>, steps: usize) {
    for _ in 0..steps {
        cpu.step().unwrap();
    }
}

#[test]
fn reset_loads_vector_and_power_on_state() {
    let cpu = cpu_with(&[]);
    assert_eq!(cpu.pc, 0x8000);
    assert_eq!(cpu.sp, 0xFD);
    assert_eq!(cpu.status, Status::INTERRUPT_DISABLE | Status::UNUSED);
}

#[test]
fn lda_immediate_loads_value() {
    let mut cpu = cpu_with(&[0xA9, 0x42]); // LDA #$42
    run(&mut cpu, 1);
    assert_eq!(cpu.a, 0x42);
    assert!(!cpu.status.contains(Status::ZERO));
    assert!(!cpu.status.contains(Status::NEGATIVE));
    assert_eq!(cpu.pc, 0x8002);
}

#[test]
fn lda_zero_sets_zero_clears_negative() {
    let mut cpu = cpu_with(&[0xA9, 0x80, 0xA9, 0x00]); // LDA #$80; LDA #$00
    run(&mut cpu, 1);
    assert!(cpu.status.contains(Status::NEGATIVE));
    run(&mut cpu, 1);
    assert_eq!(cpu.a, 0x00);
    assert!(cpu.status.contains(Status::ZERO));
    assert!(!cpu.status.contains(Status::NEGATIVE));
}

#[test]
fn sec_sets_carry_from_any_state() {
    for bits in 0..=255u8 {
        let mut cpu = cpu_with(&[0x38]); // SEC
        cpu.status = Status::from_bits_retain(bits);
        run(&mut cpu, 1);
        assert!(cpu.status.contains(Status::CARRY));
        assert_eq!(
            cpu.status - Status::CARRY,
            Status::from_bits_retain(bits) - Status::CARRY
        );
    }
}

#[test]
fn tax_transfers_a_to_x() {
    let mut cpu = cpu_with(&[0xA9, 0x10, 0xAA]); // LDA #$10; TAX
    run(&mut cpu, 2);
    assert_eq!(cpu.x, 0x10);
}

#[test]
fn sta_writes_to_memory() {
    let mut cpu = cpu_with(&[0xA9, 0x33, 0x8D, 0x00, 0x02]); // LDA #$33; STA $0200
    run(&mut cpu, 2);
    assert_eq!(cpu.bus.mem[0x0200], 0x33);
}

#[test]
fn zero_page_x_wraps_within_page() {
    // LDX #$10; LDA #$77; STA $F8,X
    let mut cpu = cpu_with(&[0xA2, 0x10, 0xA9, 0x77, 0x95, 0xF8]);
    run(&mut cpu, 3);
    assert_eq!(cpu.bus.mem[0x0008], 0x77);
    assert_eq!(cpu.bus.mem[0x0108], 0x00);
}

#[test]
fn indirect_y_adds_after_dereference() {
    // LDY #$04; LDA ($10),Y
    let mut cpu = cpu_with(&[0xA0, 0x04, 0xB1, 0x10]);
    cpu.bus.mem[0x10] = 0x00;
    cpu.bus.mem[0x11] = 0x03;
    cpu.bus.mem[0x0304] = 0x99;
    run(&mut cpu, 2);
    assert_eq!(cpu.a, 0x99);
}

#[test]
fn adc_sets_carry_and_overflow() {
    // CLC; LDA #$7F; ADC #$01
    let mut cpu = cpu_with(&[0x18, 0xA9, 0x7F, 0x69, 0x01]);
    run(&mut cpu, 3);
    assert_eq!(cpu.a, 0x80);
    assert!(cpu.status.contains(Status::OVERFLOW));
    assert!(cpu.status.contains(Status::NEGATIVE));
    assert!(!cpu.status.contains(Status::CARRY));

    // CLC; LDA #$FF; ADC #$01
    let mut cpu = cpu_with(&[0x18, 0xA9, 0xFF, 0x69, 0x01]);
    run(&mut cpu, 3);
    assert_eq!(cpu.a, 0x00);
    assert!(cpu.status.contains(Status::CARRY));
    assert!(cpu.status.contains(Status::ZERO));
    assert!(!cpu.status.contains(Status::OVERFLOW));
}

#[test]
fn sbc_borrows_through_carry() {
    // SEC; LDA #$05; SBC #$03
    let mut cpu = cpu_with(&[0x38, 0xA9, 0x05, 0xE9, 0x03]);
    run(&mut cpu, 3);
    assert_eq!(cpu.a, 0x02);
    assert!(cpu.status.contains(Status::CARRY));

    // SEC; LDA #$03; SBC #$05
    let mut cpu = cpu_with(&[0x38, 0xA9, 0x03, 0xE9, 0x05]);
    run(&mut cpu, 3);
    assert_eq!(cpu.a, 0xFE);
    assert!(!cpu.status.contains(Status::CARRY));
    assert!(cpu.status.contains(Status::NEGATIVE));
}

#[test]
fn cmp_sets_flags_like_subtraction() {
    // LDA #$40; CMP #$40; CMP #$41
    let mut cpu = cpu_with(&[0xA9, 0x40, 0xC9, 0x40, 0xC9, 0x41]);
    run(&mut cpu, 2);
    assert!(cpu.status.contains(Status::ZERO | Status::CARRY));
    run(&mut cpu, 1);
    assert!(!cpu.status.contains(Status::ZERO));
    assert!(!cpu.status.contains(Status::CARRY));
    assert!(cpu.status.contains(Status::NEGATIVE));
}

#[test]
fn bit_copies_high_bits() {
    // LDA #$01; BIT $10
    let mut cpu = cpu_with(&[0xA9, 0x01, 0x24, 0x10]);
    cpu.bus.mem[0x10] = 0xC0;
    run(&mut cpu, 2);
    assert!(cpu.status.contains(Status::ZERO | Status::NEGATIVE | Status::OVERFLOW));
}

#[test]
fn asl_and_ror_move_through_carry() {
    // LDA #$81; ASL A; ROR A
    let mut cpu = cpu_with(&[0xA9, 0x81, 0x0A, 0x6A]);
    run(&mut cpu, 2);
    assert_eq!(cpu.a, 0x02);
    assert!(cpu.status.contains(Status::CARRY));
    run(&mut cpu, 1);
    assert_eq!(cpu.a, 0x81);
    assert!(!cpu.status.contains(Status::CARRY));
}

#[test]
fn inc_memory_wraps() {
    let mut cpu = cpu_with(&[0xE6, 0x10]); // INC $10
    cpu.bus.mem[0x10] = 0xFF;
    run(&mut cpu, 1);
    assert_eq!(cpu.bus.mem[0x10], 0x00);
    assert!(cpu.status.contains(Status::ZERO));
}

#[test]
fn jmp_changes_program_counter() {
    let mut cpu = cpu_with(&[0x4C, 0x00, 0x90]); // JMP $9000
    cpu.bus.mem[0x9000] = 0xA9; // LDA #$55
    cpu.bus.mem[0x9001] = 0x55;
    run(&mut cpu, 2);
    assert_eq!(cpu.a, 0x55);
}

#[test]
fn jmp_indirect_wraps_within_page() {
    let mut cpu = cpu_with(&[0x6C, 0xFF, 0x02]); // JMP ($02FF)
    cpu.bus.mem[0x02FF] = 0x34;
    cpu.bus.mem[0x0200] = 0x12;
    cpu.bus.mem[0x0300] = 0x56;
    run(&mut cpu, 1);
    assert_eq!(cpu.pc, 0x1234);
}

#[test]
fn bne_loops_until_zero() {
    // LDX #3; DEX; BNE -3
    let mut cpu = cpu_with(&[0xA2, 0x03, 0xCA, 0xD0, 0xFD]);
    run(&mut cpu, 7);
    assert_eq!(cpu.x, 0x00);
    assert_eq!(cpu.pc, 0x8005);
}

#[test]
fn branch_cycle_costs() {
    // BEQ +2 not taken: 2 cycles.
    let mut cpu = cpu_with(&[0xF0, 0x02]);
    assert_eq!(cpu.step(), Ok(2));

    // BNE +2 taken, same page: 3 cycles.
    let mut cpu = cpu_with(&[0xD0, 0x02]);
    assert_eq!(cpu.step(), Ok(3));
    assert_eq!(cpu.pc, 0x8004);

    // BNE -3 taken across into $7Fxx: 4 cycles.
    let mut cpu = cpu_with(&[0xD0, 0xFB]);
    assert_eq!(cpu.step(), Ok(4));
    assert_eq!(cpu.pc, 0x7FFD);
}

#[test]
fn page_cross_adds_a_cycle_for_reads_only() {
    // LDX #$01; LDA $80FF,X (crosses); STA $80FF,X (fixed 5)
    let mut cpu = cpu_with(&[0xA2, 0x01, 0xBD, 0xFF, 0x80, 0x9D, 0xFF, 0x80]);
    assert_eq!(cpu.step(), Ok(2));
    assert_eq!(cpu.step(), Ok(5));
    assert_eq!(cpu.step(), Ok(5));
}

#[test]
fn step_reports_elapsed_cycles_to_bus() {
    let mut cpu = cpu_with(&[0xA9, 0x01, 0x8D, 0x00, 0x02, 0xEA]); // LDA #; STA abs; NOP
    let start = cpu.cycles;
    run(&mut cpu, 3);
    assert_eq!(cpu.bus.ticked, 2 + 4 + 2);
    assert_eq!(cpu.cycles - start, 8);
}

#[test]
fn jsr_and_rts_work() {
    // JSR $9000; LDA #$11
    let mut cpu = cpu_with(&[0x20, 0x00, 0x90, 0xA9, 0x11]);
    cpu.bus.mem[0x9000] = 0xA9; // LDA #$22
    cpu.bus.mem[0x9001] = 0x22;
    cpu.bus.mem[0x9002] = 0x60; // RTS

    run(&mut cpu, 1);
    assert_eq!(cpu.sp, 0xFB);
    // Return address pushed is the last byte of the JSR.
    assert_eq!(cpu.bus.mem[0x01FD], 0x80);
    assert_eq!(cpu.bus.mem[0x01FC], 0x02);

    run(&mut cpu, 3);
    assert_eq!(cpu.a, 0x11);
    assert_eq!(cpu.sp, 0xFD);
}

#[test]
fn php_pushes_break_and_plp_drops_it() {
    // PHP; PLP
    let mut cpu = cpu_with(&[0x08, 0x28]);
    cpu.status = Status::CARRY | Status::UNUSED;
    run(&mut cpu, 1);
    assert_eq!(cpu.bus.mem[0x01FD], 0x31);
    run(&mut cpu, 1);
    assert_eq!(cpu.status, Status::CARRY | Status::UNUSED);
}

#[test]
fn brk_jumps_to_irq_vector_and_rti_returns() {
    let mut cpu = cpu_with(&[0x00, 0xEA, 0xA9, 0x07]); // BRK (+padding); LDA #$07
    cpu.bus.mem[0xFFFE] = 0x00;
    cpu.bus.mem[0xFFFF] = 0x90;
    cpu.bus.mem[0x9000] = 0x40; // RTI
    cpu.status = Status::UNUSED;

    assert_eq!(cpu.step(), Ok(7));
    assert_eq!(cpu.pc, 0x9000);
    assert!(cpu.status.contains(Status::INTERRUPT_DISABLE));
    // Pushed status has B set.
    assert_eq!(cpu.bus.mem[0x01FB] & 0x30, 0x30);

    run(&mut cpu, 2);
    assert_eq!(cpu.a, 0x07);
    assert!(!cpu.status.contains(Status::INTERRUPT_DISABLE));
}

#[test]
fn nmi_is_serviced_before_next_instruction() {
    let mut cpu = cpu_with(&[0xEA]);
    cpu.bus.mem[0xFFFA] = 0x00;
    cpu.bus.mem[0xFFFB] = 0xA0;
    cpu.bus.mem[0xA000] = 0xA9; // LDA #$5A
    cpu.bus.mem[0xA001] = 0x5A;
    cpu.status = Status::UNUSED;
    cpu.bus.nmi = true;

    assert_eq!(cpu.step(), Ok(7 + 2));
    assert_eq!(cpu.a, 0x5A);
    assert!(cpu.status.contains(Status::INTERRUPT_DISABLE));
    // Return address is the interrupted instruction; B clear in the pushed status.
    assert_eq!(cpu.bus.mem[0x01FD], 0x80);
    assert_eq!(cpu.bus.mem[0x01FC], 0x00);
    assert_eq!(cpu.bus.mem[0x01FB] & 0x30, 0x20);
}

#[test]
fn irq_is_masked_by_interrupt_disable() {
    let mut cpu = cpu_with(&[0xEA, 0x58, 0xEA]); // NOP; CLI; NOP
    cpu.bus.mem[0xFFFE] = 0x00;
    cpu.bus.mem[0xFFFF] = 0xB0;
    cpu.bus.mem[0xB000] = 0xEA;
    cpu.bus.irq = true;

    run(&mut cpu, 2);
    assert_eq!(cpu.pc, 0x8002);

    run(&mut cpu, 1);
    assert_eq!(cpu.pc, 0xB001);
    assert!(cpu.status.contains(Status::INTERRUPT_DISABLE));
}

#[test]
fn unknown_opcode_is_an_error() {
    let mut cpu = cpu_with(&[0x02]);
    assert_eq!(
        cpu.step(),
        Err(CpuError::UnknownOpcode {
            opcode: 0x02,
            pc: 0x8000
        })
    );
}

#[test]
fn status_survives_interrupt_push_and_pull() {
    let kept = !(Status::BREAK | Status::UNUSED);
    for byte in 0..=255u8 {
        let status = Status::from_bits_retain(byte);

        let pushed = status.pushed_by_interrupt();
        assert_eq!(pushed & 0x30, 0x20, "interrupt push: B clear, U set");
        let restored = Status::pulled(pushed);
        assert_eq!(restored & kept, status & kept);
        assert!(restored.contains(Status::UNUSED));
        assert!(!restored.contains(Status::BREAK));

        let restored = Status::pulled(status.pushed_by_instruction());
        assert_eq!(restored & kept, status & kept);
    }
}

#[test]
fn pulled_status_ignores_break_and_forces_unused() {
    for byte in 0..=255u8 {
        let status = Status::pulled(byte);
        assert!(!status.contains(Status::BREAK));
        assert!(status.contains(Status::UNUSED));
        assert_eq!(status.bits() & 0xCF, byte & 0xCF);
    }
}

#[test]
fn instruction_table_has_official_opcodes_only() {
    assert_eq!(INSTRUCTIONS.iter().flatten().count(), 151);
    for (opcode, entry) in INSTRUCTIONS.iter().enumerate() {
        if let Some(inst) = entry {
            assert_eq!(inst.opcode as usize, opcode);
        }
    }
    assert!(lookup(0xEA).is_some());
    assert!(lookup(0xFF).is_none());
}
