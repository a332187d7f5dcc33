use super::*;

struct TestBus {
    words: Vec<u16>,
}

impl MemorySsp1601 for TestBus {
    fn read_external(&mut self, addr: u32) -> Result<u16, SspFault> {
        self.words
            .get(addr as usize)
            .copied()
            .ok_or(SspFault::OutOfRangeAddress { address: addr })
    }

    fn write_external(&mut self, addr: u32, val: u16) -> Result<(), SspFault> {
        match self.words.get_mut(addr as usize) {
            Some(w) => {
                *w = val;
                Ok(())
            }
            None => Err(SspFault::AccessDenied { address: addr }),
        }
    }
}

fn make_cpu(program: &[u16]) -> Ssp1601<TestBus> {
    let mut cpu = Ssp1601::new(TestBus {
        words: vec![0; 0x1000],
    });
    cpu.load_program(RESET_VECTOR, program);
    cpu
}

// Encodings used below
const LDI_A: u16 = 0x0830;
const LDI_X: u16 = 0x0810;
const LD_PMC_A: u16 = 0x00E3;
const RET: u16 = 0x0065;

#[test]
fn test_reset_vector_and_idempotence() {
    let mut cpu = make_cpu(&[LDI_A, 0x1234]);
    assert_eq!(cpu.regs.pc, RESET_VECTOR);
    cpu.step();
    cpu.xst = 0x55;
    cpu.set_ram(1, 0x20, 0x7777);

    cpu.reset();
    let first = cpu.state();
    cpu.reset();
    assert_eq!(cpu.state(), first);
    assert_eq!(cpu.regs.pc, RESET_VECTOR);
    assert_eq!(cpu.regs.acc, 0);
    assert_eq!(cpu.ram(1, 0x20), 0);
    assert_eq!(cpu.xst, 0);
    // Program memory is kept
    assert_eq!(cpu.program_word(RESET_VECTOR), LDI_A);
}

#[test]
fn test_nop() {
    let mut cpu = make_cpu(&[0x0000]);
    let r = cpu.step();
    assert_eq!(r, StepResult { cycles: 1, fault: None });
    assert_eq!(cpu.regs.pc, RESET_VECTOR + 1);
}

#[test]
fn test_load_immediate_takes_two_words() {
    let mut cpu = make_cpu(&[LDI_A, 0x1234]);
    let r = cpu.step();
    assert_eq!(r.cycles, 2);
    assert_eq!(cpu.regs.pc, RESET_VECTOR + 2);
    assert_eq!(cpu.regs.a(), 0x1234);
}

#[test]
fn test_register_move_reads_source_first() {
    // ld X, A ; ld A, STACK ; ld STACK, A
    let mut cpu = make_cpu(&[0x0013, 0x0035, 0x0053]);
    cpu.regs.set_a(0x4242);
    cpu.regs.push(0x0099);
    cpu.step();
    assert_eq!(cpu.regs.x, 0x4242);
    cpu.step();
    assert_eq!(cpu.regs.a(), 0x0099);
    assert_eq!(cpu.regs.stack_depth(), 0);
    cpu.step();
    assert_eq!(cpu.regs.stack_depth(), 1);
}

#[test]
fn test_compare_sets_zero_without_touching_accumulator() {
    // ldi A, 5 ; cmp A, #5 ; cmp A, #6
    let mut cpu = make_cpu(&[LDI_A, 0x0005, 0x6800, 0x0005, 0x6800, 0x0006]);
    cpu.regs.set_al(0xBEEF);
    cpu.step();
    cpu.step();
    assert!(cpu.regs.flags().zero);
    assert_eq!(cpu.regs.acc, 0x0005_BEEF);
    cpu.step();
    assert!(!cpu.regs.flags().zero);
    assert!(cpu.regs.flags().negative);
    assert_eq!(cpu.regs.acc, 0x0005_BEEF);
}

#[test]
fn test_add_immediate() {
    let mut cpu = make_cpu(&[LDI_A, 0x0010, 0x8800, 0x0020]);
    cpu.step();
    cpu.step();
    assert_eq!(cpu.regs.a(), 0x0030);
    assert!(!cpu.regs.flags().zero);
}

#[test]
fn test_conditional_branch() {
    // cmp A, #0 ; bra eq, 0x0500 ; (falls through otherwise)
    let mut cpu = make_cpu(&[0x6800, 0x0000, 0x4D50, 0x0500]);
    cpu.step();
    let r = cpu.step();
    assert_eq!(cpu.regs.pc, 0x0500);
    assert_eq!(r.cycles, 3);

    let mut cpu = make_cpu(&[0x6800, 0x0001, 0x4D50, 0x0500]);
    cpu.step();
    let r = cpu.step();
    assert_eq!(cpu.regs.pc, RESET_VECTOR + 4);
    assert_eq!(r.cycles, 2);
}

#[test]
fn test_relative_branch_from_next_instruction() {
    // brr always, +2 ; two skipped words ; nop
    let mut cpu = make_cpu(&[0x4E00, 0x0002, LDI_A, 0x1111, 0x0000]);
    cpu.step();
    assert_eq!(cpu.regs.pc, RESET_VECTOR + 4);

    let mut cpu = make_cpu(&[0x4E00, 0xFFFE]);
    cpu.step();
    assert_eq!(cpu.regs.pc, RESET_VECTOR);
}

#[test]
fn test_call_and_return() {
    let mut cpu = make_cpu(&[0x4800, 0x0600]);
    cpu.load_program(0x0600, &[RET]);
    cpu.step();
    assert_eq!(cpu.regs.pc, 0x0600);
    assert_eq!(cpu.regs.stack_depth(), 1);
    cpu.step();
    assert_eq!(cpu.regs.pc, RESET_VECTOR + 2);
    assert_eq!(cpu.regs.stack_depth(), 0);
}

#[test]
fn test_store_through_post_incremented_pointer() {
    // ldi r0, 0x10 ; ldi (r0+), 0xAAAA ; ld X, (r0-)
    let mut cpu = make_cpu(&[0x1810, 0x0C04, 0xAAAA, 0x0218]);
    cpu.set_ram(0, 0x11, 0x5555);
    cpu.step();
    assert_eq!(cpu.regs.pointers[0].value, 0x10);
    cpu.step();
    assert_eq!(cpu.ram(0, 0x10), 0xAAAA);
    assert_eq!(cpu.regs.pointers[0].value, 0x11);
    cpu.step();
    assert_eq!(cpu.regs.x, 0x5555);
    assert_eq!(cpu.regs.pointers[0].value, 0x10);
}

#[test]
fn test_direct_pointer_registers_are_not_modified() {
    // ld X, (r7) with m = 2 reads bank 1 word 2
    let op = (0x01 << 9) | 0x0100 | 0x0010 | (2 << 2) | 3;
    let mut cpu = make_cpu(&[op]);
    cpu.set_ram(1, 2, 0x1357);
    cpu.regs.pointers[7].value = 0x40;
    cpu.step();
    assert_eq!(cpu.regs.x, 0x1357);
    assert_eq!(cpu.regs.pointers[7].value, 0x40);
}

#[test]
fn test_double_indirect_reads_external_memory() {
    // ld A, ((r0))
    let mut cpu = make_cpu(&[0x0A30]);
    cpu.set_ram(0, 0, 0x0100);
    cpu.memory.words[0x100] = 0xBEEF;
    let r = cpu.step();
    assert_eq!(r, StepResult { cycles: 2, fault: None });
    assert_eq!(cpu.regs.a(), 0xBEEF);
    assert_eq!(cpu.ram(0, 0), 0x0101);
}

#[test]
fn test_external_fault_reads_zero() {
    let mut cpu = make_cpu(&[0x0A30]);
    cpu.regs.set_a(0xFFFF);
    cpu.set_ram(0, 0, 0x8000);
    let r = cpu.step();
    assert_eq!(
        r.fault,
        Some(SspFault::OutOfRangeAddress { address: 0x8000 })
    );
    assert_eq!(cpu.regs.a(), 0);
    // The next step starts clean
    cpu.load_program(RESET_VECTOR + 1, &[0x0000]);
    assert_eq!(cpu.step().fault, None);
}

#[test]
fn test_pm_read_channel_auto_increments() {
    let mut cpu = make_cpu(&[
        LDI_A, 0x0010, LD_PMC_A, // address low half
        LDI_A, 0x0800, LD_PMC_A, // mode: +1
        0x0008, // ld -, PM0
        0x0038, // ld A, PM0
        0x0018, // ld X, PM0
    ]);
    cpu.memory.words[0x10] = 0x1111;
    cpu.memory.words[0x11] = 0x2222;
    for _ in 0..5 {
        cpu.step();
    }
    assert!(!cpu.pm.is_programming());
    assert!(cpu.pm.read[0].active);

    let r = cpu.step();
    assert_eq!(r.cycles, 2);
    assert_eq!(cpu.regs.a(), 0x1111);
    cpu.step();
    assert_eq!(cpu.regs.x, 0x2222);
    assert_eq!(cpu.pm.read[0].address, 0x12);
}

#[test]
fn test_pm_write_channel() {
    let mut cpu = make_cpu(&[
        LDI_A, 0x0020, LD_PMC_A,
        LDI_A, 0x1000, LD_PMC_A, // mode: +2
        0x0090, // ld PM1, -
        LDI_A, 0xCAFE,
        0x0093, // ld PM1, A
        0x0093,
    ]);
    for _ in 0..8 {
        cpu.step();
    }
    assert_eq!(cpu.memory.words[0x20], 0xCAFE);
    assert_eq!(cpu.memory.words[0x22], 0xCAFE);
    assert_eq!(cpu.memory.words[0x21], 0);
}

#[test]
fn test_unprogrammed_pm_acts_as_latch() {
    // ld PM2, A ; ld X, PM2
    let mut cpu = make_cpu(&[0x00A3, 0x001A]);
    cpu.regs.set_a(0x6789);
    cpu.step();
    let r = cpu.step();
    assert_eq!(cpu.regs.x, 0x6789);
    assert_eq!(r.cycles, 1);
}

#[test]
fn test_xst_mailbox() {
    // ld XST, A
    let mut cpu = make_cpu(&[0x00D3]);
    cpu.regs.set_a(0x00AB);
    cpu.step();
    assert_eq!(Chip::read(&cpu, HOST_PORT_XST), 0x00AB);
    Chip::write(&mut cpu, HOST_PORT_XST, 0x0042);
    assert_eq!(cpu.xst, 0x0042);
}

#[test]
fn test_invalid_instruction_advances_pc() {
    let mut cpu = make_cpu(&[0x1000, 0x0000]);
    let r = cpu.step();
    assert_eq!(r.cycles, 1);
    assert_eq!(
        r.fault,
        Some(SspFault::InvalidInstruction {
            opcode: 0x1000,
            pc: RESET_VECTOR
        })
    );
    assert_eq!(cpu.regs.pc, RESET_VECTOR + 1);
}

#[test]
fn test_multiply_accumulate() {
    // ldi X, 3 ; ld Y, X ; mpya (r0), (r4)
    let mut cpu = make_cpu(&[LDI_X, 0x0003, 0x0021, 0x9600]);
    cpu.set_ram(0, 0, 0x0010);
    cpu.set_ram(1, 0, 0x0020);
    cpu.step();
    cpu.step();
    cpu.step();
    // 3 * 3 * 2 = 18
    assert_eq!(cpu.regs.acc, 18);
    assert_eq!(cpu.regs.x, 0x0010);
    assert_eq!(cpu.regs.y, 0x0020);
}

#[test]
fn test_modify_negates_when_condition_holds() {
    // ldi A, 1 ; mod always, neg
    let mut cpu = make_cpu(&[LDI_A, 0x0001, 0x9006]);
    cpu.step();
    cpu.step();
    assert_eq!(cpu.regs.a(), 0xFFFF);
    assert!(cpu.regs.flags().negative);
}

#[test]
fn test_chip_update_spends_budget() {
    let mut cpu = make_cpu(&[0x0000; 16]);
    let spent = Chip::update(&mut cpu, 10);
    assert_eq!(spent, 10);
    assert_eq!(cpu.regs.pc, RESET_VECTOR + 10);
    assert_eq!(cpu.cycles, 10);
}

#[test]
fn test_state_serializes() {
    let mut cpu = make_cpu(&[LDI_A, 0x0042]);
    cpu.step();
    let state = cpu.state();
    let json = serde_json::to_string(&state).expect("serialize");
    let back: Ssp1601State = serde_json::from_str(&json).expect("deserialize");

    let mut other = make_cpu(&[]);
    other.restore_state(&back);
    assert_eq!(other.regs.a(), 0x0042);
    assert_eq!(other.regs.pc, RESET_VECTOR + 2);
    assert_eq!(other.cycles, 2);
}

#[test]
fn test_chip_update_overshoots_by_one_instruction() {
    let mut cpu = make_cpu(&[LDI_A, 0x0001, LDI_A, 0x0002]);
    let spent = Chip::update(&mut cpu, 3);
    assert_eq!(spent, 4);
    assert_eq!(cpu.regs.a(), 0x0002);
}

#[test]
fn test_state_validation() {
    let cpu = make_cpu(&[]);
    assert_eq!(cpu.state().validate(), Ok(()));

    let mut short_ram = cpu.state();
    short_ram.ram.truncate(3);
    assert!(short_ram.validate().is_err());

    let mut json = serde_json::to_value(cpu.state()).expect("serialize");
    json["regs"]["stack_ptr"] = serde_json::json!(50);
    let deep_stack: Ssp1601State = serde_json::from_value(json).expect("deserialize");
    let err = deep_stack.validate().unwrap_err();
    assert!(err.contains("stack pointer 50"));
}
