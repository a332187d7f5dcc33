use emu_core::System;
use emu_segacd::{Processor, SegaCdSystem, WordRamMode};

fn main() {
    // At the reset vector: ldi r0, 0 ; ld A, ((r0)) ; bra always 0x0401
    let mut image = vec![0u8; 0x0400 * 2];
    for word in [0x1800u16, 0x0A30, 0x4C00, 0x0401] {
        image.extend_from_slice(&word.to_be_bytes());
    }

    let mut sys = SegaCdSystem::default();
    sys.mount("Program", &image).unwrap();
    sys.set_mode(WordRamMode::FullSub);
    for i in 0..8u16 {
        sys.write_word(Processor::Sub, u32::from(i) * 2, 0x1000 + i).unwrap();
    }

    let spent = sys.run_cycles(64).unwrap();
    println!("Headless DSP run: {} cycles, A={:04X}", spent, sys.dsp().regs.a());
    println!("Memory mode register: {:02X}", sys.memory_mode());
}
