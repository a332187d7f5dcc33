use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use emu_core::cpu_ssp1601::{MemorySsp1601, Ssp1601, SspFault, RESET_VECTOR};

/// Flat external memory for benchmarking
struct BenchMemory {
    words: Vec<u16>,
}

impl MemorySsp1601 for BenchMemory {
    fn read_external(&mut self, addr: u32) -> Result<u16, SspFault> {
        Ok(self.words[addr as usize & 0xFFFF])
    }

    fn write_external(&mut self, addr: u32, val: u16) -> Result<(), SspFault> {
        self.words[addr as usize & 0xFFFF] = val;
        Ok(())
    }
}

fn make_cpu() -> Ssp1601<BenchMemory> {
    let mut cpu = Ssp1601::new(BenchMemory {
        words: vec![0; 0x10000],
    });
    cpu.load_program(
        RESET_VECTOR,
        &[
            0x0830, 0x0042, // ldi A, 0x42
            0x0810, 0x0003, // ldi X, 3
            0x0021, // ld Y, X
            0x8800, 0x0001, // add A, #1
            0x6800, 0x0100, // cmp A, #0x100
            0x0A30, // ld A, ((r0))
            0x9600, // mpya (r0), (r4)
            0x4C00, RESET_VECTOR, // bra always
        ],
    );
    cpu
}

fn bench_cpu_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_ssp1601_step");

    group.bench_function("single_instruction", |b| {
        b.iter(|| {
            let mut cpu = make_cpu();
            cpu.step();
            black_box(cpu.regs.acc);
        });
    });

    group.finish();
}

fn bench_cpu_multiple_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_ssp1601_multiple_steps");

    for step_count in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(step_count),
            step_count,
            |b, &count| {
                let mut cpu = make_cpu();
                b.iter(|| {
                    cpu.reset();
                    for _ in 0..count {
                        cpu.step();
                    }
                    black_box(cpu.cycles);
                });
            },
        );
    }

    group.finish();
}

fn bench_cpu_reset(c: &mut Criterion) {
    c.bench_function("cpu_ssp1601_reset", |b| {
        let mut cpu = make_cpu();
        b.iter(|| {
            cpu.reset();
            black_box(cpu.regs.pc);
        });
    });
}

criterion_group!(benches, bench_cpu_step, bench_cpu_multiple_steps, bench_cpu_reset);
criterion_main!(benches);
