use std::fmt::Write;

use criterion::{criterion_group, criterion_main, Criterion};
use pop65::assemble_str;

/// A program exercising labels, branches, conditionals and data.
fn synthetic_source(blocks: usize) -> String {
    let mut src = String::from(".org $0800\nzp = $20\n.dbg \"al {V} .{L}\"\n");
    for i in 0..blocks {
        let _ = write!(
            src,
            "; block {i}\n\
             block{i}:\n\
             \tldx #0\n\
             loop{i}: lda table{i},x\n\
             \tsta zp,x\n\
             \tinx\n\
             \tcpx #4\n\
             \tbne loop{i}\n\
             .if ({i} % 2) = 0\n\
             \tjsr block0\n\
             .else\n\
             \tnop\n\
             .endif\n\
             \tjmp next{i}\n\
             table{i} .byte 1, 2, 3, <table{i}\n\
             next{i}:\n"
        );
    }
    src.push_str("\trts\n");
    src
}

fn criterion_benchmark(c: &mut Criterion) {
    let src = synthetic_source(500);
    c.bench_function("assemble_500_blocks", |b| {
        b.iter(|| assemble_str(&src).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
