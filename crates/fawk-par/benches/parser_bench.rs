//! Parser throughput benchmark.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fawk_util::Handler;

const PROGRAM: &str = r#"
function record_key(line, parts,    n) {
    n = split(line, parts, ":")
    return n >= 3 ? parts[1] "/" parts[3] : line
}

BEGIN { FS = ":"; OFS = "\t" }

/^#/ { next }

$3 >= 1000 {
    key = record_key($0)
    seen[key]++
    total += $3
}

END {
    for (k in seen)
        printf "%-24s %4d\n", k, seen[k]
    print "total", total
}
"#;

fn bench_parser(c: &mut Criterion) {
    c.bench_function("parse_program", |b| {
        b.iter(|| {
            let handler = Handler::new();
            let program = fawk_par::parse_program(black_box(PROGRAM), None, &handler);
            black_box(program.items.len())
        })
    });
}

criterion_group!(benches, bench_parser);
criterion_main!(benches);
