use expectimax_2048::engine::{free_cells, Board, Move};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;

fn corpus() -> Vec<Board> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut boards = Vec::new();
    boards.push(Board::EMPTY);
    let mut b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    boards.push(b);
    let seq = [Move::Left, Move::Up, Move::Right, Move::Down];
    for i in 0..20 {
        let dir = seq[i % seq.len()];
        let nb = b.shift(dir);
        if nb != b { b = nb.with_random_tile(&mut rng); }
        boards.push(b);
    }
    boards
}

fn bench_apply(c: &mut Criterion) {
    let boards = corpus();
    for dir in Move::ALL {
        c.bench_function(&format!("apply/{dir}"), |bch| {
            bch.iter(|| {
                let mut acc = 0u64;
                for &bd in &boards {
                    let out = bd.apply(dir);
                    acc = acc.wrapping_add(out.score + out.moved as u64);
                }
                black_box(acc)
            })
        });
    }
}

fn bench_free_cells(c: &mut Criterion) {
    let boards = corpus();
    c.bench_function("free_cells", |bch| {
        bch.iter(|| {
            let mut acc = 0usize;
            for bd in &boards { acc += free_cells(bd).len(); }
            black_box(acc)
        })
    });
    c.bench_function("is_game_over", |bch| {
        bch.iter(|| {
            let mut acc = 0u32;
            for &bd in &boards { acc += bd.is_game_over() as u32; }
            black_box(acc)
        })
    });
}

criterion_group!(engine_ops, bench_apply, bench_free_cells);
criterion_main!(engine_ops);
