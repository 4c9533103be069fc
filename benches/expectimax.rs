use expectimax_2048::engine::{Board, Move};
use expectimax_2048::expectimax::{Expectimax, ExpectimaxParallel};
use expectimax_2048::game::Game;
use criterion::{criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;

fn corpus() -> Vec<Board> {
    let mut rng = StdRng::seed_from_u64(4242);
    let mut boards = Vec::new();
    let mut b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    boards.push(b);
    let seq = [Move::Left, Move::Up, Move::Right, Move::Down];
    for i in 0..32 {
        let dir = seq[i % seq.len()];
        let nb = b.shift(dir);
        if nb != b { b = nb.with_random_tile(&mut rng); }
        boards.push(b);
    }
    boards
}

fn bench_best_move(c: &mut Criterion) {
    let boards = corpus();
    let mut seq = Expectimax::new();
    let mut par = ExpectimaxParallel::new();

    c.bench_function("expectimax_seq/best_move", |bch| {
        bch.iter(|| {
            let mut acc = 0usize;
            for &bd in &boards {
                acc ^= seq.best_move(bd).map(|mv| mv.index()).unwrap_or(0);
            }
            black_box(acc)
        })
    });

    c.bench_function("expectimax_par/best_move", |bch| {
        bch.iter(|| {
            let mut acc = 0usize;
            for &bd in &boards {
                acc ^= par.best_move(bd).map(|mv| mv.index()).unwrap_or(0);
            }
            black_box(acc)
        })
    });
}

fn bench_e2e(c: &mut Criterion) {
    let mut ex = Expectimax::new();
    c.bench_function("e2e_seq/32_moves", |bch| {
        bch.iter(|| {
            let mut game = Game::new(7);
            while game.moves() < 32 && !game.is_over() {
                match ex.best_move(game.board()) {
                    Some(dir) => { game.apply(dir); }
                    None => break,
                }
            }
            black_box((game.score(), game.moves()))
        })
    });
}

criterion_group! {
    name = expectimax;
    config = Criterion::default().sample_size(10);
    targets = bench_best_move, bench_e2e
}
criterion_main!(expectimax);
