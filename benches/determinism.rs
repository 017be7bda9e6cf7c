//! Benchmarks for the event fold: replaying histories, discovery floods and
//! action derivation.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use maze::game::movement::available_actions;
use maze::game::world::{Character, CharacterClass, Location, Path};
use maze::{CharacterId, Direction, Game, GameEvent, GameId, LocationId, PathId, WorldDefinition};

/// Open `size` x `size` grid, every neighbour linked both ways, one
/// character in the corner.
fn open_grid(size: u32) -> Vec<GameEvent> {
    let cell = |x: u32, y: u32| LocationId(y * size + x);
    let locations = (0..size * size).map(|i| Location::new(LocationId(i))).collect();

    let mut paths = Vec::new();
    let mut link = |from: LocationId, to: LocationId, there: Direction, back: Direction| {
        let id = paths.len() as u32;
        paths.push(Path::new(PathId(id), from, to, there));
        paths.push(Path::new(PathId(id + 1), to, from, back));
    };
    for y in 0..size {
        for x in 0..size {
            if x + 1 < size {
                link(cell(x, y), cell(x + 1, y), Direction::East, Direction::West);
            }
            if y + 1 < size {
                link(cell(x, y), cell(x, y + 1), Direction::South, Direction::North);
            }
        }
    }

    vec![
        GameEvent::WorldLoaded { name: "open".to_string(), locations, paths, obstacles: Vec::new() },
        GameEvent::CharacterAdded {
            character: Character::new(CharacterId(0), CharacterClass::Rogue, cell(0, 0)),
        },
        GameEvent::RandomSeedSet { seed: 1 },
    ]
}

fn benchmark_replay(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("replay");
    let game_id = GameId::new_random();

    let grid15 = WorldDefinition::grid15().expect("bundled world").into_events(7);
    group.bench_function("grid15_creation", |bencher| {
        bencher.iter(|| black_box(Game::replay(game_id, &grid15).expect("replay")))
    });

    // Discovery floods the whole grid from the corner
    for size in [16u32, 64, 128] {
        let history = open_grid(size);
        group.bench_with_input(BenchmarkId::new("open_grid", size), &history, |bencher, history| {
            bencher.iter(|| black_box(Game::replay(game_id, history).expect("replay")))
        });
    }

    group.finish();
}

fn benchmark_available_actions(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("available_actions");
    let game_id = GameId::new_random();

    for size in [16u32, 64, 128] {
        let game = Game::replay(game_id, &open_grid(size)).expect("replay");
        group.bench_with_input(BenchmarkId::new("open_grid_corner", size), &game, |bencher, game| {
            bencher.iter(|| black_box(available_actions(game.world(), CharacterId(0))))
        });
    }

    group.finish();
}

fn benchmark_state_hash(criterion: &mut Criterion) {
    let game = Game::replay(GameId::new_random(), &open_grid(64)).expect("replay");

    criterion.bench_function("state_hash_open_grid_64", |bencher| {
        bencher.iter(|| black_box(game.compute_hash()))
    });
}

criterion_group!(benches, benchmark_replay, benchmark_available_actions, benchmark_state_hash);
criterion_main!(benches);
