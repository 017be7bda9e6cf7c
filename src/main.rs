//! Maze Engine Demo
//!
//! Creates a game on the bundled world, plays a few commands against it and
//! verifies that replaying the log reproduces the same state.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use maze::{
    game::ResourceKind, CharacterId, CommandError, Direction, EngineConfig, EventStore,
    FileEventStore, Game, GameId, GameService, InMemoryEventStore, ObstacleId, PathId,
    WorldDefinition, VERSION,
};

const MAGE: CharacterId = CharacterId(0);
const WARRIOR: CharacterId = CharacterId(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EngineConfig::from_env().context("invalid configuration")?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Maze Engine v{}", VERSION);
    info!("Room cap: {} players", config.max_players);

    match config.event_log_dir.clone() {
        Some(dir) => {
            info!("Event log: {}", dir.display());
            let store = FileEventStore::open(&dir).await.context("opening event log")?;
            demo_game(GameService::new(store, config)).await
        }
        None => {
            info!("Event log: in-memory");
            demo_game(GameService::new(InMemoryEventStore::new(), config)).await
        }
    }
}

/// Demo function to exercise the engine end to end.
async fn demo_game<S: EventStore>(service: GameService<S>) -> anyhow::Result<()> {
    info!("=== Creating Game ===");

    let mut updates = service.subscribe();
    let feed = tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            let resources: Vec<&str> = update.resources.iter().map(ResourceKind::as_str).collect();
            info!("  -> update v{}: {}", update.version, resources.join(", "));
        }
    });

    let definition = WorldDefinition::grid15()?;
    let created = service.create_game(definition).await?;
    let game_id = created.value.id;
    info!("Game {} on '{}' at version {}", game_id, created.value.world, created.version);

    for name in ["ada", "grace", "linus"] {
        let player = service.join_game(game_id, name).await?.value;
        info!("Player {} ({}) joined", player.id, player.name);
    }
    for player in service.players(game_id).await? {
        info!("  {} controls {:?}", player.name, player.actions);
    }

    info!("=== Exploring ===");
    let mage = service.character(game_id, MAGE).await?;
    info!(
        "Mage at {}: {} moves, {} portals",
        mage.location,
        mage.actions.movements.len(),
        mage.actions.portals.len()
    );

    let portal = service.use_portal(game_id, MAGE, PathId(23)).await?;
    info!("Mage took the portal to {}", portal.value.location);
    let back = service.use_portal(game_id, MAGE, PathId(29)).await?;
    info!("Mage came back to {}", back.value.location);

    service.move_character(game_id, WARRIOR, Direction::East, 1).await?;
    for (direction, steps) in [
        (Direction::North, 2),
        (Direction::West, 2),
        (Direction::South, 2),
        (Direction::West, 1),
        (Direction::North, 1),
    ] {
        let moved = service.move_character(game_id, MAGE, direction, steps).await?;
        info!("Mage moved {:?} x{} to {}", direction, steps, moved.value.location);
    }

    match service.clear_obstacle(game_id, WARRIOR, ObstacleId(0)).await {
        Err(CommandError::NotAnAvailableAction) => info!("Warrior cannot dispel a force field"),
        other => warn!("Unexpected result for warrior clear: {:?}", other.map(|o| o.version)),
    }

    let cleared = service.clear_obstacle(game_id, MAGE, ObstacleId(0)).await?;
    info!("Force field dispelled at version {}", cleared.version);
    info!(
        "Discovered: {} locations, {} paths, {} obstacles",
        service.discovered_locations(game_id).await?.len(),
        service.discovered_paths(game_id).await?.len(),
        service.discovered_obstacles(game_id).await?.len()
    );

    info!("=== Optimistic Concurrency ===");
    demo_conflict(&service, game_id).await?;

    info!("=== Verifying Determinism ===");
    let hash = service.game_hash(game_id).await?;
    info!("Service State Hash: {}", hex::encode(hash));

    let history = service.repository().history(game_id).await?;
    let replayed = Game::replay(game_id, &history)?;
    let replay_hash = replayed.compute_hash();
    info!("Replay State Hash:  {}", hex::encode(replay_hash));

    if hash == replay_hash {
        info!("DETERMINISM VERIFIED: Hashes match!");
    } else {
        warn!("DETERMINISM FAILURE: Hashes differ!");
    }

    drop(service);
    feed.await.ok();
    Ok(())
}

/// Two writers decide against the same version; the loser retries.
async fn demo_conflict<S: EventStore>(service: &GameService<S>, game_id: GameId) -> anyhow::Result<()> {
    use maze::store::ExpectedVersion;

    let snapshot = service.repository().load(game_id).await?;
    info!("Both writers read version {}", snapshot.version);

    // Writer A commits through the service
    let joined = service.join_game(game_id, "hopper").await?;
    info!("Writer A appended at version {}", joined.version);

    // Writer B appends against its stale snapshot
    let stale = vec![maze::GameEvent::PlayerLeft { player: joined.value.id }];
    let outcome = service
        .repository()
        .append(game_id, ExpectedVersion::Exact(snapshot.version), &stale)
        .await?;
    info!("Writer B got {:?}", outcome);

    // Writer B retries the whole command on fresh state
    let mut attempts = 0;
    loop {
        attempts += 1;
        match service.leave_game(game_id, joined.value.id).await {
            Ok(left) => {
                info!("Writer B succeeded at version {} after {} attempt(s)", left.version, attempts);
                return Ok(());
            }
            Err(e) if e.is_retryable() && attempts < 3 => warn!("Retrying: {}", e),
            Err(e) => return Err(e.into()),
        }
    }
}
