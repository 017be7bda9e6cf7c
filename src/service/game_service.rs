//! Game Service
//!
//! Every command runs read snapshot -> resolve -> append at expected version
//! -> fold. No lock is held across that sequence; the expected-version check
//! at the log is the only concurrency control. A conflict is returned to the
//! caller, which owns any retry.

use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::core::hash::StateHash;
use crate::core::ids::{CharacterId, GameId, ObstacleId, PathId, PlayerId};
use crate::core::seed::derive_game_seed;
use crate::game::definition::WorldDefinition;
use crate::game::events::{ChangeSet, GameEvent};
use crate::game::movement::{resolve, Action};
use crate::game::state::{Game, Player};
use crate::game::world::{Direction, Location, Obstacle, Path};
use crate::store::event_store::{AppendOutcome, EventStore, ExpectedVersion};
use crate::store::repository::{GameRepository, LoadedGame};

use super::error::CommandError;
use super::views::{CharacterView, CommandOutcome, GameSummary, WorldUpdated};

/// Command and query surface for all games in one event store.
pub struct GameService<S> {
    repository: GameRepository<S>,
    config: EngineConfig,
    updates: broadcast::Sender<WorldUpdated>,
}

impl<S: EventStore> GameService<S> {
    /// Create a service over `store`.
    pub fn new(store: S, config: EngineConfig) -> Self {
        let (updates, _) = broadcast::channel(config.change_feed_capacity.max(1));

        Self {
            repository: GameRepository::new(store),
            config,
            updates,
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<WorldUpdated> {
        self.updates.subscribe()
    }

    /// The repository backing this service.
    pub fn repository(&self) -> &GameRepository<S> {
        &self.repository
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Create a game from a world definition.
    ///
    /// The creation batch (`WorldLoaded`, `CharacterAdded`..., `RandomSeedSet`)
    /// becomes the first events of a new stream.
    #[instrument(skip(self, definition), fields(world = %definition.name))]
    pub async fn create_game(
        &self,
        definition: WorldDefinition,
    ) -> Result<CommandOutcome<GameSummary>, CommandError> {
        definition.validate()?;

        let game_id = GameId::new_random();
        let seed = derive_game_seed(&game_id, &definition.name);
        let events = definition.into_events(seed);

        let mut game = Game::new(game_id);
        let mut touched = Vec::new();
        for event in &events {
            touched.extend(game.apply(event)?);
        }

        let version = match self.repository.append(game_id, ExpectedVersion::NoStream, &events).await? {
            AppendOutcome::Applied { version } => version,
            AppendOutcome::Conflict { current } => {
                return Err(CommandError::VersionConflict { expected: 0, actual: current });
            }
            AppendOutcome::NotFound => return Err(CommandError::GameNotFound(game_id)),
        };

        let changes = ChangeSet::from_touched(&touched);
        info!(%game_id, version, "Game created");
        self.publish(game_id, version, &changes);

        Ok(CommandOutcome { value: GameSummary::of(&game, version), version, changes })
    }

    /// Move a character `steps` segments in a cardinal direction.
    pub async fn move_character(
        &self,
        game_id: GameId,
        character: CharacterId,
        direction: Direction,
        steps: u32,
    ) -> Result<CommandOutcome<CharacterView>, CommandError> {
        self.perform(game_id, character, Action::Move { direction, steps }).await
    }

    /// Send a character through a portal.
    pub async fn use_portal(
        &self,
        game_id: GameId,
        character: CharacterId,
        path: PathId,
    ) -> Result<CommandOutcome<CharacterView>, CommandError> {
        self.perform(game_id, character, Action::UsePortal { path }).await
    }

    /// Have a character clear an obstacle.
    pub async fn clear_obstacle(
        &self,
        game_id: GameId,
        character: CharacterId,
        obstacle: ObstacleId,
    ) -> Result<CommandOutcome<CharacterView>, CommandError> {
        self.perform(game_id, character, Action::ClearObstacle { obstacle }).await
    }

    /// Validate `action` against a fresh snapshot and commit its event.
    #[instrument(skip(self))]
    pub async fn perform(
        &self,
        game_id: GameId,
        character: CharacterId,
        action: Action,
    ) -> Result<CommandOutcome<CharacterView>, CommandError> {
        let loaded = self.repository.load(game_id).await?;
        let event = resolve(loaded.game.world(), character, action).map_err(|e| {
            debug!(error = %e, "Action rejected");
            CommandError::from(e)
        })?;

        let (game, version, changes) = self.commit(loaded, event).await?;
        let view = game
            .world()
            .character(character)
            .map(|c| CharacterView::of(game.world(), c))
            .ok_or(CommandError::CharacterNotFound(character))?;

        Ok(CommandOutcome { value: view, version, changes })
    }

    /// Add a player; the fold assigns the lowest unused id.
    #[instrument(skip(self))]
    pub async fn join_game(
        &self,
        game_id: GameId,
        name: &str,
    ) -> Result<CommandOutcome<Player>, CommandError> {
        let loaded = self.repository.load(game_id).await?;
        let max = self.config.max_players;
        if loaded.game.player_count() >= max {
            return Err(CommandError::RoomFull { max });
        }

        let player_id = loaded.game.next_player_id();
        let (game, version, changes) = self
            .commit(loaded, GameEvent::PlayerJoined { name: name.to_string() })
            .await?;
        let player = game
            .player(player_id)
            .cloned()
            .ok_or_else(|| CommandError::InvariantViolation(format!("joined player {player_id} missing")))?;

        info!(%game_id, player = %player.id, "Player joined");
        Ok(CommandOutcome { value: player, version, changes })
    }

    /// Remove a player and rebalance the remaining roster.
    #[instrument(skip(self))]
    pub async fn leave_game(
        &self,
        game_id: GameId,
        player: PlayerId,
    ) -> Result<CommandOutcome<Player>, CommandError> {
        let loaded = self.repository.load(game_id).await?;
        let departed = loaded
            .game
            .player(player)
            .cloned()
            .ok_or(CommandError::PlayerNotFound(player))?;

        let (_, version, changes) = self.commit(loaded, GameEvent::PlayerLeft { player }).await?;

        info!(%game_id, %player, "Player left");
        Ok(CommandOutcome { value: departed, version, changes })
    }

    /// Fold `event` onto the snapshot, append it at the snapshot's version
    /// and publish the change set.
    async fn commit(
        &self,
        loaded: LoadedGame,
        event: GameEvent,
    ) -> Result<(Game, u64, ChangeSet), CommandError> {
        let LoadedGame { mut game, version: expected } = loaded;
        let game_id = game.id();

        // Fold first: an event that does not fold never reaches the log
        let touched = game.apply(&event)?;

        let version = match self
            .repository
            .append(game_id, ExpectedVersion::Exact(expected), std::slice::from_ref(&event))
            .await?
        {
            AppendOutcome::Applied { version } => version,
            AppendOutcome::Conflict { current } => {
                warn!(%game_id, expected, actual = current, kind = event.kind(), "Version conflict");
                return Err(CommandError::VersionConflict { expected, actual: current });
            }
            AppendOutcome::NotFound => return Err(CommandError::GameNotFound(game_id)),
        };

        let changes = ChangeSet::from_touched(&touched);
        debug!(%game_id, version, kind = event.kind(), "Event committed");
        self.publish(game_id, version, &changes);

        Ok((game, version, changes))
    }

    fn publish(&self, game_id: GameId, version: u64, changes: &ChangeSet) {
        // No subscribers is fine
        let _ = self.updates.send(WorldUpdated { game_id, version, resources: changes.clone() });
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Ids of every stored game.
    pub async fn game_ids(&self) -> Result<Vec<GameId>, CommandError> {
        Ok(self.repository.game_ids().await?)
    }

    /// Summary of a game.
    pub async fn game(&self, game_id: GameId) -> Result<GameSummary, CommandError> {
        let loaded = self.repository.load(game_id).await?;
        Ok(GameSummary::of(&loaded.game, loaded.version))
    }

    /// Every character with its available actions.
    pub async fn characters(&self, game_id: GameId) -> Result<Vec<CharacterView>, CommandError> {
        let game = self.repository.load(game_id).await?.game;
        Ok(game
            .world()
            .characters()
            .map(|c| CharacterView::of(game.world(), c))
            .collect())
    }

    /// One character with its available actions.
    pub async fn character(
        &self,
        game_id: GameId,
        character: CharacterId,
    ) -> Result<CharacterView, CommandError> {
        let game = self.repository.load(game_id).await?.game;
        game.world()
            .character(character)
            .map(|c| CharacterView::of(game.world(), c))
            .ok_or(CommandError::CharacterNotFound(character))
    }

    /// Locations revealed so far.
    pub async fn discovered_locations(&self, game_id: GameId) -> Result<Vec<Location>, CommandError> {
        let game = self.repository.load(game_id).await?.game;
        Ok(game.world().discovered_locations().cloned().collect())
    }

    /// Paths revealed so far.
    pub async fn discovered_paths(&self, game_id: GameId) -> Result<Vec<Path>, CommandError> {
        let game = self.repository.load(game_id).await?.game;
        Ok(game.world().discovered_paths().cloned().collect())
    }

    /// Obstacles revealed and not yet cleared.
    pub async fn discovered_obstacles(&self, game_id: GameId) -> Result<Vec<Obstacle>, CommandError> {
        let game = self.repository.load(game_id).await?.game;
        Ok(game.world().discovered_obstacles().cloned().collect())
    }

    /// Connected players with their delegated actions.
    pub async fn players(&self, game_id: GameId) -> Result<Vec<Player>, CommandError> {
        let game = self.repository.load(game_id).await?.game;
        Ok(game.players().cloned().collect())
    }

    /// State hash of a freshly folded game.
    pub async fn game_hash(&self, game_id: GameId) -> Result<StateHash, CommandError> {
        Ok(self.repository.load(game_id).await?.game.compute_hash())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::LocationId;
    use crate::game::actions::{action_sets, MAX_PLAYERS};
    use crate::game::events::ResourceKind;
    use crate::store::event_store::{EventRecord, FileEventStore, InMemoryEventStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    const MAGE: CharacterId = CharacterId(0);
    const WARRIOR: CharacterId = CharacterId(1);

    fn service() -> GameService<InMemoryEventStore> {
        GameService::new(InMemoryEventStore::new(), EngineConfig::default())
    }

    async fn create(service: &GameService<impl EventStore>) -> GameId {
        let definition = WorldDefinition::grid15().unwrap();
        service.create_game(definition).await.unwrap().value.id
    }

    #[tokio::test]
    async fn test_create_game() {
        let service = service();
        let mut updates = service.subscribe();

        let outcome = service.create_game(WorldDefinition::grid15().unwrap()).await.unwrap();
        let game_id = outcome.value.id;

        assert_eq!(outcome.version, 4);
        assert_eq!(outcome.value.world, "grid15");
        assert_eq!(outcome.value.characters, 2);
        assert!(outcome.changes.contains(ResourceKind::Locations));

        let update = updates.recv().await.unwrap();
        assert_eq!(update.game_id, game_id);
        assert_eq!(update.version, 4);

        assert_eq!(service.discovered_locations(game_id).await.unwrap().len(), 11);
        assert_eq!(service.game_ids().await.unwrap(), vec![game_id]);
    }

    #[tokio::test]
    async fn test_create_game_rejects_invalid_world() {
        let service = service();
        let mut definition = WorldDefinition::grid15().unwrap();
        definition.characters[0].location = LocationId(77);

        assert!(matches!(
            service.create_game(definition).await,
            Err(CommandError::InvalidWorld(_))
        ));
        assert!(service.game_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_characters_with_actions() {
        let service = service();
        let game_id = create(&service).await;

        let mage = service.character(game_id, MAGE).await.unwrap();
        assert_eq!(mage.location, LocationId(11));
        assert_eq!(mage.actions.portals.len(), 1);
        assert_eq!(mage.actions.portals[0].destination, LocationId(14));

        let north: Vec<_> = mage
            .actions
            .movements
            .iter()
            .filter(|m| m.direction == Direction::North)
            .map(|m| m.destination)
            .collect();
        assert_eq!(north, vec![LocationId(7), LocationId(3)]);

        assert_eq!(service.characters(game_id).await.unwrap().len(), 2);
        assert!(matches!(
            service.character(game_id, CharacterId(9)).await,
            Err(CommandError::CharacterNotFound(CharacterId(9)))
        ));
    }

    #[tokio::test]
    async fn test_move_and_phantom_move() {
        let service = service();
        let game_id = create(&service).await;

        let outcome = service.move_character(game_id, MAGE, Direction::North, 2).await.unwrap();
        assert_eq!(outcome.value.location, LocationId(3));
        assert_eq!(outcome.version, 5);
        assert!(outcome.changes.contains(ResourceKind::Characters));

        // Legal against the previous snapshot, not against this one
        assert!(matches!(
            service.move_character(game_id, MAGE, Direction::North, 2).await,
            Err(CommandError::NotAnAvailableAction)
        ));
        assert_eq!(service.game(game_id).await.unwrap().version, 5);
    }

    #[tokio::test]
    async fn test_portal_reveals_far_side() {
        let service = service();
        let game_id = create(&service).await;

        let outcome = service.use_portal(game_id, MAGE, PathId(23)).await.unwrap();

        assert_eq!(outcome.value.location, LocationId(14));
        assert!(outcome.changes.contains(ResourceKind::Locations));
        assert_eq!(service.discovered_locations(game_id).await.unwrap().len(), 14);

        // The way back is open
        assert_eq!(outcome.value.actions.portals[0].path, PathId(29));
    }

    #[tokio::test]
    async fn test_clear_force_field() {
        let service = service();
        let game_id = create(&service).await;

        // Warrior steps aside, mage walks 11 -> 3 -> 1 -> 9 -> 8 -> 4
        service.move_character(game_id, WARRIOR, Direction::East, 1).await.unwrap();
        for (direction, steps) in [
            (Direction::North, 2),
            (Direction::West, 2),
            (Direction::South, 2),
            (Direction::West, 1),
            (Direction::North, 1),
        ] {
            service.move_character(game_id, MAGE, direction, steps).await.unwrap();
        }
        let mage = service.character(game_id, MAGE).await.unwrap();
        assert_eq!(mage.location, LocationId(4));

        // The warrior cannot clear a force field
        assert!(matches!(
            service.clear_obstacle(game_id, WARRIOR, ObstacleId(0)).await,
            Err(CommandError::NotAnAvailableAction)
        ));

        let outcome = service.clear_obstacle(game_id, MAGE, ObstacleId(0)).await.unwrap();
        assert!(outcome.changes.contains(ResourceKind::Locations));
        assert!(outcome.changes.contains(ResourceKind::Paths));
        assert!(outcome.changes.contains(ResourceKind::Obstacles));

        let locations = service.discovered_locations(game_id).await.unwrap();
        assert!(locations.iter().any(|l| l.id == LocationId(0)));
        assert!(service.discovered_obstacles(game_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_join_and_leave() {
        let service = GameService::new(
            InMemoryEventStore::new(),
            EngineConfig { max_players: 3, ..EngineConfig::default() },
        );
        let game_id = create(&service).await;

        let mut ids = Vec::new();
        for name in ["ada", "grace", "linus"] {
            let outcome = service.join_game(game_id, name).await.unwrap();
            assert!(outcome.changes.contains(ResourceKind::Players));
            ids.push(outcome.value.id);
        }
        assert_eq!(ids, vec![PlayerId(0), PlayerId(1), PlayerId(2)]);

        assert!(matches!(
            service.join_game(game_id, "late").await,
            Err(CommandError::RoomFull { max: 3 })
        ));

        let departed = service.leave_game(game_id, PlayerId(1)).await.unwrap();
        assert_eq!(departed.value.name, "grace");

        let players = service.players(game_id).await.unwrap();
        assert_eq!(players.len(), 2);
        let mut sets: Vec<_> = players.iter().map(|p| p.actions.clone()).collect();
        let mut expected = action_sets(2);
        sets.sort();
        expected.sort();
        assert_eq!(sets, expected);

        assert!(matches!(
            service.leave_game(game_id, PlayerId(1)).await,
            Err(CommandError::PlayerNotFound(PlayerId(1)))
        ));
        assert_eq!(service.join_game(game_id, "ken").await.unwrap().value.id, PlayerId(1));
    }

    #[tokio::test]
    async fn test_default_room_cap_is_table_size() {
        let service = service();
        let game_id = create(&service).await;

        for i in 0..MAX_PLAYERS {
            service.join_game(game_id, &format!("p{i}")).await.unwrap();
        }
        assert!(matches!(
            service.join_game(game_id, "late").await,
            Err(CommandError::RoomFull { max: MAX_PLAYERS })
        ));
    }

    #[tokio::test]
    async fn test_unknown_game() {
        let service = service();
        let missing = GameId::new_random();

        assert!(matches!(service.game(missing).await, Err(CommandError::GameNotFound(id)) if id == missing));
        assert!(matches!(
            service.move_character(missing, MAGE, Direction::North, 1).await,
            Err(CommandError::GameNotFound(_))
        ));
    }

    // =========================================================================
    // Concurrency
    // =========================================================================

    /// Lets another writer append right before the first guarded append.
    struct RacingStore {
        inner: InMemoryEventStore,
        armed: AtomicBool,
    }

    #[async_trait]
    impl EventStore for RacingStore {
        async fn read_stream(&self, game_id: GameId) -> crate::store::event_store::Result<Vec<EventRecord>> {
            self.inner.read_stream(game_id).await
        }

        async fn append(
            &self,
            game_id: GameId,
            expected: ExpectedVersion,
            events: &[GameEvent],
        ) -> crate::store::event_store::Result<AppendOutcome> {
            if let ExpectedVersion::Exact(_) = expected {
                if self.armed.swap(false, Ordering::SeqCst) {
                    let interloper = GameEvent::PlayerJoined { name: "interloper".to_string() };
                    self.inner.append(game_id, expected, &[interloper]).await?;
                }
            }
            self.inner.append(game_id, expected, events).await
        }

        async fn stream_ids(&self) -> crate::store::event_store::Result<Vec<GameId>> {
            self.inner.stream_ids().await
        }
    }

    #[tokio::test]
    async fn test_racing_writers_conflict() {
        let service = GameService::new(
            RacingStore { inner: InMemoryEventStore::new(), armed: AtomicBool::new(false) },
            EngineConfig::default(),
        );
        let game_id = create(&service).await;
        service.repository().store().armed.store(true, Ordering::SeqCst);

        let err = service.move_character(game_id, MAGE, Direction::North, 1).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, CommandError::VersionConflict { expected: 4, actual: 5 }));

        // Nothing was overwritten: the interloper's event is the only one added
        let summary = service.game(game_id).await.unwrap();
        assert_eq!(summary.version, 5);
        assert_eq!(summary.players, 1);
        assert_eq!(service.character(game_id, MAGE).await.unwrap().location, LocationId(11));

        // Caller-owned retry re-reads and succeeds
        let retried = service.move_character(game_id, MAGE, Direction::North, 1).await.unwrap();
        assert_eq!(retried.version, 6);
        assert_eq!(retried.value.location, LocationId(7));
    }

    #[tokio::test]
    async fn test_file_store_replays_to_same_hash() {
        let dir = tempfile::tempdir().unwrap();

        let (game_id, hash) = {
            let service = GameService::new(FileEventStore::open(dir.path()).await.unwrap(), EngineConfig::default());
            let game_id = create(&service).await;
            service.join_game(game_id, "ada").await.unwrap();
            service.use_portal(game_id, MAGE, PathId(23)).await.unwrap();
            (game_id, service.game_hash(game_id).await.unwrap())
        };

        let reopened = GameService::new(FileEventStore::open(dir.path()).await.unwrap(), EngineConfig::default());
        assert_eq!(reopened.game_hash(game_id).await.unwrap(), hash);
        assert_eq!(reopened.character(game_id, MAGE).await.unwrap().location, LocationId(14));
    }
}
