//! The tracker controller.
//!
//! [`Tracker`] owns the process-wide gearset collection and is the only
//! way to change it. Every mutation is a job on the [`UpdateQueue`]; reads
//! take a shared lock and clone out what they need. Create one with
//! [`Tracker::builder`] on service start and call [`Tracker::shutdown`] on
//! teardown.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::config::TrackerConfig;
use crate::db::Database;
use crate::error::{Result, TrackerError};
use crate::inventory::{InventorySource, ItemCatalog, MemoryInventory};
use crate::meld::{self, MateriaPool};
use crate::models::*;
use crate::queue::{Ticket, UpdateQueue};
use crate::resolver;
use crate::router::{InventoryRouter, Routing};
use crate::store::{GearsetStore, RecomputeScope};

pub struct TrackerBuilder {
    config: TrackerConfig,
    inventory: Option<Arc<dyn InventorySource>>,
    catalog: Option<Arc<dyn ItemCatalog>>,
    db: Option<Database>,
}

impl TrackerBuilder {
    pub fn inventory(mut self, inventory: Arc<dyn InventorySource>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn ItemCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Persist gearsets per player. Without a database state lives only
    /// as long as the process.
    pub fn database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    /// Start the update worker. Must be called within a Tokio runtime.
    pub fn start(self) -> Tracker {
        let mut tracked: Vec<ContainerKind> = Vec::new();
        for kind in &self.config.tracked_containers {
            if !tracked.contains(kind) {
                tracked.push(*kind);
            }
        }

        let shared = Shared {
            store: Arc::new(RwLock::new(GearsetStore::new(self.config.max_gearsets))),
            player: Arc::new(RwLock::new(None)),
            inventory: self
                .inventory
                .unwrap_or_else(|| Arc::new(MemoryInventory::new())),
            catalog: self.catalog,
            db: self.db,
            tracked: Arc::from(tracked),
            max_gearsets: self.config.max_gearsets,
        };

        Tracker {
            router: Arc::new(InventoryRouter::new(&self.config)),
            config: Arc::new(self.config),
            queue: Arc::new(UpdateQueue::start()),
            selected_plans: Arc::new(RwLock::new(HashMap::new())),
            shared,
        }
    }
}

/// State reachable from queued jobs.
#[derive(Clone)]
struct Shared {
    store: Arc<RwLock<GearsetStore>>,
    player: Arc<RwLock<Option<PlayerId>>>,
    inventory: Arc<dyn InventorySource>,
    catalog: Option<Arc<dyn ItemCatalog>>,
    db: Option<Database>,
    tracked: Arc<[ContainerKind]>,
    max_gearsets: usize,
}

impl Shared {
    /// Re-sample inventory now and resolve against it.
    fn resolve_now(&self, scope: RecomputeScope) -> anyhow::Result<bool> {
        let owned = self.inventory.snapshot(&self.tracked)?;
        Ok(self.store.write().resolve(&owned, scope))
    }

    fn recompute(&self, scope: RecomputeScope) -> anyhow::Result<()> {
        if self.resolve_now(scope)? {
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> anyhow::Result<()> {
        let (Some(db), Some(player)) = (&self.db, *self.player.read()) else {
            return Ok(());
        };
        let store = self.store.read();
        db.save_gearsets(player, store.gearsets())
    }

    fn login(&self, player: PlayerId) -> anyhow::Result<()> {
        let gearsets = match &self.db {
            Some(db) => {
                db.record_login(player)?;
                db.load_gearsets(player)?
            }
            None => Vec::new(),
        };
        tracing::info!("Player {} logged in with {} gearset(s)", player, gearsets.len());

        *self.store.write() = GearsetStore::with_gearsets(self.max_gearsets, gearsets);
        *self.player.write() = Some(player);
        self.resolve_now(RecomputeScope::All)?;
        self.persist()
    }

    fn logout(&self) -> anyhow::Result<()> {
        self.persist()?;
        if let Some(player) = self.player.write().take() {
            tracing::info!("Player {} logged out", player);
        }
        self.store.write().clear();
        Ok(())
    }
}

#[derive(Clone)]
pub struct Tracker {
    config: Arc<TrackerConfig>,
    router: Arc<InventoryRouter>,
    queue: Arc<UpdateQueue>,
    // Presentation state: which meld plan the UI shows per gearset.
    selected_plans: Arc<RwLock<HashMap<Uuid, usize>>>,
    shared: Shared,
}

impl Tracker {
    pub fn builder(config: TrackerConfig) -> TrackerBuilder {
        TrackerBuilder {
            config,
            inventory: None,
            catalog: None,
            db: None,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// The logged-in player, `None` when logged out.
    pub fn player(&self) -> Option<PlayerId> {
        *self.shared.player.read()
    }

    // ============================================================
    // Inbound events
    // ============================================================

    /// Switch to `player`'s gearsets and rescan everything.
    pub fn login(&self, player: PlayerId) -> Result<Ticket<()>> {
        let shared = self.shared.clone();
        self.queue
            .call("login", move || shared.login(player).map_err(TrackerError::from))
    }

    /// Persist and release the current player's gearsets.
    pub fn logout(&self) -> Result<Ticket<()>> {
        let shared = self.shared.clone();
        let selected = self.selected_plans.clone();
        self.queue.call("logout", move || {
            shared.logout()?;
            selected.write().clear();
            Ok(())
        })
    }

    /// Filter an inventory notification and enqueue a recompute if it can
    /// change anything. Never fails: problems are logged and the event is
    /// dropped.
    pub fn handle_event(&self, event: &InventoryEvent) -> Routing {
        let routing = {
            let store = self.shared.store.read();
            self.router.route(event, store.gearsets())
        };

        match routing {
            Routing::Recompute => {
                let shared = self.shared.clone();
                match self
                    .queue
                    .submit("recompute", move || shared.recompute(RecomputeScope::Active))
                {
                    Ok(()) => tracing::debug!(
                        item_id = event.item_id(),
                        "Inventory change queued a recompute"
                    ),
                    Err(e) => tracing::warn!(
                        item_id = event.item_id(),
                        "Dropped inventory event: {}",
                        e
                    ),
                }
            }
            skipped => tracing::trace!(
                item_id = event.item_id(),
                "Inventory event skipped: {:?}",
                skipped
            ),
        }
        routing
    }

    /// Recompute every gearset against current inventory.
    pub fn request_rescan(&self) -> Result<Ticket<()>> {
        let shared = self.shared.clone();
        self.queue.call("rescan", move || {
            shared
                .recompute(RecomputeScope::All)
                .map_err(TrackerError::from)
        })
    }

    // ============================================================
    // Gearset commands
    // ============================================================

    /// Validate and add a gearset, then resolve it against current
    /// inventory. A rejected definition, or a failure to sample inventory
    /// or persist, leaves the collection untouched.
    pub fn import_gearset(&self, definition: GearsetDefinition) -> Result<Ticket<Uuid>> {
        let shared = self.shared.clone();
        self.queue.call("import", move || {
            let id = shared
                .store
                .write()
                .import(definition, shared.catalog.as_deref())?;

            // Keep memory and storage in step: a failed import leaves no trace.
            if let Err(e) = shared
                .resolve_now(RecomputeScope::All)
                .and_then(|_| shared.persist())
            {
                shared.store.write().remove(id)?;
                tracing::warn!("Rolled back import of gearset {}: {:#}", id, e);
                return Err(e.into());
            }
            tracing::info!("Imported gearset {}", id);
            Ok(id)
        })
    }

    pub fn remove_gearset(&self, id: Uuid) -> Result<Ticket<()>> {
        let shared = self.shared.clone();
        let selected = self.selected_plans.clone();
        self.queue.call("remove", move || {
            shared.store.write().remove(id)?;
            selected.write().remove(&id);
            shared.persist()?;
            Ok(())
        })
    }

    /// Change activation without recomputing.
    pub fn set_active(&self, id: Uuid, is_active: bool) -> Result<Ticket<()>> {
        let shared = self.shared.clone();
        self.queue.call("set_active", move || {
            shared.store.write().set_active(id, is_active)?;
            shared.persist()?;
            Ok(())
        })
    }

    pub fn set_lock(&self, id: Uuid, slot: EquipSlot, input: SetLockInput) -> Result<Ticket<()>> {
        let shared = self.shared.clone();
        self.queue.call("set_lock", move || {
            shared.store.write().set_lock(id, slot, input)?;
            shared.persist()?;
            Ok(())
        })
    }

    // ============================================================
    // Queries
    // ============================================================

    /// All gearsets in creation order.
    pub fn gearsets(&self) -> Vec<Gearset> {
        self.shared.store.read().gearsets().to_vec()
    }

    pub fn gearset(&self, id: Uuid) -> Option<Gearset> {
        self.shared.store.read().get(id).cloned()
    }

    pub fn progress(&self, id: Uuid) -> Option<GearsetProgress> {
        self.shared.store.read().get(id).map(resolver::gearset_progress)
    }

    pub fn needed_items(&self) -> Vec<NeededItem> {
        resolver::needed_items(self.shared.store.read().gearsets())
    }

    /// Current meld plan alternatives for a gearset, from materia owned
    /// right now.
    pub fn meld_plans(&self, id: Uuid) -> Result<MeldPlanList> {
        let gearset = self.gearset(id).ok_or(TrackerError::GearsetNotFound(id))?;
        let pool = match &self.shared.catalog {
            Some(catalog) => {
                let owned = self.shared.inventory.snapshot(&self.shared.tracked)?;
                MateriaPool::from_owned(&owned, catalog.as_ref())
            }
            None => MateriaPool::default(),
        };

        let plans = meld::plans_for_gearset(&gearset, &pool, self.config.prefer_overmeld);
        let selected = self
            .selected_plans
            .read()
            .get(&id)
            .copied()
            .unwrap_or(0)
            .min(plans.len().saturating_sub(1));
        Ok(MeldPlanList { plans, selected })
    }

    /// Pick the shown meld plan. Out-of-range indices are clamped.
    pub fn select_meld_plan(&self, id: Uuid, index: usize) -> Result<usize> {
        let count = self.meld_plans(id)?.plans.len();
        let index = index.min(count.saturating_sub(1));
        self.selected_plans.write().insert(id, index);
        Ok(index)
    }

    /// Stop the update worker. Jobs not yet started are dropped; state has
    /// already been persisted by the jobs that ran.
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
        tracing::info!("Tracker stopped");
    }
}
