use std::time::Instant;

use glam::{Mat4, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use tracing::{debug, info, instrument, warn};

use crate::api::PhysicsWorldApi;
use crate::broadphase::SpatialHash;
use crate::cache::{ColliderCache, WorldCollider};
use crate::error::{PhysicsError, Result};
use crate::events::ContactTracker;
use crate::geometry::{Aabb, EPSILON};
use crate::integrator;
use crate::narrowphase;
use crate::raycast::ray_shape;
use crate::schedule::Schedule;
use crate::solver::{solve_contact, SolverBody};
use crate::time::TimeSource;
use crate::types::*;

/// Owns every piece of per-scene simulation state.
pub struct PhysicsWorld {
    cfg: WorldConfig,
    /// Clock read once per `advance`.
    pub time: TimeSource,
    tick: u64,

    nodes: SlotMap<Entity, Node>,
    // Entities whose transform, collider or body changed since the last refresh.
    dirty: FxHashSet<Entity>,

    cache: ColliderCache,
    grid: SpatialHash,
    tracker: ContactTracker,

    // Tick-local buffers
    contacts: Vec<Contact>,
    events: Vec<CollisionEvent>,

    schedule: Schedule<PhysicsWorld>,
    stats: WorldStats,
    last_timing: Option<WorldTiming>,
}

struct Node {
    transform: Transform,
    collider: Option<Collider>,
    rigidbody: Option<Rigidbody>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::build(WorldConfig::default())
    }
}

impl PhysicsWorld {
    /// Builds a world after validating `cfg`.
    pub fn new(cfg: WorldConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self::build(cfg))
    }

    fn build(cfg: WorldConfig) -> Self {
        Self {
            grid: SpatialHash::new(cfg.cell_size, cfg.max_cells_per_collider),
            cfg,
            time: TimeSource::default(),
            tick: 0,
            nodes: SlotMap::with_key(),
            dirty: FxHashSet::default(),
            cache: ColliderCache::new(),
            tracker: ContactTracker::new(),
            contacts: Vec::new(),
            events: Vec::new(),
            schedule: Self::default_schedule(),
            stats: WorldStats::default(),
            last_timing: None,
        }
    }

    /// The per-tick pipeline, in order.
    pub fn default_schedule() -> Schedule<PhysicsWorld> {
        Schedule::new()
            .with_stage("integrate", Self::stage_integrate)
            .with_stage("cache", Self::stage_cache)
            .with_stage("broadphase", Self::stage_broadphase)
            .with_stage("narrowphase", Self::stage_narrowphase)
            .with_stage("events", Self::stage_events)
            .with_stage("solve", Self::stage_solve)
    }

    pub fn config(&self) -> &WorldConfig {
        &self.cfg
    }

    pub fn schedule_mut(&mut self) -> &mut Schedule<PhysicsWorld> {
        &mut self.schedule
    }

    /// Ticks run since construction or the last `reset`.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Contacts found by the last tick, triggers included.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Mutable access to a transform; the entity is re-cached next tick.
    pub fn transform_mut(&mut self, entity: Entity) -> Option<&mut Transform> {
        let node = self.nodes.get_mut(entity)?;
        self.dirty.insert(entity);
        Some(&mut node.transform)
    }

    /// Mutable access to a rigidbody; the entity is re-cached next tick.
    pub fn rigidbody_mut(&mut self, entity: Entity) -> Option<&mut Rigidbody> {
        let node = self.nodes.get_mut(entity)?;
        self.dirty.insert(entity);
        node.rigidbody.as_mut()
    }

    /// Cached world-space collider as of the last refresh.
    pub fn world_collider(&self, entity: Entity) -> Option<&WorldCollider> {
        self.cache.get(entity)
    }

    /// Rebuilds the collider cache and the grid without advancing time, so
    /// queries see component writes made since the last tick.
    pub fn refresh(&mut self) {
        Self::stage_cache(self, 0.0);
        Self::stage_broadphase(self, 0.0);
    }

    /// Debug/perf stats for the last tick.
    pub fn debug_stats(&self) -> WorldStats {
        WorldStats {
            entities: self.nodes.len(),
            colliders: self.cache.len(),
            cells: self.grid.cell_count(),
            touching_pairs: self.tracker.touching(),
            stages: self.schedule.stage_count(),
            ..self.stats
        }
    }

    /// Per-stage timing for the last tick; `None` unless `enable_timing` is set.
    pub fn timing(&self) -> Option<WorldTiming> {
        self.last_timing
    }

    fn ensure_alive(&self, entity: Entity) -> Result<()> {
        if self.nodes.contains_key(entity) { Ok(()) } else { Err(PhysicsError::NoSuchEntity(entity)) }
    }

    fn check_parent(&self, child: Entity, parent: Entity) -> Result<()> {
        if child == parent {
            return Err(PhysicsError::InvalidParent { child, parent, reason: "an entity cannot parent itself" });
        }
        if !self.nodes.contains_key(parent) {
            return Err(PhysicsError::InvalidParent { child, parent, reason: "parent is not alive" });
        }
        // Walk up from the new parent; meeting the child means a cycle.
        let mut cur = parent;
        for _ in 0..self.nodes.len() {
            match self.nodes.get(cur).and_then(|n| n.transform.parent) {
                Some(p) if p == child => {
                    return Err(PhysicsError::InvalidParent { child, parent, reason: "would create a cycle" });
                }
                Some(p) => cur = p,
                None => break,
            }
        }
        Ok(())
    }

    /// True when `entity` or any live ancestor changed since the last refresh.
    fn inherits_dirty(&self, entity: Entity) -> bool {
        let mut cur = entity;
        for _ in 0..=self.nodes.len() {
            if self.dirty.contains(&cur) {
                return true;
            }
            match self.nodes.get(cur).and_then(|n| n.transform.parent) {
                Some(p) if self.nodes.contains_key(p) => cur = p,
                _ => return false,
            }
        }
        false
    }

    /// World matrix of `entity`, recomputing stale ancestors on the way.
    fn resolve_world(&self, entity: Entity, stale: &FxHashSet<Entity>, memo: &mut FxHashMap<Entity, Mat4>) -> Mat4 {
        if let Some(m) = memo.get(&entity) {
            return *m;
        }
        let mut chain = vec![entity];
        let mut base = Mat4::IDENTITY;
        let mut cur = entity;
        loop {
            let Some(p) = self.nodes.get(cur).and_then(|n| n.transform.parent) else { break };
            let Some(parent) = self.nodes.get(p) else { break };
            if let Some(m) = memo.get(&p) {
                base = *m;
                break;
            }
            if !stale.contains(&p) {
                base = parent.transform.world;
                break;
            }
            if chain.contains(&p) {
                warn!(?entity, "parent cycle; treating chain as root");
                break;
            }
            chain.push(p);
            cur = p;
        }
        for &e in chain.iter().rev() {
            if let Some(node) = self.nodes.get(e) {
                base *= node.transform.local_matrix();
            }
            memo.insert(e, base);
        }
        base
    }

    // --- Stages ------------------------------------------------------------

    fn stage_integrate(world: &mut Self, dt: f32) {
        if dt <= 0.0 {
            // Grounding is per tick even when no time passes.
            for body in world.nodes.values_mut().filter_map(|n| n.rigidbody.as_mut()) {
                if body.body_type == BodyType::Dynamic {
                    body.is_grounded = false;
                }
            }
            return;
        }
        let gravity = world.cfg.gravity;
        let floor = world.cfg.kill_floor_y;
        let respawn_point = world.cfg.respawn_point;
        for (e, node) in world.nodes.iter_mut() {
            let Some(body) = node.rigidbody.as_mut() else { continue };
            if body.body_type != BodyType::Dynamic {
                continue;
            }
            integrator::integrate(&mut node.transform.position, body, gravity, dt);
            if integrator::below_kill_floor(node.transform.position, body, floor) {
                warn!(entity = ?e, y = node.transform.position.y, "fell below kill floor; respawning");
                integrator::respawn(&mut node.transform.position, body, respawn_point);
            }
            world.dirty.insert(e);
        }
    }

    fn stage_cache(world: &mut Self, dt: f32) {
        world.stats.cache_rebuilds = 0;
        if world.dirty.is_empty() {
            return;
        }
        let stale: FxHashSet<Entity> = world.nodes.keys().filter(|&e| world.inherits_dirty(e)).collect();
        let mut memo = FxHashMap::default();
        let resolved: Vec<(Entity, Mat4)> =
            stale.iter().map(|&e| (e, world.resolve_world(e, &stale, &mut memo))).collect();

        let sweep = world.cfg.sweep_dynamic_aabbs;
        for (e, m) in resolved {
            let Some(node) = world.nodes.get_mut(e) else { continue };
            node.transform.world = m;
            let Some(collider) = node.collider else {
                world.cache.remove(e);
                continue;
            };
            let body_type = node.rigidbody.map_or(BodyType::Static, |rb| rb.body_type);
            let motion = node
                .rigidbody
                .filter(|rb| sweep && rb.body_type == BodyType::Dynamic)
                .map(|rb| -rb.velocity * dt);
            world.cache.insert(e, WorldCollider::build(&m, &collider, body_type, motion));
            world.stats.cache_rebuilds += 1;
        }
        world.dirty.clear();
    }

    fn stage_broadphase(world: &mut Self, _dt: f32) {
        world.grid.clear();
        for (e, wc) in world.cache.iter() {
            world.grid.register(e, &wc.aabb);
        }
    }

    fn stage_narrowphase(world: &mut Self, _dt: f32) {
        world.contacts.clear();
        world.stats.candidate_pairs = 0;
        world.stats.narrow_tests = 0;
        for (a, wa) in world.cache.iter() {
            for b in world.grid.query(&wa.aabb) {
                // Each unordered pair is visited once, from its smaller entity.
                if b <= a {
                    continue;
                }
                let Some(wb) = world.cache.get(b) else { continue };
                world.stats.candidate_pairs += 1;
                if !wa.mask.mutual(wb.mask) {
                    continue;
                }
                if wa.body_type == BodyType::Static && wb.body_type == BodyType::Static {
                    continue;
                }
                if !wa.aabb.overlaps(&wb.aabb) {
                    continue;
                }
                world.stats.narrow_tests += 1;
                if let Some(hit) = narrowphase::collide(&wa.shape, &wb.shape) {
                    world.contacts.push(Contact {
                        a,
                        b,
                        normal: hit.normal,
                        depth: hit.depth,
                        is_trigger: wa.is_trigger || wb.is_trigger,
                    });
                }
            }
        }
        world.stats.contacts = world.contacts.len();
        world.stats.solid_contacts = world.contacts.iter().filter(|c| !c.is_trigger).count();
    }

    fn stage_events(world: &mut Self, _dt: f32) {
        world.events = world.tracker.update(&world.contacts);
        world.stats.events = world.events.len();
    }

    fn stage_solve(world: &mut Self, _dt: f32) {
        for c in world.contacts.iter().filter(|c| !c.is_trigger) {
            let Some([na, nb]) = world.nodes.get_disjoint_mut([c.a, c.b]) else { continue };
            let mut a = SolverBody { position: &mut na.transform.position, body: na.rigidbody.as_mut() };
            let mut b = SolverBody { position: &mut nb.transform.position, body: nb.rigidbody.as_mut() };
            if solve_contact(c, &mut a, &mut b) {
                world.dirty.insert(c.a);
                world.dirty.insert(c.b);
            }
        }
    }
}

impl PhysicsWorldApi for PhysicsWorld {
    fn spawn(&mut self, mut transform: Transform) -> Entity {
        if let Some(p) = transform.parent.filter(|&p| !self.nodes.contains_key(p)) {
            warn!(parent = ?p, "spawn with dead parent; detaching");
            transform.parent = None;
        }
        let entity = self.nodes.insert(Node { transform, collider: None, rigidbody: None });
        self.dirty.insert(entity);
        entity
    }

    fn despawn(&mut self, entity: Entity) -> bool {
        if self.nodes.remove(entity).is_none() {
            return false;
        }
        self.cache.remove(entity);
        self.dirty.remove(&entity);
        // Orphans keep their local transform as their new world transform.
        let orphans: Vec<Entity> =
            self.nodes.iter().filter(|(_, n)| n.transform.parent == Some(entity)).map(|(e, _)| e).collect();
        for child in orphans {
            if let Some(node) = self.nodes.get_mut(child) {
                node.transform.parent = None;
            }
            self.dirty.insert(child);
        }
        debug!(?entity, "despawned");
        true
    }

    fn contains(&self, entity: Entity) -> bool {
        self.nodes.contains_key(entity)
    }

    fn set_transform(&mut self, entity: Entity, transform: Transform) -> Result<()> {
        self.ensure_alive(entity)?;
        if let Some(parent) = transform.parent {
            self.check_parent(entity, parent)?;
        }
        if let Some(node) = self.nodes.get_mut(entity) {
            let world = node.transform.world;
            node.transform = Transform { world, ..transform };
        }
        self.dirty.insert(entity);
        Ok(())
    }

    fn set_collider(&mut self, entity: Entity, collider: Collider) -> Result<()> {
        let node = self.nodes.get_mut(entity).ok_or(PhysicsError::NoSuchEntity(entity))?;
        node.collider = Some(collider);
        self.dirty.insert(entity);
        Ok(())
    }

    fn remove_collider(&mut self, entity: Entity) -> Option<Collider> {
        let removed = self.nodes.get_mut(entity)?.collider.take();
        self.cache.remove(entity);
        self.dirty.insert(entity);
        removed
    }

    fn set_rigidbody(&mut self, entity: Entity, body: Rigidbody) -> Result<()> {
        let node = self.nodes.get_mut(entity).ok_or(PhysicsError::NoSuchEntity(entity))?;
        node.rigidbody = Some(body);
        self.dirty.insert(entity);
        Ok(())
    }

    fn remove_rigidbody(&mut self, entity: Entity) -> Option<Rigidbody> {
        let removed = self.nodes.get_mut(entity)?.rigidbody.take();
        self.dirty.insert(entity);
        removed
    }

    fn transform(&self, entity: Entity) -> Option<&Transform> {
        self.nodes.get(entity).map(|n| &n.transform)
    }

    fn collider(&self, entity: Entity) -> Option<&Collider> {
        self.nodes.get(entity)?.collider.as_ref()
    }

    fn rigidbody(&self, entity: Entity) -> Option<&Rigidbody> {
        self.nodes.get(entity)?.rigidbody.as_ref()
    }

    #[instrument(level = "debug", skip(self), fields(tick = self.tick + 1))]
    fn step(&mut self, dt: f32) {
        let dt = if !dt.is_finite() || dt < 0.0 {
            warn!(dt, "invalid step length; running a zero-length tick");
            0.0
        } else if dt > self.cfg.max_dt {
            warn!(dt, max_dt = self.cfg.max_dt, "clamping step length");
            self.cfg.max_dt
        } else {
            dt
        };

        let timed = self.cfg.enable_timing;
        let t_all = if timed { Some(Instant::now()) } else { None };
        self.tick += 1;

        let schedule = std::mem::take(&mut self.schedule);
        let times = schedule.run(self, dt, timed);
        self.schedule = schedule;

        if let Some(t_all) = t_all {
            let mut timing = WorldTiming::default();
            for (name, ms) in times {
                match name {
                    "integrate" => timing.integrate_ms += ms,
                    "cache" => timing.cache_ms += ms,
                    "broadphase" => timing.broadphase_ms += ms,
                    "narrowphase" => timing.narrowphase_ms += ms,
                    "events" => timing.events_ms += ms,
                    "solve" => timing.solve_ms += ms,
                    _ => {}
                }
            }
            timing.total_ms = t_all.elapsed().as_secs_f64() * 1000.0;
            self.last_timing = Some(timing);
        }

        debug!(
            contacts = self.stats.contacts,
            solid = self.stats.solid_contacts,
            events = self.stats.events,
            rebuilt = self.stats.cache_rebuilds,
            "tick complete"
        );
    }

    fn advance(&mut self, real_elapsed: f32) -> f32 {
        let dt = self.time.frame_dt(real_elapsed);
        if dt > 0.0 {
            self.step(dt);
        }
        dt
    }

    fn events(&self) -> &[CollisionEvent] {
        &self.events
    }

    fn drain_events(&mut self) -> Vec<CollisionEvent> {
        std::mem::take(&mut self.events)
    }

    fn reset(&mut self) {
        self.tracker.clear();
        self.contacts.clear();
        self.events.clear();
        self.cache.clear();
        self.grid.clear();
        self.dirty = self.nodes.keys().collect();
        self.tick = 0;
        self.stats = WorldStats::default();
        self.last_timing = None;
        info!(entities = self.nodes.len(), "physics world reset");
    }

    fn raycast(&self, origin: Vec3, direction: Vec3) -> Option<RayHit> {
        self.raycast_filtered(origin, direction, &RayFilter::default())
    }

    fn raycast_filtered(&self, origin: Vec3, direction: Vec3, filter: &RayFilter) -> Option<RayHit> {
        if !origin.is_finite() || !direction.is_finite() || direction.length_squared() < EPSILON * EPSILON {
            return None;
        }
        let dir = direction.normalize();
        let mut best: Option<(Entity, f32)> = None;
        for (e, wc) in self.cache.iter() {
            if !filter.mask.mutual(wc.mask) || (wc.is_trigger && !filter.include_triggers) {
                continue;
            }
            let Some(t) = ray_shape(origin, dir, &wc.shape) else { continue };
            if t > filter.max_distance {
                continue;
            }
            if best.is_none_or(|(_, bt)| t < bt) {
                best = Some((e, t));
            }
        }
        best.map(|(entity, distance)| RayHit { entity, distance, point: origin + dir * distance })
    }

    fn query_aabb(&self, min: Vec3, max: Vec3) -> Vec<Entity> {
        let q = Aabb::new(min, max);
        self.grid
            .query(&q)
            .into_iter()
            .filter(|&e| self.cache.get(e).is_some_and(|wc| wc.aabb.overlaps(&q)))
            .collect()
    }

    /// Applies the tick's layer and bounds filters, but still tests static pairs.
    fn overlap_pair(&self, a: Entity, b: Entity) -> Option<Overlap> {
        if a == b {
            return None;
        }
        let wa = self.cache.get(a)?;
        let wb = self.cache.get(b)?;
        if !wa.mask.mutual(wb.mask) || !wa.aabb.overlaps(&wb.aabb) {
            return None;
        }
        narrowphase::collide(&wa.shape, &wb.shape)
    }
}
