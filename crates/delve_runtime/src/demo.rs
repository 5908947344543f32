//! Headless simulation: monsters wander a bounded grid and pick up the
//! items they step on; a dying monster drops what it carried.
//!
//! Exercises the whole core: positions are an [`ArrayIndex`]-backed table
//! kept in sync by a watcher, placed in a [`QuadIndex`], and carrying is a
//! relation cleaned up by cascades.

use crate::settings::Settings;
use anyhow::{ensure, Result};
use delve_core::ecs::{
    ArrayIndex, ComponentType, Entity, EntityId, Relation, RelationType, Scope, TypeClause, Watcher,
};
use delve_core::math::{DeterministicRng, IVec2};
use delve_core::spatial::{QuadIndex, Rect};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info};

pub const MONSTER: ComponentType = ComponentType::bit(0);
pub const ITEM: ComponentType = ComponentType::bit(1);
pub const POSITION: ComponentType = ComponentType::bit(2);

pub const CARRIES: RelationType = RelationType::bit(0);

/// Position table for every entity with the POSITION bit.
#[derive(Debug, Default)]
pub struct Positions {
    index: ArrayIndex,
    /// `None` until the row is placed.
    points: Vec<Option<IVec2>>,
    quad: QuadIndex,
}

impl Positions {
    pub fn get(&self, ent: Entity) -> Option<IVec2> {
        self.index.get(ent).and_then(|slot| self.points[slot])
    }

    /// Move `ent`; false when it has no position row.
    pub fn place(&mut self, ent: Entity, point: IVec2) -> bool {
        let Some(slot) = self.index.get(ent) else {
            return false;
        };
        self.points[slot] = Some(point);
        self.quad.update(slot, point);
        true
    }

    pub fn at(&mut self, point: IVec2) -> Vec<EntityId> {
        let Self { index, quad, .. } = self;
        quad.at(point).filter_map(|slot| index.id_at(slot)).collect()
    }

    pub fn within(&mut self, rect: Rect) -> Vec<EntityId> {
        let Self { index, quad, .. } = self;
        quad.within(rect).filter_map(|slot| index.id_at(slot)).collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }
}

impl Watcher for Positions {
    fn create(&mut self, ent: Entity, _added: ComponentType) {
        let slot = self.index.create(ent);
        if slot == self.points.len() {
            self.points.push(None);
        } else {
            // reused row: forget the previous occupant's point
            self.points[slot] = None;
        }
    }

    fn destroy(&mut self, ent: Entity, _removed: ComponentType) {
        if let Some(slot) = self.index.destroy(ent) {
            if let Some(point) = self.points[slot].take() {
                self.quad.delete(slot, point);
            }
        }
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub turns: u32,
    pub pickups: usize,
    pub drops: usize,
    pub deaths: usize,
    pub monsters: usize,
    pub items_on_floor: usize,
    pub items_carried: usize,
    /// Entities currently holding a position row.
    pub positioned: usize,
}

pub struct Demo {
    scope: Scope,
    positions: Rc<RefCell<Positions>>,
    carries: Rc<RefCell<Relation>>,
    rng: DeterministicRng,
    bounds: Rect,
    death_chance: f32,
    stats: Summary,
}

impl Demo {
    pub fn new(settings: &Settings) -> Result<Self> {
        let world = &settings.world;
        ensure!(
            world.width > 0 && world.height > 0,
            "world size must be positive, got {}x{}",
            world.width,
            world.height
        );
        ensure!(
            (0.0..=1.0).contains(&settings.sim.death_chance),
            "death_chance must be within 0..=1, got {}",
            settings.sim.death_chance
        );

        let mut scope = Scope::new();
        let positions = Rc::new(RefCell::new(Positions::default()));
        scope.watch(POSITION, ComponentType::NONE, positions.clone());

        let carries = Rc::new(RefCell::new(Relation::new(&scope, &scope, settings.carries)));
        Relation::cascade_a(&carries, &mut scope, MONSTER);
        Relation::cascade_b(&carries, &mut scope, ITEM);

        let mut demo = Self {
            scope,
            positions,
            carries,
            rng: DeterministicRng::new(settings.sim.seed),
            bounds: Rect::new(0, 0, world.width, world.height),
            death_chance: settings.sim.death_chance,
            stats: Summary::default(),
        };
        for _ in 0..settings.sim.monsters {
            demo.spawn(MONSTER);
        }
        for _ in 0..settings.sim.items {
            demo.spawn(ITEM);
        }
        info!(
            monsters = settings.sim.monsters,
            items = settings.sim.items,
            width = world.width,
            height = world.height,
            "world populated"
        );
        Ok(demo)
    }

    fn spawn(&mut self, kind: ComponentType) -> Entity {
        let ent = self.scope.create(kind | POSITION);
        let point = self.rng.point_in(self.bounds.min, self.bounds.max);
        self.positions.borrow_mut().place(ent, point);
        ent
    }

    /// Advance every living monster by one step.
    pub fn turn(&mut self) {
        let monsters: Vec<Entity> = self.scope.iter(TypeClause::all(MONSTER | POSITION)).collect();
        for monster in monsters {
            if self.rng.next_f32() < self.death_chance {
                self.kill(monster);
                continue;
            }
            let point = self.step(monster);
            self.pick_up(monster, point);
        }
        self.stats.turns += 1;
    }

    fn step(&mut self, monster: Entity) -> IVec2 {
        let mut positions = self.positions.borrow_mut();
        let from = positions.get(monster).unwrap_or(self.bounds.min);
        let dir = IVec2::new(self.rng.range_i32(-1, 2), self.rng.range_i32(-1, 2));
        let to = (from + dir).clamp(self.bounds.min, self.bounds.max - IVec2::ONE);
        positions.place(monster, to);
        to
    }

    fn pick_up(&mut self, monster: Entity, point: IVec2) {
        let here = self.positions.borrow_mut().at(point);
        for id in here {
            let Some(item) = self.scope.entity(id) else {
                continue;
            };
            if !self.scope.has(item, ITEM | POSITION) {
                continue;
            }
            self.carries.borrow_mut().insert(CARRIES, monster, item);
            // position row goes away through the watcher
            self.scope.remove(item, POSITION);
            self.stats.pickups += 1;
            debug!(monster = %monster, item = %item, at = %point, "item picked up");
        }
    }

    fn kill(&mut self, monster: Entity) {
        let at = self.positions.borrow().get(monster).unwrap_or(self.bounds.min);
        let carried = self
            .carries
            .borrow_mut()
            .lookup_a(TypeClause::all(CARRIES.as_component()), &[monster.id()]);

        // cascade drops the carry rows
        self.scope.destroy(monster);
        for id in &carried {
            let Some(item) = self.scope.entity(*id) else {
                continue;
            };
            self.scope.add(item, POSITION);
            self.positions.borrow_mut().place(item, at);
            self.stats.drops += 1;
        }
        self.stats.deaths += 1;
        debug!(monster = %monster, at = %at, dropped = carried.len(), "monster died");
    }

    /// Monsters and floor items within `radius` of the world center.
    pub fn census(&mut self, radius: i32) -> (usize, usize) {
        let center = (self.bounds.min + self.bounds.max) / 2;
        let ids = self.positions.borrow_mut().within(Rect::around(center, radius));
        let mut monsters = 0;
        let mut items = 0;
        for ent in ids.into_iter().filter_map(|id| self.scope.entity(id)) {
            let ty = self.scope.entity_type(ent);
            if ty.contains(MONSTER) {
                monsters += 1;
            } else if ty.contains(ITEM) {
                items += 1;
            }
        }
        (monsters, items)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            monsters: self.scope.iter(TypeClause::all(MONSTER)).count(),
            items_on_floor: self.scope.iter(TypeClause::all(ITEM | POSITION)).count(),
            items_carried: self.carries.borrow().len(),
            positioned: self.positions.borrow().len(),
            ..self.stats.clone()
        }
    }
}

/// Run the configured number of turns and return the final counters.
pub fn run(settings: &Settings) -> Result<Summary> {
    let mut demo = Demo::new(settings)?;
    for turn in 1..=settings.sim.turns {
        demo.turn();
        if turn % 50 == 0 {
            let (monsters, items) = demo.census(8);
            info!(turn, monsters, items, "near the center");
        }
    }
    Ok(demo.summary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{SimSettings, WorldSettings};

    fn settings(width: i32, height: i32, monsters: usize, items: usize, death_chance: f32) -> Settings {
        Settings {
            world: WorldSettings { width, height },
            sim: SimSettings {
                seed: 7,
                monsters,
                items,
                turns: 0,
                death_chance,
            },
            ..Settings::default()
        }
    }

    #[test]
    fn test_single_cell_world_picks_up_everything() {
        let mut demo = Demo::new(&settings(1, 1, 2, 5, 0.0)).unwrap();
        demo.turn();
        let summary = demo.summary();
        assert_eq!(summary.pickups, 5);
        assert_eq!(summary.items_carried, 5);
        assert_eq!(summary.items_on_floor, 0);
        // only the monsters still have positions
        assert_eq!(summary.positioned, 2);
    }

    #[test]
    fn test_death_drops_carried_items() {
        let mut demo = Demo::new(&settings(1, 1, 1, 3, 0.0)).unwrap();
        demo.turn();
        let monster = demo.scope.iter(TypeClause::all(MONSTER)).next().unwrap();
        demo.kill(monster);

        let summary = demo.summary();
        assert_eq!(summary.deaths, 1);
        assert_eq!(summary.drops, 3);
        assert_eq!(summary.monsters, 0);
        assert_eq!(summary.items_carried, 0);
        assert_eq!(summary.items_on_floor, 3);
        assert_eq!(demo.positions.borrow_mut().at(IVec2::ZERO).len(), 3);
    }

    #[test]
    fn test_items_are_conserved() {
        let mut settings = settings(12, 8, 6, 40, 0.02);
        settings.sim.turns = 120;
        let summary = run(&settings).unwrap();
        assert_eq!(summary.turns, 120);
        assert_eq!(summary.items_on_floor + summary.items_carried, 40);
        assert_eq!(summary.monsters + summary.deaths, 6);
        assert_eq!(summary.pickups, summary.items_carried + summary.drops);
        assert_eq!(summary.positioned, summary.monsters + summary.items_on_floor);
    }

    #[test]
    fn test_positions_stay_in_bounds() {
        let mut demo = Demo::new(&settings(5, 3, 4, 4, 0.0)).unwrap();
        for _ in 0..30 {
            demo.turn();
        }
        let bounds = demo.bounds;
        let everyone = demo.positions.borrow_mut().within(Rect::new(-100, -100, 100, 100));
        assert_eq!(everyone.len(), demo.positions.borrow().len());
        let positions = demo.positions.borrow();
        for ent in everyone.into_iter().filter_map(|id| demo.scope.entity(id)) {
            assert!(bounds.contains(positions.get(ent).unwrap()));
        }
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut settings = settings(16, 16, 8, 30, 0.01);
        settings.sim.turns = 60;
        assert_eq!(run(&settings).unwrap(), run(&settings).unwrap());
    }

    #[test]
    fn test_reused_position_row_starts_unplaced() {
        let mut demo = Demo::new(&settings(4, 4, 0, 1, 0.0)).unwrap();
        let item = demo.scope.iter(TypeClause::all(ITEM)).next().unwrap();
        assert!(demo.positions.borrow().get(item).is_some());

        demo.scope.remove(item, POSITION);
        demo.scope.add(item, POSITION);
        assert_eq!(demo.positions.borrow().get(item), None);
        assert!(demo.positions.borrow_mut().within(Rect::new(0, 0, 4, 4)).is_empty());

        demo.positions.borrow_mut().place(item, IVec2::new(3, 1));
        assert_eq!(demo.positions.borrow().get(item), Some(IVec2::new(3, 1)));
    }

    #[test]
    fn test_rejects_empty_world() {
        assert!(Demo::new(&settings(0, 10, 1, 1, 0.0)).is_err());
        assert!(Demo::new(&settings(10, 10, 1, 1, 1.5)).is_err());
    }
}
