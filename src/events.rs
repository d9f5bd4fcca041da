//! Enter / Stay / Exit bookkeeping across ticks.

use std::collections::BTreeMap;

use glam::Vec3;

use crate::types::{CollisionEvent, Contact, Entity, EventState};

#[derive(Copy, Clone, Debug, PartialEq)]
struct Touch {
    normal: Vec3,
    is_trigger: bool,
}

/// Remembers which canonical pairs touched last tick.
#[derive(Default)]
pub struct ContactTracker {
    previous: BTreeMap<(Entity, Entity), Touch>,
}

impl ContactTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs touching as of the last `update`.
    pub fn touching(&self) -> usize {
        self.previous.len()
    }

    /// Diffs this tick's contacts against the previous tick.
    ///
    /// Emits exactly one event per pair: Enter/Stay in contact order, then
    /// Exit sorted by pair. Exit carries the last normal observed.
    pub fn update(&mut self, contacts: &[Contact]) -> Vec<CollisionEvent> {
        let mut current: BTreeMap<(Entity, Entity), Touch> = BTreeMap::new();
        let mut events = Vec::with_capacity(contacts.len());

        for c in contacts {
            let key = (c.a, c.b);
            let touch = Touch { normal: c.normal, is_trigger: c.is_trigger };
            if current.insert(key, touch).is_some() {
                continue;
            }
            let state = if self.previous.contains_key(&key) { EventState::Stay } else { EventState::Enter };
            events.push(CollisionEvent { a: c.a, b: c.b, state, normal: c.normal, is_trigger: c.is_trigger });
        }

        for (&(a, b), touch) in &self.previous {
            if !current.contains_key(&(a, b)) {
                events.push(CollisionEvent { a, b, state: EventState::Exit, normal: touch.normal, is_trigger: touch.is_trigger });
            }
        }

        self.previous = current;
        events
    }

    pub fn clear(&mut self) {
        self.previous.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn pair() -> (Entity, Entity) {
        let mut sm: SlotMap<Entity, ()> = SlotMap::with_key();
        (sm.insert(()), sm.insert(()))
    }

    fn contact(a: Entity, b: Entity, normal: Vec3) -> Contact {
        Contact { a, b, normal, depth: 0.1, is_trigger: false }
    }

    #[test]
    fn test_enter_stay_exit() {
        let (a, b) = pair();
        let mut t = ContactTracker::new();
        let e1 = t.update(&[contact(a, b, Vec3::X)]);
        assert_eq!(e1.len(), 1);
        assert_eq!(e1[0].state, EventState::Enter);

        let e2 = t.update(&[contact(a, b, Vec3::Y)]);
        assert_eq!(e2[0].state, EventState::Stay);
        assert_eq!(e2[0].normal, Vec3::Y);

        let e3 = t.update(&[]);
        assert_eq!(e3.len(), 1);
        assert_eq!(e3[0].state, EventState::Exit);
        assert_eq!(e3[0].normal, Vec3::Y);

        assert!(t.update(&[]).is_empty());
    }

    #[test]
    fn test_duplicate_contacts_emit_once() {
        let (a, b) = pair();
        let mut t = ContactTracker::new();
        let evs = t.update(&[contact(a, b, Vec3::X), contact(a, b, Vec3::X)]);
        assert_eq!(evs.len(), 1);
        assert_eq!(t.touching(), 1);
    }

    #[test]
    fn test_clear_drops_history() {
        let (a, b) = pair();
        let mut t = ContactTracker::new();
        t.update(&[contact(a, b, Vec3::X)]);
        t.clear();
        let evs = t.update(&[contact(a, b, Vec3::X)]);
        assert_eq!(evs[0].state, EventState::Enter);
    }

    #[test]
    fn test_exit_keeps_trigger_flag() {
        let (a, b) = pair();
        let mut t = ContactTracker::new();
        t.update(&[Contact { a, b, normal: Vec3::Z, depth: 0.2, is_trigger: true }]);
        let evs = t.update(&[]);
        assert!(evs[0].is_trigger);
    }
}
