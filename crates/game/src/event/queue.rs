use std::collections::VecDeque;

use super::types::GameEvent;

#[derive(Debug, Clone)]
pub struct PendingEvent {
    pub tick: u64,
    pub event: GameEvent,
}

/// Bounded buffer between the simulation and presentation. When full, the
/// oldest cosmetic event (wall bounce or paddle hit) is evicted first so that
/// score and win events survive a slow consumer.
pub struct EventQueue {
    pending: VecDeque<PendingEvent>,
    max_pending: usize,
    dropped: u64,
}

impl EventQueue {
    pub fn new(max_pending: usize) -> Self {
        let max_pending = max_pending.max(1);
        Self {
            pending: VecDeque::with_capacity(max_pending),
            max_pending,
            dropped: 0,
        }
    }

    pub fn push(&mut self, tick: u64, event: GameEvent) {
        if self.pending.len() >= self.max_pending {
            self.evict_one();
        }
        self.pending.push_back(PendingEvent { tick, event });
    }

    pub fn extend(&mut self, tick: u64, events: impl IntoIterator<Item = GameEvent>) {
        for event in events {
            self.push(tick, event);
        }
    }

    pub fn drain(&mut self) -> Vec<PendingEvent> {
        self.pending.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingEvent> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    fn evict_one(&mut self) {
        let idx = self
            .pending
            .iter()
            .position(|e| is_cosmetic(&e.event))
            .unwrap_or(0);
        self.pending.remove(idx);
        self.dropped += 1;
    }
}

fn is_cosmetic(event: &GameEvent) -> bool {
    matches!(
        event,
        GameEvent::PaddleHit { .. } | GameEvent::WallBounce { .. }
    )
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::entity::Side;

    fn bounce() -> GameEvent {
        GameEvent::WallBounce {
            position: Vec2::new(10.0, 0.0),
        }
    }

    fn score() -> GameEvent {
        GameEvent::Score {
            side: Side::Left,
            position: Vec2::new(400.0, 300.0),
        }
    }

    #[test]
    fn evicts_cosmetic_before_score() {
        let mut queue = EventQueue::new(2);
        queue.push(0, score());
        queue.push(1, bounce());
        queue.push(2, bounce());

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped(), 1);
        let drained = queue.drain();
        assert_eq!(drained[0].event, score());
        assert_eq!(drained[1].tick, 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn evicts_oldest_when_all_important() {
        let mut queue = EventQueue::new(1);
        queue.push(0, score());
        queue.push(1, score());

        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].tick, 1);
    }

    #[test]
    fn shake_hints() {
        let hit = GameEvent::PaddleHit {
            side: Side::Right,
            position: Vec2::ZERO,
        };
        let hit_shake = hit.shake().unwrap();
        let score_shake = score().shake().unwrap();

        assert_eq!(hit_shake.duration, 0.12);
        assert_eq!(score_shake.intensity, 8.0);
        assert!(score_shake.intensity > hit_shake.intensity);
        assert!(bounce().shake().is_none());
        assert_eq!(bounce().side(), None);
    }
}
