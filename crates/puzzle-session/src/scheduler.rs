//! Delayed session tasks.
//!
//! Tasks are plain values; the driver sleeps until [`Scheduler::next_deadline`]
//! and hands due tasks back to the controller. Loading a new puzzle clears
//! the queue, so nothing from a previous session can fire into the next one.

use puzzle_core::TreePath;
use tokio::time::Instant;

use crate::collaborators::MoveRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Move from the setup position to the puzzle start.
    InitialJump,
    /// Make "view solution" available.
    RevealSolution,
    /// Take back the user move at this path.
    RevertUserMove(TreePath),
    /// Ask the oracle to play the opponent reply.
    OpponentReply(MoveRequest),
    /// Trailing legal-destination request.
    FetchDests,
    /// Trailing evaluation restart.
    StartCeval,
    /// Trailing vote.
    Vote,
    /// Re-synchronize the board after a visibility change.
    Resync,
}

#[derive(Debug)]
struct Scheduled {
    due: Instant,
    seq: u64,
    task: Task,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    queue: Vec<Scheduled>,
    seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Instant, task: Task) {
        self.seq += 1;
        self.queue.push(Scheduled {
            due,
            seq: self.seq,
            task,
        });
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.iter().map(|s| s.due).min()
    }

    /// Remove and return every task due at `now`, earliest first; ties keep
    /// scheduling order.
    pub fn take_due(&mut self, now: Instant) -> Vec<Task> {
        let (mut due, rest): (Vec<Scheduled>, Vec<Scheduled>) =
            self.queue.drain(..).partition(|s| s.due <= now);
        self.queue = rest;
        due.sort_by_key(|s| (s.due, s.seq));
        due.into_iter().map(|s| s.task).collect()
    }

    /// Drop every pending task. Returns how many were cancelled.
    pub fn clear(&mut self) -> usize {
        let n = self.queue.len();
        self.queue.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_take_due_in_order() {
        let now = Instant::now();
        let mut s = Scheduler::new();
        s.schedule(now + Duration::from_millis(500), Task::RevealSolution);
        s.schedule(now + Duration::from_millis(100), Task::InitialJump);
        s.schedule(now + Duration::from_millis(100), Task::FetchDests);
        assert_eq!(s.next_deadline(), Some(now + Duration::from_millis(100)));

        let due = s.take_due(now + Duration::from_millis(200));
        assert_eq!(due, vec![Task::InitialJump, Task::FetchDests]);
        assert_eq!(s.len(), 1);
        assert!(s.take_due(now).is_empty());
    }

    #[test]
    fn test_clear_cancels_everything() {
        let now = Instant::now();
        let mut s = Scheduler::new();
        s.schedule(now, Task::StartCeval);
        s.schedule(now, Task::Resync);
        assert_eq!(s.clear(), 2);
        assert!(s.is_empty());
        assert_eq!(s.next_deadline(), None);
    }
}
