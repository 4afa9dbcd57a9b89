use crate::config::QueueDiscipline;
use crate::task::{Priority, Task};
use std::collections::VecDeque;

/// Pending tasks, one FIFO lane per priority tier.
/// Owned by a single scheduler, so plain `&mut self` access; the scheduler wraps it in a RefCell.
#[derive(Default)]
pub struct TaskQueue {
    tiers: [VecDeque<Task>; 3],
    discipline: QueueDiscipline,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_discipline(discipline: QueueDiscipline) -> Self {
        Self {
            tiers: Default::default(),
            discipline,
        }
    }

    pub fn discipline(&self) -> QueueDiscipline {
        self.discipline
    }

    pub fn enqueue(&mut self, task: Task) {
        self.tiers[task.priority.tier()].push_back(task);
    }

    /// Removes the oldest task of the highest non-empty tier.
    /// Under `QueueDiscipline::Fifo` the tiers are ignored and the oldest task overall wins.
    pub fn dequeue_highest_priority(&mut self) -> Option<Task> {
        let tier = match self.discipline {
            QueueDiscipline::Priority => self.tiers.iter().position(|lane| !lane.is_empty())?,
            // Ids are handed out in enqueue order, so the smallest head id is the oldest task.
            QueueDiscipline::Fifo => {
                self.tiers
                    .iter()
                    .enumerate()
                    .filter_map(|(tier, lane)| lane.front().map(|task| (task.id, tier)))
                    .min()?
                    .1
            }
        };
        self.tiers[tier].pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.iter().all(VecDeque::is_empty)
    }

    pub fn len(&self) -> usize {
        self.tiers.iter().map(VecDeque::len).sum()
    }

    pub fn len_of(&self, priority: Priority) -> usize {
        self.tiers[priority.tier()].len()
    }

    /// Drops every pending task, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let discarded = self.len();
        for lane in &mut self.tiers {
            lane.clear();
        }
        discarded
    }
}
