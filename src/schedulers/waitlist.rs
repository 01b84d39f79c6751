//! The waitlist scheduler: cooldown-driven dispatch off a timestamp heap.
//!
//! Every member lives in the heap permanently, keyed by its next-eligible
//! instant. Dispatch re-keys the member into the future and executes it, so
//! the heap size stays constant and each tick fires exactly the members
//! whose cooldowns have elapsed.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

use super::Scheduler;
use crate::heap::TimestampHeap;
use crate::instruction::Instruction;
use crate::params::Param;
use crate::runtime::{execute, Context};

/// Heap room kept for members appended while the waitlist is running.
const SPARE_CAPACITY: usize = 16;

pub(crate) struct Waitlist {
    id: String,
    heap: TimestampHeap,
}

impl Waitlist {
    pub(crate) fn new(instruction: &Instruction) -> Result<Self> {
        let children = instruction.children();
        let mut heap = TimestampHeap::new(children.len() + SPARE_CAPACITY);

        // Seed every member as immediately eligible.
        let now = Instant::now();
        for child in children {
            heap.push(now, child.clone())?;
        }

        Ok(Self {
            id: instruction.id().to_string(),
            heap,
        })
    }
}

#[async_trait(?Send)]
impl Scheduler for Waitlist {
    fn member_count(&self) -> usize {
        self.heap.len()
    }

    fn insert(&mut self, id: &str) -> Result<()> {
        self.heap.push(Instant::now(), id)
    }

    async fn tick(&mut self, ctx: &mut Context) -> Result<bool> {
        // Snapshot the due set at the tick instant. Re-keyed members land
        // strictly after it, so a zero-cooldown member cannot surface again
        // mid-tick and crowd out a later due member or fire twice.
        let tick_start = Instant::now();
        let floor = tick_start + Duration::from_millis(1);

        let mut due = Vec::new();
        while let Some(ts) = self.heap.peek_ts() {
            if ts > tick_start {
                break;
            }
            let Some(next) = self.heap.peek_value() else {
                break;
            };
            let next = next.to_string();

            let cooldown = ctx.program.table.get(&next)?.param(Param::Cooldown).sample();
            let eligible_again =
                (tick_start + Duration::from_millis(cooldown.max(0) as u64)).max(floor);
            self.heap.pop(eligible_again)?;
            due.push(next);
        }

        for member in &due {
            execute(ctx, member, Some(&self.id)).await?;
        }

        Ok(!due.is_empty())
    }
}
