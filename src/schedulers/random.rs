//! The random scheduler: uniform selection among cooldown-expired members.
//!
//! Each tick collects the members whose cooldowns have elapsed, fires one of
//! them chosen uniformly at random, and re-arms it. While no member is
//! eligible the scheduler blocks.

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

use super::Scheduler;
use crate::instruction::Instruction;
use crate::params::Param;
use crate::runtime::{execute, Context};

struct Member {
    id: String,
    next_eligible: Instant,
}

pub(crate) struct RandomSet {
    id: String,
    members: Vec<Member>,
}

impl RandomSet {
    pub(crate) fn new(instruction: &Instruction) -> Self {
        let now = Instant::now();
        Self {
            id: instruction.id().to_string(),
            members: instruction
                .children()
                .iter()
                .map(|child| Member {
                    id: child.clone(),
                    next_eligible: now,
                })
                .collect(),
        }
    }
}

#[async_trait(?Send)]
impl Scheduler for RandomSet {
    fn member_count(&self) -> usize {
        self.members.len()
    }

    fn insert(&mut self, id: &str) -> Result<()> {
        self.members.push(Member {
            id: id.to_string(),
            next_eligible: Instant::now(),
        });
        Ok(())
    }

    async fn tick(&mut self, ctx: &mut Context) -> Result<bool> {
        let now = Instant::now();
        let eligible: Vec<usize> = self
            .members
            .iter()
            .enumerate()
            .filter(|(_, member)| now >= member.next_eligible)
            .map(|(idx, _)| idx)
            .collect();

        if eligible.is_empty() {
            return Ok(false);
        }

        // Drop the rng before the await point.
        let choice = {
            let mut rng = rand::thread_rng();
            eligible[rng.gen_range(0..eligible.len())]
        };
        let member_id = self.members[choice].id.clone();

        execute(ctx, &member_id, Some(&self.id)).await?;

        let cooldown = ctx
            .program
            .table
            .get(&member_id)?
            .param(Param::Cooldown)
            .sample();
        self.members[choice].next_eligible =
            Instant::now() + Duration::from_millis(cooldown.max(0) as u64);

        Ok(true)
    }
}
