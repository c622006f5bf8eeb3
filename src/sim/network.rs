use rand::seq::SliceRandom;
use rand::Rng;

use crate::sim::queue::BoundedQueue;

pub const PRODUCERS: usize = 4;
pub const CONSUMERS: usize = 3;
pub const INITIAL_BUFFERS: usize = 4;
pub const SLOT_CAPACITY: usize = 1;
pub const NETWORK_CYCLES: u32 = 10;

/// Cycle index after which the extra buffer slot is wired in.
pub const UPGRADE_CYCLE: u32 = 4;

/// Where a produced packet ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    /// Landed in a free buffer slot.
    Delivered { slot: usize },
    /// Every slot was occupied; the packet went to the garbage collector.
    Dropped,
}

#[derive(Debug, Clone, Copy)]
pub struct ProducerFire {
    pub producer: usize,
    pub value: u32,
    pub outcome: PacketOutcome,
}

#[derive(Debug, Clone, Copy)]
pub struct ConsumerTake {
    pub consumer: usize,
    pub slot: usize,
    pub value: u32,
}

/// One cycle of the network run, in animation order: consumers pull packets
/// that were already in flight, then the new packets land (or drop).
#[derive(Debug, Clone)]
pub struct NetworkCycle {
    pub cycle: u32,
    pub fired: Vec<ProducerFire>,
    pub consumed: Vec<ConsumerTake>,
    pub occupancy_after: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct NetworkTrace {
    pub cycles: Vec<NetworkCycle>,
    pub produced: u32,
    pub consumed: u32,
    pub dropped: u32,
    pub dropped_before_upgrade: u32,
    pub final_in_flight: usize,
    pub final_buffers: usize,
}

impl NetworkTrace {
    pub fn dropped_after_upgrade(&self) -> u32 {
        self.dropped - self.dropped_before_upgrade
    }
}

/// Run the fixed 10-cycle multi-producer/consumer script.
///
/// A random subset of producers fires every cycle; consumers wake up with
/// probability 0.7 once packets are in flight. The buffer layer is a bank of
/// single-slot queues, so a cycle that produces more packets than there are
/// free slots sends the overflow to the garbage collector. After
/// [`UPGRADE_CYCLE`] a fifth slot joins the bank, which is what the closing
/// statistics compare against.
pub fn run<R: Rng>(rng: &mut R) -> NetworkTrace {
    let mut bank: Vec<BoundedQueue<u32>> = (0..INITIAL_BUFFERS)
        .map(|_| BoundedQueue::new(SLOT_CAPACITY))
        .collect();

    let mut cycles = Vec::with_capacity(NETWORK_CYCLES as usize);
    let mut produced = 0;
    let mut consumed = 0;
    let mut dropped_before_upgrade = 0;

    for cycle in 0..NETWORK_CYCLES {
        let in_flight: usize = bank.iter().map(|q| q.len()).sum();

        let producer_count = rng.gen_range(2..=PRODUCERS);
        let mut producer_ids: Vec<usize> = (0..PRODUCERS).collect();
        producer_ids.shuffle(rng);
        producer_ids.truncate(producer_count);

        // Consumers only see packets that were in flight before this cycle's
        // arrivals, matching the animation's movement order.
        let mut takes = Vec::new();
        if in_flight > 0 && rng.gen::<f64>() > 0.3 {
            let consumer_count = rng.gen_range(1..=CONSUMERS).min(in_flight);
            let mut consumer_ids: Vec<usize> = (0..CONSUMERS).collect();
            consumer_ids.shuffle(rng);
            consumer_ids.truncate(consumer_count);

            for consumer in consumer_ids {
                let occupied: Vec<usize> = bank
                    .iter()
                    .enumerate()
                    .filter(|(_, q)| !q.is_empty())
                    .map(|(i, _)| i)
                    .collect();
                let Some(&slot) = occupied.as_slice().choose(rng) else {
                    break;
                };
                if let Some(value) = bank[slot].pop() {
                    consumed += 1;
                    takes.push(ConsumerTake {
                        consumer,
                        slot,
                        value,
                    });
                }
            }
        }

        let mut fired = Vec::new();
        for producer in producer_ids {
            let value = rng.gen_range(10..=99);
            produced += 1;

            let free: Vec<usize> = bank
                .iter()
                .enumerate()
                .filter(|(_, q)| !q.is_full())
                .map(|(i, _)| i)
                .collect();

            let outcome = match free.as_slice().choose(rng) {
                Some(&slot) => {
                    bank[slot].push(value);
                    PacketOutcome::Delivered { slot }
                }
                None => {
                    // Push against a full slot so the queue's own drop
                    // counter records the loss.
                    let slot = rng.gen_range(0..bank.len());
                    bank[slot].push(value);
                    PacketOutcome::Dropped
                }
            };
            fired.push(ProducerFire {
                producer,
                value,
                outcome,
            });
        }

        cycles.push(NetworkCycle {
            cycle,
            fired,
            consumed: takes,
            occupancy_after: bank.iter().map(|q| q.len()).collect(),
        });

        if cycle == UPGRADE_CYCLE {
            bank.push(BoundedQueue::new(SLOT_CAPACITY));
            dropped_before_upgrade = bank.iter().map(|q| q.dropped() as u32).sum();
        }
    }

    let dropped = bank.iter().map(|q| q.dropped() as u32).sum();
    NetworkTrace {
        cycles,
        produced,
        consumed,
        dropped,
        dropped_before_upgrade,
        final_in_flight: bank.iter().map(|q| q.len()).sum(),
        final_buffers: bank.len(),
    }
}
